//! Storage-provider access for DocDrive.
//!
//! Credentials are owned by a [`CredentialManager`]; every Drive call goes
//! through a [`DriveClient`] holding a shared reference to it.

pub mod gdrive;

pub use gdrive::{
    AuthorizationResponse, ConsentHandler, CredentialManager, CredentialSource, DeferredConsent,
    DriveClient, DriveClientConfig, SourceOptions, TokenStore,
};
