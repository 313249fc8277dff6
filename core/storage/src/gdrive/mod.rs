//! Google Drive backend for DocDrive.
//!
//! This module provides:
//! - OAuth2 consent flow with automatic token refresh
//! - Service-account (JWT bearer) credentials
//! - A persisted token slot shared across restarts
//! - A read-only Drive client with one-shot re-authentication

pub mod auth;
pub mod client;
pub mod consent;
pub mod credentials;
pub mod service_account;
pub mod token_store;

pub use auth::{AuthConfig, AuthManager, Tokens};
pub use client::{DriveClient, DriveClientConfig, DriveFile, MAX_PAGE_SIZE};
pub use consent::{AuthorizationResponse, ConsentHandler, DeferredConsent};
pub use credentials::{CredentialManager, CredentialSource, SourceOptions};
pub use service_account::ServiceAccountKey;
pub use token_store::TokenStore;
