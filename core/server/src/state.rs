//! Shared application state.

use std::sync::Arc;

use docdrive_common::Result;
use docdrive_storage::{
    CredentialManager, CredentialSource, DeferredConsent, DriveClient, DriveClientConfig,
};

use crate::config::Settings;
use crate::LOGIN_PATH;

/// State handed to every handler.
pub struct AppState {
    pub drive: DriveClient,
}

impl AppState {
    pub fn new(drive: DriveClient) -> Self {
        Self { drive }
    }

    /// Resolve credentials and build the Drive client for a deployment.
    ///
    /// Consent is deferred to the browser flow under [`LOGIN_PATH`].
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let source = CredentialSource::resolve(&settings.credentials)?;
        let credentials = CredentialManager::new(source, Arc::new(DeferredConsent::new(LOGIN_PATH)))?;

        let drive = DriveClient::new(
            Arc::new(credentials),
            DriveClientConfig {
                api_base: settings.drive_api_base.clone(),
                timeout: settings.request_timeout,
            },
        )?;

        Ok(Self::new(drive))
    }
}
