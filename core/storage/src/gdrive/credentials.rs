//! Credential manager: one place that owns the active Drive credential.

use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use docdrive_common::{Error, Result};

use super::auth::{AuthConfig, AuthManager, Tokens};
use super::consent::ConsentHandler;
use super::service_account::ServiceAccountKey;
use super::token_store::TokenStore;

/// Consent flows that may be outstanding at once.
const MAX_PENDING_CONSENTS: usize = 8;

/// Where credential material is read from.
///
/// Resolved once per deployment; the two strategies never coexist.
#[derive(Debug)]
pub enum CredentialSource {
    /// Pre-provisioned service account, no user interaction.
    ServiceAccount(ServiceAccountKey),
    /// OAuth client with a consent flow and a persisted token slot.
    Installed { auth: AuthConfig, store: TokenStore },
}

/// Inputs used to pick a [`CredentialSource`].
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Inline service-account JSON (usually from `GOOGLE_SERVICE_ACCOUNT_JSON`).
    pub service_account_json: Option<String>,
    pub service_account_file: PathBuf,
    pub client_secret_file: PathBuf,
    pub token_file: PathBuf,
    /// Overrides the redirect URI found in the client-secret file.
    pub redirect_url: Option<String>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            service_account_json: None,
            service_account_file: PathBuf::from("service_account.json"),
            client_secret_file: PathBuf::from("credentials.json"),
            token_file: TokenStore::default_path(),
            redirect_url: None,
        }
    }
}

impl CredentialSource {
    /// Pick the credential source, in order: inline service-account JSON,
    /// service-account key file, OAuth client-secret file.
    ///
    /// # Errors
    /// - `Authentication` if none is available or the material is malformed
    pub fn resolve(options: &SourceOptions) -> Result<Self> {
        if let Some(json) = options
            .service_account_json
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            debug!("Using service account from environment");
            return Ok(Self::ServiceAccount(ServiceAccountKey::from_json(json)?));
        }

        if options.service_account_file.is_file() {
            debug!(
                "Using service account file {}",
                options.service_account_file.display()
            );
            return Ok(Self::ServiceAccount(ServiceAccountKey::from_file(
                &options.service_account_file,
            )?));
        }

        if options.client_secret_file.is_file() {
            debug!(
                "Using OAuth client secret {}",
                options.client_secret_file.display()
            );
            let json = std::fs::read_to_string(&options.client_secret_file)?;
            let auth = AuthConfig::from_client_secret_json(&json, options.redirect_url.as_deref())?;
            return Ok(Self::Installed {
                auth,
                store: TokenStore::new(options.token_file.clone()),
            });
        }

        Err(Error::Authentication(format!(
            "No credential source configured: set GOOGLE_SERVICE_ACCOUNT_JSON or provide {} or {}",
            options.service_account_file.display(),
            options.client_secret_file.display()
        )))
    }
}

enum Strategy {
    ServiceAccount {
        key: ServiceAccountKey,
        http: reqwest::Client,
    },
    Installed {
        auth: AuthManager,
        store: TokenStore,
    },
}

/// Obtains, caches, refreshes and persists the Drive credential.
///
/// The in-memory token and the token slot are only touched while holding
/// `current`, so concurrent requests never race a refresh.
pub struct CredentialManager {
    strategy: Strategy,
    consent: Arc<dyn ConsentHandler>,
    current: Mutex<Option<Tokens>>,
    /// CSRF states of consent URLs handed out but not yet redeemed, oldest first.
    pending_states: StdMutex<Vec<String>>,
}

impl CredentialManager {
    /// Create a manager for `source`.
    ///
    /// `consent` is only consulted in the installed-app strategy.
    pub fn new(source: CredentialSource, consent: Arc<dyn ConsentHandler>) -> Result<Self> {
        let strategy = match source {
            CredentialSource::ServiceAccount(key) => Strategy::ServiceAccount {
                key,
                http: reqwest::Client::builder()
                    .user_agent("DocDrive/0.1")
                    .build()
                    .map_err(|e| {
                        Error::Authentication(format!("Failed to build HTTP client: {}", e))
                    })?,
            },
            CredentialSource::Installed { auth, store } => Strategy::Installed {
                auth: AuthManager::new(auth)?,
                store,
            },
        };

        Ok(Self {
            strategy,
            consent,
            current: Mutex::new(None),
            pending_states: StdMutex::new(Vec::new()),
        })
    }

    /// Whether this deployment uses the interactive consent flow.
    pub fn is_interactive(&self) -> bool {
        matches!(self.strategy, Strategy::Installed { .. })
    }

    /// Produce a valid credential.
    ///
    /// # Postconditions
    /// - An unexpired in-memory token is returned without any I/O
    /// - A newly granted or refreshed token is persisted (installed strategy)
    ///
    /// # Errors
    /// - `Authentication` if no token can be obtained
    pub async fn authenticate(&self) -> Result<Tokens> {
        let mut current = self.current.lock().await;

        if let Some(tokens) = current.as_ref().filter(|t| !t.is_expired()) {
            return Ok(tokens.clone());
        }

        let tokens = match &self.strategy {
            Strategy::ServiceAccount { key, http } => {
                info!("Requesting service account token for {}", key.client_email);
                key.fetch_token(http).await?
            }
            Strategy::Installed { auth, store } => {
                self.authenticate_installed(auth, store, current.take())
                    .await?
            }
        };

        *current = Some(tokens.clone());
        Ok(tokens)
    }

    /// Current access token, authenticating first if needed.
    pub async fn access_token(&self) -> Result<String> {
        Ok(self.authenticate().await?.access_token)
    }

    async fn authenticate_installed(
        &self,
        auth: &AuthManager,
        store: &TokenStore,
        cached: Option<Tokens>,
    ) -> Result<Tokens> {
        let existing = match cached {
            Some(tokens) => Some(tokens),
            None => store.load().await?,
        };

        if let Some(tokens) = existing {
            if !tokens.is_expired() {
                debug!("Reusing persisted token");
                return Ok(tokens);
            }

            if let Some(refresh_token) = tokens.refresh_token.as_deref() {
                info!("Refreshing expired access token");
                match auth.refresh_token(refresh_token).await {
                    Ok(fresh) => {
                        store.save(&fresh).await?;
                        return Ok(fresh);
                    }
                    Err(Error::AuthorizationExpired(reason)) => {
                        warn!("{}; discarding persisted token", reason);
                        store.clear().await?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let (url, csrf) = auth.authorization_url();
        let response = self.consent.obtain_code(&url).await?;
        if response.state.as_deref().is_some_and(|state| state != csrf) {
            return Err(Error::Authentication(
                "Authorization state mismatch".to_string(),
            ));
        }

        let tokens = auth.exchange_code(&response.code).await?;
        store.save(&tokens).await?;
        info!("Stored new Google Drive authorization");
        Ok(tokens)
    }

    /// Discard a credential the provider rejected.
    ///
    /// Drops the in-memory token and deletes the token slot. If another
    /// caller already replaced `rejected_access_token`, nothing happens.
    pub async fn invalidate(&self, rejected_access_token: &str) -> Result<()> {
        let mut current = self.current.lock().await;

        if current
            .as_ref()
            .is_some_and(|t| t.access_token != rejected_access_token)
        {
            debug!("Credential already replaced; skipping invalidation");
            return Ok(());
        }

        *current = None;
        if let Strategy::Installed { store, .. } = &self.strategy {
            store.clear().await?;
        }
        Ok(())
    }

    /// Start a browser consent flow.
    ///
    /// Returns the URL to send the user to. Its CSRF state is remembered
    /// for [`complete_consent`](Self::complete_consent). Up to
    /// `MAX_PENDING_CONSENTS` flows may be outstanding; the oldest is dropped
    /// beyond that.
    pub fn authorization_url(&self) -> Result<String> {
        let Strategy::Installed { auth, .. } = &self.strategy else {
            return Err(Error::InvalidInput(
                "Consent flow is not available for service account credentials".to_string(),
            ));
        };

        let (url, csrf) = auth.authorization_url();
        let mut pending = self.pending_states.lock().unwrap_or_else(|e| e.into_inner());
        if pending.len() >= MAX_PENDING_CONSENTS {
            pending.remove(0);
        }
        pending.push(csrf);
        Ok(url)
    }

    /// Finish a browser consent flow started by `authorization_url`.
    ///
    /// A state is consumed only when it matches, so a stray callback cannot
    /// cancel a login in progress.
    ///
    /// # Errors
    /// - `Authentication` if `state` does not match or the exchange fails
    pub async fn complete_consent(&self, code: &str, state: &str) -> Result<Tokens> {
        let Strategy::Installed { auth, store } = &self.strategy else {
            return Err(Error::InvalidInput(
                "Consent flow is not available for service account credentials".to_string(),
            ));
        };

        {
            let mut pending = self.pending_states.lock().unwrap_or_else(|e| e.into_inner());
            let Some(index) = pending.iter().position(|s| s == state) else {
                return Err(Error::Authentication(
                    "Authorization state mismatch".to_string(),
                ));
            };
            pending.remove(index);
        }

        let mut current = self.current.lock().await;
        let tokens = auth.exchange_code(code).await?;
        store.save(&tokens).await?;
        *current = Some(tokens.clone());

        info!("Stored new Google Drive authorization");
        Ok(tokens)
    }
}
