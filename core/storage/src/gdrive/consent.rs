//! Pluggable user-consent step of the OAuth2 authorization-code flow.

use async_trait::async_trait;
use url::Url;

use docdrive_common::{Error, Result};

/// What the user hands back after approving access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub code: String,
    /// CSRF state echoed by the provider, when the caller has it.
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Parse either a bare authorization code or the full redirect URL the
    /// browser landed on.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::Authentication(
                "No authorization code provided".to_string(),
            ));
        }

        let Ok(url) = Url::parse(input) else {
            return Ok(Self {
                code: input.to_string(),
                state: None,
            });
        };

        let mut code = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => {
                    return Err(Error::Authentication(format!(
                        "Authorization denied: {}",
                        value
                    )))
                }
                _ => {}
            }
        }

        let code = code.ok_or_else(|| {
            Error::Authentication("Redirect URL carries no authorization code".to_string())
        })?;

        Ok(Self { code, state })
    }
}

/// Obtains an authorization code for a consent URL.
///
/// The console implementation prompts a human. A server cannot block on a
/// prompt, so it uses [`DeferredConsent`] and finishes the flow from its
/// redirect handler instead.
#[async_trait]
pub trait ConsentHandler: Send + Sync {
    async fn obtain_code(&self, authorization_url: &str) -> Result<AuthorizationResponse>;
}

/// Consent handler for hosts that complete consent out of band.
///
/// Always fails, pointing the caller at the login route that starts the
/// browser redirect flow.
#[derive(Debug, Clone)]
pub struct DeferredConsent {
    login_path: String,
}

impl DeferredConsent {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }
}

#[async_trait]
impl ConsentHandler for DeferredConsent {
    async fn obtain_code(&self, _authorization_url: &str) -> Result<AuthorizationResponse> {
        Err(Error::Authentication(format!(
            "Google Drive consent required: visit {} to authorize",
            self.login_path
        )))
    }
}
