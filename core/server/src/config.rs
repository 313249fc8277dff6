//! Server settings loaded from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use docdrive_storage::gdrive::client::DRIVE_API_BASE;
use docdrive_storage::SourceOptions;

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000/oauth2-redirect";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: SocketAddr,
    /// Timeout applied to every Drive call.
    pub request_timeout: Duration,
    pub drive_api_base: String,
    pub credentials: SourceOptions,
}

impl Settings {
    /// Load settings from the process environment, reading `.env` first.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("DOCDRIVE_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.into())
            .parse()
            .context("DOCDRIVE_BIND must be a socket address such as 0.0.0.0:8000")?;

        let timeout_secs = match lookup("DOCDRIVE_REQUEST_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .context("DOCDRIVE_REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let defaults = SourceOptions::default();
        let credentials = SourceOptions {
            service_account_json: lookup("GOOGLE_SERVICE_ACCOUNT_JSON"),
            service_account_file: lookup("GOOGLE_SERVICE_ACCOUNT_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.service_account_file),
            client_secret_file: lookup("GOOGLE_CLIENT_SECRET_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.client_secret_file),
            token_file: lookup("GOOGLE_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_file),
            redirect_url: Some(
                lookup("GOOGLE_REDIRECT_URI").unwrap_or_else(|| DEFAULT_REDIRECT_URI.into()),
            ),
        };

        Ok(Self {
            bind,
            request_timeout: Duration::from_secs(timeout_secs),
            drive_api_base: lookup("DOCDRIVE_DRIVE_API_BASE")
                .unwrap_or_else(|| DRIVE_API_BASE.into()),
            credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.bind.port(), 8000);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.drive_api_base, DRIVE_API_BASE);
        assert_eq!(
            settings.credentials.redirect_url.as_deref(),
            Some(DEFAULT_REDIRECT_URI)
        );
        assert!(settings.credentials.service_account_json.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("DOCDRIVE_BIND", "127.0.0.1:9100"),
            ("DOCDRIVE_REQUEST_TIMEOUT_SECS", "5"),
            ("GOOGLE_TOKEN_FILE", "/var/lib/docdrive/token.json"),
            ("GOOGLE_SERVICE_ACCOUNT_JSON", "{}"),
        ])
        .unwrap();

        assert_eq!(settings.bind.port(), 9100);
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(
            settings.credentials.token_file,
            PathBuf::from("/var/lib/docdrive/token.json")
        );
        assert_eq!(settings.credentials.service_account_json.as_deref(), Some("{}"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(settings(&[("DOCDRIVE_BIND", "not-an-address")]).is_err());
        assert!(settings(&[("DOCDRIVE_REQUEST_TIMEOUT_SECS", "soon")]).is_err());
    }
}
