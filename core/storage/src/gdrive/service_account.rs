//! Service-account (server-to-server) credentials.
//!
//! A signed RS256 assertion is exchanged at the token endpoint for a
//! short-lived access token. There is no refresh token; a new assertion is
//! minted whenever the previous token expires.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

use docdrive_common::{Error, Result};

use super::auth::{Tokens, DRIVE_SCOPE, GOOGLE_TOKEN_URL};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime requested for each assertion (Google caps this at one hour).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The subset of a Google service-account key file we need.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl ServiceAccountKey {
    /// Parse a service-account JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Authentication(format!("Invalid service account JSON: {}", e)))
    }

    /// Read and parse a service-account key file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Build the signed assertion presented to the token endpoint.
    fn assertion(&self) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| Error::Authentication(format!("Invalid service account key: {}", e)))?;

        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| Error::Authentication(format!("Failed to sign assertion: {}", e)))
    }

    /// Exchange a fresh assertion for an access token.
    pub async fn fetch_token(&self, http: &reqwest::Client) -> Result<Tokens> {
        let assertion = self.assertion()?;

        let response = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::Authentication(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication(format!(
                "Service account token exchange failed: {} - {}",
                status, body
            )));
        }

        let token: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("Invalid token response: {}", e)))?;

        Ok(Tokens::new(
            token.access_token,
            None,
            token.expires_in.map(std::time::Duration::from_secs),
        ))
    }
}
