//! Google Drive API client.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use docdrive_common::{
    classify_document, DocumentMetadata, DocumentType, Error, FileInfo, FileKind, Result,
};

use super::credentials::CredentialManager;

/// Google Drive API base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const FILE_FIELDS: &str = "id,name,mimeType,size,createdTime,modifiedTime,webViewLink";
const LIST_FIELDS: &str = "files(id,name,mimeType,size,createdTime,modifiedTime,webViewLink)";
/// Largest page the Drive API serves.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Characters escaped when a file ID is used as a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Google Drive file metadata from API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// File size in bytes (only for binary files, sent as a decimal string).
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

impl From<DriveFile> for FileInfo {
    fn from(file: DriveFile) -> Self {
        let kind = if file.is_folder() {
            FileKind::Folder
        } else {
            FileKind::File
        };
        let size = file.size_bytes();

        FileInfo {
            id: file.id,
            name: file.name,
            kind,
            mime_type: file.mime_type,
            size,
            created_time: file.created_time,
            modified_time: file.modified_time,
            web_view_link: file.web_view_link,
        }
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Connection settings for [`DriveClient`].
#[derive(Debug, Clone)]
pub struct DriveClientConfig {
    pub api_base: String,
    /// Overall timeout for each provider call.
    pub timeout: Duration,
}

impl Default for DriveClientConfig {
    fn default() -> Self {
        Self {
            api_base: DRIVE_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Google Drive API client.
pub struct DriveClient {
    http: Client,
    credentials: Arc<CredentialManager>,
    api_base: String,
}

impl DriveClient {
    /// Create a new Drive client.
    pub fn new(credentials: Arc<CredentialManager>, config: DriveClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("DocDrive/0.1")
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credentials,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// The credential manager backing this client.
    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// List files, optionally scoped to a parent folder.
    ///
    /// Only the first page is read; the result never exceeds `page_size`.
    pub async fn list_files(
        &self,
        folder_id: Option<&str>,
        page_size: u32,
    ) -> Result<Vec<FileInfo>> {
        let query = folder_id.map(|id| format!("'{}' in parents", id));
        self.list(query, page_size).await
    }

    /// Search files with a Drive query string, passed through verbatim.
    pub async fn search_files(&self, query: &str, page_size: u32) -> Result<Vec<FileInfo>> {
        self.list(Some(query.to_string()), page_size).await
    }

    /// Get file metadata by ID.
    ///
    /// # Errors
    /// - `NotFound` if the provider does not know the ID
    pub async fn get_file(&self, file_id: &str) -> Result<FileInfo> {
        if file_id.is_empty() {
            return Err(Error::InvalidInput("File ID cannot be empty".to_string()));
        }

        let url = format!(
            "{}/files/{}",
            self.api_base,
            utf8_percent_encode(file_id, PATH_SEGMENT)
        );
        let query = [("fields", FILE_FIELDS.to_string())];

        let file: DriveFile = self
            .with_reauth(|token| self.get_json(&url, &query, token))
            .await?;

        Ok(file.into())
    }

    /// Fetch a file and classify it.
    pub async fn get_document_metadata(&self, file_id: &str) -> Result<DocumentMetadata> {
        let file = self.get_file(file_id).await?;
        let doc_type = Self::classify_document(&file.name);
        Ok(DocumentMetadata::from_file(&file, doc_type))
    }

    /// Classify a file name into a document type.
    pub fn classify_document(name: &str) -> DocumentType {
        classify_document(name)
    }

    /// List up to `page_size` files and keep those classified as `doc_type`.
    pub async fn list_documents_by_type(
        &self,
        doc_type: DocumentType,
        page_size: u32,
    ) -> Result<Vec<DocumentMetadata>> {
        let files = self.list_files(None, page_size).await?;

        Ok(files
            .iter()
            .filter_map(|file| {
                let file_type = Self::classify_document(&file.name);
                (file_type == doc_type).then(|| DocumentMetadata::from_file(file, file_type))
            })
            .collect())
    }

    async fn list(&self, q: Option<String>, page_size: u32) -> Result<Vec<FileInfo>> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidInput(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let url = format!("{}/files", self.api_base);
        let mut query = vec![
            ("pageSize", page_size.to_string()),
            ("fields", LIST_FIELDS.to_string()),
        ];
        if let Some(q) = q {
            query.push(("q", q));
        }

        let response: FileListResponse = self
            .with_reauth(|token| self.get_json(&url, &query, token))
            .await?;

        let mut files: Vec<FileInfo> = response.files.into_iter().map(FileInfo::from).collect();
        files.truncate(page_size as usize);
        Ok(files)
    }

    /// Run `operation` with an access token. If the provider rejects the
    /// credential, invalidate it, re-authenticate once and retry once.
    async fn with_reauth<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.credentials.access_token().await?;

        match operation(token.clone()).await {
            Err(err) if err.is_authorization_expired() => {
                warn!("Drive rejected the credential ({}); re-authenticating", err);
                self.credentials.invalidate(&token).await?;
                let token = self.credentials.access_token().await?;
                operation(token).await
            }
            other => other,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: String,
    ) -> Result<T> {
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Request to Drive failed: {}", e)))?;

        self.handle_response(response).await
    }

    /// Handle API response with error checking.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Provider(format!("Failed to parse response: {}", e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(map_api_error(status, &body))
        }
    }
}

/// Translate a failed Drive response into the error taxonomy.
///
/// Only a 401, or a 400 whose envelope names `invalid_grant`, counts as an
/// expired credential. Anything else leaves the credential alone.
fn map_api_error(status: StatusCode, body: &str) -> Error {
    let message = provider_message(body);

    match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::UNAUTHORIZED => Error::AuthorizationExpired(message),
        StatusCode::BAD_REQUEST if is_invalid_grant(body) => {
            Error::AuthorizationExpired(message)
        }
        _ => Error::Provider(format!("{} - {}", status, message)),
    }
}

/// Whether an OAuth-style envelope reports `{"error": "invalid_grant"}`.
fn is_invalid_grant(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .map(|value| value["error"].as_str() == Some("invalid_grant"))
        .unwrap_or(false)
}

/// Pull the human-readable message out of a Google error envelope.
///
/// Handles both `{"error": {"message": ...}}` (Drive API) and
/// `{"error": "...", "error_description": ...}` (OAuth endpoints).
fn provider_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };

    let error = &value["error"];
    error["message"]
        .as_str()
        .or_else(|| value["error_description"].as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
