//! File and document model shared by the client and the HTTP layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a Drive entry is a folder or a regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Folder,
    File,
}

/// Metadata for a file stored in the provider.
///
/// Immutable once constructed; built from the provider's raw record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Provider file ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// Folder or file.
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// MIME type as reported by the provider.
    pub mime_type: Option<String>,
    /// Size in bytes (None for folders and native documents).
    pub size: Option<u64>,
    /// Creation time.
    pub created_time: Option<DateTime<Utc>>,
    /// Last modification time.
    pub modified_time: Option<DateTime<Utc>>,
    /// Link to open the file in a browser.
    pub web_view_link: Option<String>,
}

impl FileInfo {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }
}

/// Coarse document category derived from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// 請求書
    Invoice,
    /// 領収書
    Receipt,
    /// 契約書
    Contract,
    /// 税務申告書
    TaxReturn,
    Other,
}

impl DocumentType {
    /// All variants, in classification precedence order.
    pub const ALL: [DocumentType; 5] = [
        DocumentType::Invoice,
        DocumentType::Receipt,
        DocumentType::Contract,
        DocumentType::TaxReturn,
        DocumentType::Other,
    ];

    /// Wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Receipt => "receipt",
            DocumentType::Contract => "contract",
            DocumentType::TaxReturn => "tax_return",
            DocumentType::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown document type: {}", s)))
    }
}

/// A classified document with room for accounting enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Provider file ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// Classification result.
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    /// Counterparty (取引先名).
    pub client_name: Option<String>,
    /// Amount on the document.
    pub amount: Option<Decimal>,
    /// Document date.
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentMetadata {
    /// Combine file metadata with its classification.
    ///
    /// Enrichment fields stay unset. A missing creation time falls back to
    /// now, and a missing modification time falls back to the creation time.
    pub fn from_file(file: &FileInfo, doc_type: DocumentType) -> Self {
        let created_at = file.created_time.unwrap_or_else(Utc::now);
        let updated_at = file.modified_time.unwrap_or(created_at);

        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            doc_type,
            client_name: None,
            amount: None,
            date: None,
            description: None,
            tags: Vec::new(),
            created_at,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> FileInfo {
        FileInfo {
            id: "abc".to_string(),
            name: "請求書_B社.pdf".to_string(),
            kind: FileKind::File,
            mime_type: Some("application/pdf".to_string()),
            size: Some(2048),
            created_time: Some("2024-01-01T00:00:00Z".parse().unwrap()),
            modified_time: None,
            web_view_link: None,
        }
    }

    #[test]
    fn test_document_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&DocumentType::TaxReturn).unwrap(),
            "\"tax_return\""
        );
        for t in DocumentType::ALL {
            assert_eq!(t.as_str().parse::<DocumentType>().unwrap(), t);
        }
        assert!("memo".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_file_info_json_shape() {
        let json = serde_json::to_value(sample_file()).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["mime_type"], "application/pdf");
        assert_eq!(json["size"], 2048);
    }

    #[test]
    fn test_metadata_from_file() {
        let file = sample_file();
        let meta = DocumentMetadata::from_file(&file, DocumentType::Invoice);

        assert_eq!(meta.doc_type, DocumentType::Invoice);
        assert_eq!(meta.created_at, file.created_time.unwrap());
        assert_eq!(meta.updated_at, meta.created_at);
        assert!(meta.tags.is_empty());
        assert!(meta.client_name.is_none());
        assert!(meta.amount.is_none());
    }
}
