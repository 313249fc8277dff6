//! Common utilities and types shared across DocDrive modules.
//!
//! This module provides the error taxonomy, the file and document model,
//! and the filename classifier used by both the storage client and the
//! HTTP layer.

pub mod classify;
pub mod error;
pub mod types;

pub use classify::classify_document;
pub use error::{Error, Result};
pub use types::{DocumentMetadata, DocumentType, FileInfo, FileKind};
