//! Drive handlers.
//!
//! Extractor rejections are taken as `Result` so malformed parameters are
//! reported through [`ApiError`] like every other failure.

use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use docdrive_common::{DocumentMetadata, DocumentType, FileInfo};

use crate::errors::ApiError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    page_size: Option<u32>,
    folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: String,
    page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    page_size: Option<u32>,
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<FileInfo>>, ApiError> {
    let Query(params) = params?;
    let files = state
        .drive
        .list_files(
            params.folder_id.as_deref(),
            params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(files))
}

pub async fn search_files(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<FileInfo>>, ApiError> {
    let Query(params) = params?;
    let files = state
        .drive
        .search_files(&params.query, params.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(files))
}

pub async fn file_metadata(
    State(state): State<Arc<AppState>>,
    file_id: Result<Path<String>, PathRejection>,
) -> Result<Json<DocumentMetadata>, ApiError> {
    let Path(file_id) = file_id?;
    Ok(Json(state.drive.get_document_metadata(&file_id).await?))
}

pub async fn files_by_type(
    State(state): State<Arc<AppState>>,
    doc_type: Result<Path<String>, PathRejection>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<DocumentMetadata>>, ApiError> {
    let Path(doc_type) = doc_type?;
    let Query(params) = params?;
    let doc_type: DocumentType = doc_type.parse()?;
    let documents = state
        .drive
        .list_documents_by_type(doc_type, params.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(documents))
}
