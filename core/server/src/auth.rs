//! Browser consent flow for installed-app credentials.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use docdrive_common::Error;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Send the browser to the provider's consent page.
pub async fn login(State(state): State<Arc<AppState>>) -> Result<Redirect, ApiError> {
    let url = state.drive.credentials().authorization_url()?;
    Ok(Redirect::temporary(&url))
}

/// Redirect target: exchange the code and persist the token.
pub async fn oauth2_redirect(
    State(state): State<Arc<AppState>>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    if let Some(error) = params.error {
        return Err(Error::Authentication(format!("Authorization denied: {}", error)).into());
    }

    let code = params
        .code
        .ok_or_else(|| Error::InvalidInput("Missing authorization code".to_string()))?;
    let csrf = params
        .state
        .ok_or_else(|| Error::InvalidInput("Missing state parameter".to_string()))?;

    state
        .drive
        .credentials()
        .complete_consent(&code, &csrf)
        .await?;

    Ok(Json(json!({ "status": "authenticated" })))
}
