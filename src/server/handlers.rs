//! `/generate` handlers. GET reads query parameters, POST reads a JSON body; both render
//! the whole response in memory (bounded by the configured max range) on the blocking pool.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::error::ApiError;
use super::AppState;
use crate::formats::OutputFormat;
use crate::generator::{generate_links, LinkRequest, DEFAULT_LABEL_TEMPLATE};

/// Parameters accepted by `/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateParams {
    pub url: String,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub pad: usize,
    #[serde(default = "default_step")]
    pub step: i64,
    pub label_template: Option<String>,
    pub format: Option<String>,
    pub title: Option<String>,
    /// Add `Content-Disposition: attachment`.
    #[serde(default)]
    pub download: bool,
}

fn default_step() -> i64 {
    1
}

pub async fn generate_get(
    State(state): State<Arc<AppState>>,
    query: Result<Query<GenerateParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    render_blocking(state, params).await
}

pub async fn generate_post(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GenerateParams>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(params) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    render_blocking(state, params).await
}

/// Run [`render`] off the async workers; large ranges format thousands of records.
async fn render_blocking(
    state: Arc<AppState>,
    params: GenerateParams,
) -> Result<Response, ApiError> {
    tokio::task::spawn_blocking(move || render(&state, params))
        .await
        .map_err(|e| ApiError::Internal(format!("render task failed: {}", e)))?
}

fn render(state: &AppState, params: GenerateParams) -> Result<Response, ApiError> {
    let format = match params.format.as_deref() {
        Some(name) => name.parse::<OutputFormat>()?,
        None => OutputFormat::Html,
    };
    let request = LinkRequest {
        url_template: params.url,
        start: params.start,
        end: params.end,
        pad: params.pad,
        step: params.step,
        label_template: params
            .label_template
            .unwrap_or_else(|| DEFAULT_LABEL_TEMPLATE.to_string()),
    };
    let links = generate_links(&request, &state.limits)?;

    let title = params.title.as_deref().unwrap_or(&state.title);
    let mut body = Vec::new();
    let count = format.write_stream(links, &mut body, title)?;
    tracing::info!(count, format = %format, start = request.start, end = request.end, "generated links");

    let mut response = ([(header::CONTENT_TYPE, format.content_type())], body).into_response();
    if params.download {
        let disposition = format!("attachment; filename=\"links.{}\"", format.extension());
        if let Ok(val) = HeaderValue::from_str(&disposition) {
            response.headers_mut().insert(header::CONTENT_DISPOSITION, val);
        }
    }
    Ok(response)
}
