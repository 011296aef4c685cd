//! Axum route handlers for the CV API.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::profile::{ProjectSelection, RenderContext};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CvQuery {
    /// `all` or `featured`; the configured default when absent.
    pub projects: Option<String>,
}

impl CvQuery {
    fn selection(&self) -> Result<Option<ProjectSelection>, AppError> {
        self.projects
            .as_deref()
            .map(|raw| raw.parse::<ProjectSelection>().map_err(AppError::Validation))
            .transpose()
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    pub data: RenderContext,
}

/// RFC 5987 `attr-char`: everything else in `filename*` is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// `attachment` with an ASCII `filename` for old clients and the exact UTF-8
/// name in `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        utf8_percent_encode(filename, ATTR_CHAR)
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/cv/generate
///
/// Streams the caller's CV back as a PDF attachment.
pub async fn handle_generate_cv(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<CvQuery>,
) -> Result<Response, AppError> {
    let projects = query.selection()?;
    let document = state.pipeline.generate_cv(user_id, projects).await?;

    let disposition = content_disposition(&document.filename);
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}

/// GET /api/v1/cv/preview
///
/// The data the CV would be rendered from, as JSON. No engine involved.
pub async fn handle_preview_cv(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<CvQuery>,
) -> Result<Json<PreviewResponse>, AppError> {
    let projects = query.selection()?;
    let data = state.pipeline.preview(user_id, projects).await?;
    Ok(Json(PreviewResponse {
        success: true,
        data,
    }))
}
