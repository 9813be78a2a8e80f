//! Download routes - preview and export of the current document.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use pdf_editor_core::{Action, ExportedPdf};
use std::sync::Arc;

use super::SESSION_NOT_FOUND;
use crate::helpers::{ActionResultExt, OptionExt, ResultExt, RouteResult};
use crate::state::AppState;

/// The document as currently shown: the edit if any, else the active file.
pub async fn preview_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<Response> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let bytes = session
        .lock()
        .await
        .preview_bytes()
        .cloned()
        .ok_or_else(|| (StatusCode::CONFLICT, "Open a PDF first.".to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ExportedPdf::MIME)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(bytes))
        .or_internal_error()
}

/// Download the edited document as an attachment.
pub async fn export_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<Response> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let exported = session
        .lock()
        .await
        .export_current()
        .or_action_error(Action::Export)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ExportedPdf::MIME)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", exported.filename),
        )
        .body(Body::from(exported.bytes))
        .or_internal_error()
}
