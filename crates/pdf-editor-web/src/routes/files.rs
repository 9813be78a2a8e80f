//! Working-set routes: upload, remove and select files.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::Multipart;
use pdf_editor_core::{Action, SourceFile};
use std::sync::Arc;
use tracing::info;

use super::{OperationResponse, SESSION_NOT_FOUND, respond, with_session_blocking};
use crate::helpers::{ActionResultExt, OptionExt, ResultExt, RouteResult};
use crate::state::AppState;

/// Read every `file` field of a multipart upload.
///
/// The declared content type wins; unnamed or generic types fall back to the
/// file name.
pub(super) async fn read_files(multipart: &mut Multipart) -> RouteResult<Vec<SourceFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let mime = field.content_type().map(str::to_string);
        let data = field.bytes().await.or_bad_request()?;

        files.push(SourceFile::with_declared_mime(filename, mime.as_deref(), data));
    }

    if files.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }
    Ok(files)
}

/// Append uploaded files to the working set.
pub async fn add_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let files = read_files(&mut multipart).await?;
    info!("Session {}: adding {} files", id, files.len());

    let mut session = session.lock().await;
    let notice = session.add_files(files);
    Ok(respond(notice, &session))
}

/// Remove a file by its 0-based position in the working set.
pub async fn remove_file(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let mut session = session.lock().await;
    let notice = session.remove_file(index).or_action_error(Action::RemoveFile)?;
    Ok(respond(notice, &session))
}

/// Make the file at the 0-based `index` the active document.
pub async fn select_file(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    // Selecting parses the new document to clamp the page cursor.
    with_session_blocking(session, move |s| {
        s.select_active(index).map(|notice| respond(notice, s))
    })
    .await?
    .or_action_error(Action::SelectFile)
}
