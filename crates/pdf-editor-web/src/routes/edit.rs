//! Whole-document routes: page cursor, merge, reorder and reset.

use axum::{
    Json,
    extract::{Path, State},
};
use pdf_editor_core::Action;
use serde::Deserialize;
use std::sync::Arc;

use super::{OperationResponse, SESSION_NOT_FOUND, respond, with_session_blocking};
use crate::helpers::{ActionResultExt, OptionExt, RouteResult, to_index};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// 1-based page numbers in their new order; repeats allowed
    pub order: Vec<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// Move the page cursor to the 1-based `number`.
pub async fn set_page(
    State(state): State<Arc<AppState>>,
    Path((id, number)): Path<(String, usize)>,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    with_session_blocking(session, move |s| {
        s.set_page_number(number).map(|notice| respond(notice, s))
    })
    .await?
    .or_action_error(Action::ChangePage)
}

/// Merge the whole working set in upload order.
pub async fn merge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    with_session_blocking(session, |s| s.merge_all().map(|notice| respond(notice, s)))
        .await?
        .or_action_error(Action::Merge)
}

pub async fn reorder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ReorderRequest>,
) -> RouteResult<Json<OperationResponse>> {
    let order = request
        .order
        .iter()
        .map(|&n| to_index(n, "Page"))
        .collect::<RouteResult<Vec<_>>>()?;

    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    with_session_blocking(session, move |s| {
        s.reorder_pages(&order).map(|notice| respond(notice, s))
    })
    .await?
    .or_action_error(Action::Reorder)
}

/// Discard all edits. The request body carries the user's answer to the
/// confirmation prompt.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ResetRequest>,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let mut session = session.lock().await;
    let notice = session.reset(&mut |_: &str| request.confirm);
    Ok(respond(notice, &session))
}
