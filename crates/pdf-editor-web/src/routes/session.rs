//! Session lifecycle routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pdf_editor_core::SessionSnapshot;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::SESSION_NOT_FOUND;
use crate::helpers::{OptionExt, RouteResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub id: String,
}

/// Start an empty editing session.
pub async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionCreated>) {
    let id = state.create_session().await;
    info!("Created session {}", id);
    (StatusCode::CREATED, Json(SessionCreated { id: id.to_string() }))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<Json<SessionSnapshot>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}
