//! Overlay routes: stage an image or text, then confirm its position or cancel.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::Multipart;
use pdf_editor_core::{Action, PendingOverlay, Point, Rect, RgbColor, TextStyle};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::files::read_files;
use super::{OperationResponse, SESSION_NOT_FOUND, respond, with_session_blocking};
use crate::helpers::{ActionResultExt, OptionExt, RouteResult};
use crate::state::AppState;

/// Where to draw the pending image, in PDF points from the bottom-left corner.
#[derive(Debug, Deserialize)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    /// Omitted: derived from the image's aspect ratio
    pub height: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
    pub font_size: Option<f32>,
    /// Color name or "r,g,b"
    pub color: Option<String>,
    pub font: Option<String>,
}

/// Baseline of the first text line.
#[derive(Debug, Deserialize)]
pub struct TextPlacement {
    pub x: f32,
    pub y: f32,
}

/// Stage the uploaded image for the current page.
pub async fn request_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let image = read_files(&mut multipart).await?.swap_remove(0);

    with_session_blocking(session, move |s| {
        s.request_image_overlay(image).map(|notice| respond(notice, s))
    })
    .await?
    .or_action_error(Action::AddImage)
}

pub async fn confirm_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(placement): Json<ImagePlacement>,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;

    with_session_blocking(session, move |s| {
        let ImagePlacement { x, y, width, height } = placement;
        let rect = match (height, s.pending()) {
            (Some(height), _) => Rect::new(x, y, width, height),
            (None, Some(PendingOverlay::Image { dimensions, .. })) => {
                Rect::scale_to_width(x, y, width, *dimensions)
            }
            // Nothing to scale against; confirming reports why.
            (None, _) => Rect::new(x, y, width, width),
        };
        s.confirm_image_overlay(rect).map(|notice| respond(notice, s))
    })
    .await?
    .or_action_error(Action::AddImage)
}

/// Stage text for the current page. Unset style fields use configured defaults.
pub async fn request_text(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<TextRequest>,
) -> RouteResult<Json<OperationResponse>> {
    let mut style = TextStyle::from_config(&state.config);
    if let Some(size) = request.font_size {
        style.font_size = size;
    }
    if let Some(color) = &request.color {
        style.color = RgbColor::parse(color).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid color '{color}' (use a name or r,g,b)"),
            )
        })?;
    }
    if let Some(font) = request.font {
        style.font = font;
    }

    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let mut session = session.lock().await;
    let notice = session
        .request_text_overlay(request.text, style)
        .or_action_error(Action::AddText)?;
    Ok(respond(notice, &session))
}

/// Draw the pending text. The font is fetched while the session is locked,
/// so other requests for this session wait for it.
pub async fn confirm_text(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(placement): Json<TextPlacement>,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let mut session = session.lock().await;

    let notice = session
        .confirm_text_overlay(Point::new(placement.x, placement.y), state.fonts.as_ref())
        .await
        .or_action_error(Action::AddText)?;
    info!("Session {}: {}", id, notice);
    Ok(respond(notice, &session))
}

pub async fn cancel_overlay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<Json<OperationResponse>> {
    let session = state.get_session(&id).await.or_not_found(SESSION_NOT_FOUND)?;
    let mut session = session.lock().await;
    let notice = session.cancel_overlay().or_action_error(Action::CancelOverlay)?;
    Ok(respond(notice, &session))
}
