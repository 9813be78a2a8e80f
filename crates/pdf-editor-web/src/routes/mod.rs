//! HTTP route handlers for the PDF editor API.
//!
//! Every session route takes the session UUID from the path. Operations
//! answer with the [`Notice`] they produced, its user-facing message, and the
//! updated session snapshot. Binary routes return PDF bytes.

mod download;
mod edit;
mod files;
mod overlay;
mod session;

pub use download::{export_pdf, preview_pdf};
pub use edit::{merge, reorder, reset, set_page};
pub use files::{add_files, remove_file, select_file};
pub use overlay::{cancel_overlay, confirm_image, confirm_text, request_image, request_text};
pub use session::{create_session, get_session};

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use pdf_editor_core::{EditSession, Notice, SessionSnapshot};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::helpers::{ResultExt, RouteResult};
use crate::state::AppState;

const SESSION_NOT_FOUND: &str = "Session not found";

/// Body returned by every session operation.
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub notice: Notice,
    pub message: String,
    pub session: SessionSnapshot,
}

fn respond(notice: Notice, session: &EditSession) -> Json<OperationResponse> {
    Json(OperationResponse {
        message: notice.to_string(),
        notice,
        session: session.snapshot(),
    })
}

/// Run `f` on a blocking thread with the session locked.
///
/// PDF parsing and serialization are CPU-bound, so they stay off the async
/// runtime. The lock is held for the whole closure, which serializes
/// operations within one session.
async fn with_session_blocking<F, R>(session: Arc<Mutex<EditSession>>, f: F) -> RouteResult<R>
where
    F: FnOnce(&mut EditSession) -> R + Send + 'static,
    R: Send + 'static,
{
    let mut guard = session.lock_owned().await;
    tokio::task::spawn_blocking(move || f(&mut guard))
        .await
        .or_internal_error()
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/files", post(add_files))
        .route("/api/sessions/{id}/files/{index}", delete(remove_file))
        .route("/api/sessions/{id}/files/{index}/select", post(select_file))
        .route("/api/sessions/{id}/page/{number}", post(set_page))
        .route("/api/sessions/{id}/merge", post(merge))
        .route("/api/sessions/{id}/reorder", post(reorder))
        .route("/api/sessions/{id}/image", post(request_image))
        .route("/api/sessions/{id}/image/confirm", post(confirm_image))
        .route("/api/sessions/{id}/text", post(request_text))
        .route("/api/sessions/{id}/text/confirm", post(confirm_text))
        .route("/api/sessions/{id}/overlay/cancel", post(cancel_overlay))
        .route("/api/sessions/{id}/reset", post(reset))
        .route("/api/sessions/{id}/preview", get(preview_pdf))
        .route("/api/sessions/{id}/export", get(export_pdf))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use lopdf::{Dictionary, Document, Object, Stream};
    use pdf_editor_core::{AppConfig, DirFontSource, PdfDocument};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const BOUNDARY: &str = "pdf-editor-test-boundary";
    const FONT_NAME: &str = "DejaVuSans-ExtraLight.ttf";

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn app() -> Router {
        let fonts = Arc::new(DirFontSource::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../pdf-editor-core/tests/fixtures"
        )));
        router(Arc::new(AppState::with_fonts(AppConfig::default(), fonts)))
    }

    /// A PDF with `pages` empty Letter pages.
    fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let tree_id = doc.new_object_id();
        let mut kids = Vec::new();
        for _ in 0..pages {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(tree_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Dictionary(Dictionary::new())),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
                ),
            ]));
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            tree_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Count", Object::Integer(i64::try_from(kids.len()).unwrap())),
                ("Kids", Object::Array(kids)),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(tree_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 0, 0]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    /// Multipart body with one `file` field per entry.
    fn multipart(files: &[(&str, &str, &[u8])]) -> Body {
        let mut body = Vec::new();
        for (name, mime, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: {mime}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn post_json(app: &Router, uri: &str, value: &Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap();
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn post_empty(app: &Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = send(app, Request::post(uri).body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn upload(app: &Router, uri: &str, files: &[(&str, &str, &[u8])]) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart(files))
            .unwrap();
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = post_empty(app, "/api/sessions").await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("session id").to_string()
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app();
        let (status, _) = post_empty(&app, "/api/sessions/not-a-session/merge").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_merge_then_export() {
        let app = app();
        let id = new_session(&app).await;
        let base = format!("/api/sessions/{id}");

        let (status, _) = send(&app, Request::get(format!("{base}/export")).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let a = sample_pdf(3);
        let b = sample_pdf(2);
        let (status, body) = upload(
            &app,
            &format!("{base}/files"),
            &[("a.pdf", "application/pdf", &a), ("b.pdf", "application/pdf", &b)],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notice"]["kind"], "files_added");
        assert_eq!(body["session"]["files"].as_array().unwrap().len(), 2);

        let (status, body) = post_empty(&app, &format!("{base}/merge")).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["notice"]["pages"], 5);
        assert_eq!(body["session"]["files"][0]["name"], "merged.pdf");

        let response = app
            .clone()
            .oneshot(Request::get(format!("{base}/export")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("edited.pdf"), "got {disposition}");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(PdfDocument::load(&bytes).unwrap().page_count(), 5);
    }

    #[tokio::test]
    async fn test_merge_needs_two_files() {
        let app = app();
        let id = new_session(&app).await;
        let pdf = sample_pdf(1);
        upload(&app, &format!("/api/sessions/{id}/files"), &[("a.pdf", "application/pdf", &pdf)]).await;

        let (status, _) = post_empty(&app, &format!("/api/sessions/{id}/merge")).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_image_overlay_flow() {
        let app = app();
        let id = new_session(&app).await;
        let base = format!("/api/sessions/{id}");
        let pdf = sample_pdf(2);
        upload(&app, &format!("{base}/files"), &[("a.pdf", "application/pdf", &pdf)]).await;

        let (status, _) = post_empty(&app, &format!("{base}/page/2")).await;
        assert_eq!(status, StatusCode::OK);

        let png = png_bytes(40, 20);
        let (status, body) = upload(&app, &format!("{base}/image"), &[("logo.png", "image/png", &png)]).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["session"]["pending_overlay"]["overlay"], "image");
        assert_eq!(body["session"]["pending_overlay"]["page_number"], 2);

        // Height omitted: keeps the 2:1 aspect ratio.
        let (status, body) = post_json(
            &app,
            &format!("{base}/image/confirm"),
            &json!({ "x": 10.0, "y": 10.0, "width": 100.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["notice"]["page_number"], 2);
        assert!(body["session"]["pending_overlay"].is_null());
        assert_eq!(body["session"]["edited"], true);

        let (_, bytes) = send(&app, Request::get(format!("{base}/preview")).body(Body::empty()).unwrap()).await;
        let doc = PdfDocument::load(&bytes).unwrap();
        let content = String::from_utf8_lossy(&doc.page_content(1).unwrap()).into_owned();
        assert!(content.contains("100 0 0 50 10 10 cm"), "got {content}");
    }

    #[tokio::test]
    async fn test_unsupported_image_is_rejected() {
        let app = app();
        let id = new_session(&app).await;
        let base = format!("/api/sessions/{id}");
        let pdf = sample_pdf(1);
        upload(&app, &format!("{base}/files"), &[("a.pdf", "application/pdf", &pdf)]).await;

        let (status, _) = upload(&app, &format!("{base}/image"), &[("anim.gif", "image/gif", b"GIF89a")]).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_text_overlay_flow() {
        let app = app();
        let id = new_session(&app).await;
        let base = format!("/api/sessions/{id}");
        let pdf = sample_pdf(1);
        upload(&app, &format!("{base}/files"), &[("a.pdf", "application/pdf", &pdf)]).await;

        let (status, _) = post_json(&app, &format!("{base}/text/confirm"), &json!({ "x": 1.0, "y": 1.0 })).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = post_json(
            &app,
            &format!("{base}/text"),
            &json!({ "text": "Hello\nWorld", "font_size": 12.0, "color": "red", "font": FONT_NAME }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post_json(&app, &format!("{base}/text/confirm"), &json!({ "x": 72.0, "y": 700.0 })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["notice"]["lines"], 2);
    }

    #[tokio::test]
    async fn test_missing_font_is_bad_gateway_and_keeps_pending() {
        let app = app();
        let id = new_session(&app).await;
        let base = format!("/api/sessions/{id}");
        let pdf = sample_pdf(1);
        upload(&app, &format!("{base}/files"), &[("a.pdf", "application/pdf", &pdf)]).await;

        post_json(&app, &format!("{base}/text"), &json!({ "text": "x", "font": "missing.ttf" })).await;
        let (status, _) = post_json(&app, &format!("{base}/text/confirm"), &json!({ "x": 1.0, "y": 1.0 })).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, body) = post_empty(&app, &format!("{base}/overlay/cancel")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notice"]["kind"], "overlay_cancelled");
        assert_eq!(body["session"]["edited"], false);
    }

    #[tokio::test]
    async fn test_reorder_and_reset() {
        let app = app();
        let id = new_session(&app).await;
        let base = format!("/api/sessions/{id}");
        let pdf = sample_pdf(3);
        upload(&app, &format!("{base}/files"), &[("a.pdf", "application/pdf", &pdf)]).await;

        let (status, _) = post_json(&app, &format!("{base}/reorder"), &json!({ "order": [0, 1] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_json(&app, &format!("{base}/reorder"), &json!({ "order": [3, 1, 1] })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["session"]["page_count"], 3);

        let (_, body) = post_json(&app, &format!("{base}/reset"), &json!({ "confirm": false })).await;
        assert_eq!(body["notice"]["kind"], "reset_declined");
        assert_eq!(body["session"]["edited"], true);

        let (_, body) = post_json(&app, &format!("{base}/reset"), &json!({ "confirm": true })).await;
        assert_eq!(body["notice"]["kind"], "reset");
        assert_eq!(body["session"]["edited"], false);
    }

    #[tokio::test]
    async fn test_remove_and_select_files() {
        let app = app();
        let id = new_session(&app).await;
        let base = format!("/api/sessions/{id}");
        let a = sample_pdf(1);
        let b = sample_pdf(2);
        upload(
            &app,
            &format!("{base}/files"),
            &[("a.pdf", "application/pdf", &a), ("b.pdf", "application/pdf", &b)],
        )
        .await;

        let (status, body) = post_empty(&app, &format!("{base}/files/1/select")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["active"], 1);
        assert_eq!(body["session"]["page_count"], 2);

        let request = Request::delete(format!("{base}/files/5")).body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let request = Request::delete(format!("{base}/files/1")).body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["session"]["files"].as_array().unwrap().len(), 1);
        assert_eq!(body["session"]["active"], 0);

        let (status, snapshot) = send(&app, Request::get(base.clone()).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let snapshot: Value = serde_json::from_slice(&snapshot).unwrap();
        assert_eq!(snapshot["files"][0]["name"], "a.pdf");
    }
}
