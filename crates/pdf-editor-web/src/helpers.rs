//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Option` and `Result` types
//! into HTTP-appropriate error responses, reducing boilerplate in routes.

use axum::http::StatusCode;
use pdf_editor_core::{Action, Error};
use tracing::warn;

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
///
/// Provides convenient methods for returning 404 Not Found when
/// an expected resource (like a session) doesn't exist.
pub trait OptionExt<T> {
    /// Returns the contained value or a 404 Not Found error.
    fn or_not_found(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::NOT_FOUND, msg.to_string()))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

/// Extension trait for core results: maps the error to a status and a
/// message naming the failed action.
pub trait ActionResultExt<T> {
    fn or_action_error(self, action: Action) -> RouteResult<T>;
}

impl<T> ActionResultExt<T> for Result<T, Error> {
    fn or_action_error(self, action: Action) -> RouteResult<T> {
        self.map_err(|e| {
            let status = status_for(&e);
            if status.is_server_error() {
                warn!("{} failed: {}", action.label(), e);
            }
            (status, action.failure_message(&e))
        })
    }
}

/// HTTP status for a core error.
pub const fn status_for(error: &Error) -> StatusCode {
    if error.is_input_error() {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    match error {
        Error::NoActiveDocument
        | Error::NothingToExport
        | Error::NoPendingOverlay
        | Error::PendingOverlayMismatch { .. }
        | Error::NotEnoughFilesToMerge { .. } => StatusCode::CONFLICT,
        Error::FontLoad(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a 1-based number from a request into a 0-based index.
///
/// Returns 400 Bad Request for zero.
pub fn to_index(number: usize, what: &str) -> RouteResult<usize> {
    number.checked_sub(1).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("{what} numbers start at 1, got {number}"),
        )
    })
}
