//! HTTP error model.
//!
//! # Responsibilities
//! - Carry a status code, message and optional structured data
//! - Wrap untyped failures into a generic 500 without leaking their text
//! - Render the default JSON error body
//!
//! # Design Decisions
//! - Handlers and hooks return `BoxError`; the dispatcher downcasts to `HttpError`
//! - The wrapped error stays reachable through `source()` for logging only

use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Boxed error returned by handlers and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure that maps directly onto an HTTP response.
#[derive(Debug, Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
    data: Option<Value>,
    #[source]
    source: Option<BoxError>,
}

impl HttpError {
    /// Create an error with an explicit status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    /// Attach structured data sent to the client with the error.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Generic internal server error.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::INTERNAL_SERVER_ERROR
                .canonical_reason()
                .unwrap_or("Internal Server Error"),
        )
    }

    /// Resolve any failure to exactly one `HttpError`.
    ///
    /// Typed errors pass through unchanged. Anything else becomes a generic
    /// 500 whose message does not include the original text.
    pub fn from_boxed(error: BoxError) -> Self {
        match error.downcast::<HttpError>() {
            Ok(typed) => *typed,
            Err(other) => Self::internal().with_source(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// JSON body used when no error hook rewrites the response.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "status": self.status.as_u16(),
            "message": self.message,
        });
        if let (Some(data), Some(map)) = (&self.data, body.as_object_mut()) {
            map.insert("data".to_string(), data.clone());
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_typed_error_passes_through() {
        let boxed: BoxError = Box::new(
            HttpError::conflict("already exists").with_data(json!({"id": 7})),
        );
        let err = HttpError::from_boxed(boxed);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "already exists");
        assert_eq!(err.data(), Some(&json!({"id": 7})));
    }

    #[test]
    fn test_untyped_error_is_wrapped() {
        let boxed: BoxError = "database password is hunter2".into();
        let err = HttpError::from_boxed(boxed);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("hunter2"));
        // Cause stays available for logs.
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("hunter2"));
    }

    #[test]
    fn test_body_includes_data_only_when_present() {
        let plain = HttpError::not_found("no route").to_body();
        assert_eq!(plain, json!({"status": 404, "message": "no route"}));

        let rich = HttpError::bad_request("invalid")
            .with_data(json!({"field": "name"}))
            .to_body();
        assert_eq!(rich["data"]["field"], "name");
    }
}
