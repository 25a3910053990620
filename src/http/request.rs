//! Inbound request representation.
//!
//! # Responsibilities
//! - Hold the parsed request handed over by the transport
//! - Resolve the request ID (client-supplied or freshly generated)
//! - Parse query parameters once
//!
//! # Design Decisions
//! - The body is fully buffered; size limits are enforced by the transport
//! - Request ID added as early as possible for tracing

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::http::error::HttpError;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Unique identifier of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Use the client's `x-request-id` when present, otherwise a UUID v4.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .unwrap_or_else(|| Self(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Parse a raw query string (`a=1&b=two`). Later duplicates win.
    pub fn with_query_string(mut self, raw: &str) -> Self {
        self.query = url::form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Build from transport-level parts.
    pub fn from_parts(parts: &axum::http::request::Parts, body: Bytes) -> Self {
        Self::new(parts.method.clone(), parts.uri.path())
            .with_query_string(parts.uri.query().unwrap_or_default())
            .with_headers(parts.headers.clone())
            .with_body(body)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize the JSON payload, answering 400 when it is malformed.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            HttpError::bad_request("Malformed JSON payload").with_source(e)
        })
    }
}
