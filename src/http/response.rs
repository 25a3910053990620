//! Outbound response and finalization.
//!
//! # Responsibilities
//! - Accumulate status, headers, cookies and body while a request runs
//! - Serialize the body according to its content type
//! - Produce the final `http::Response` handed back to the transport
//!
//! # Design Decisions
//! - Headers and cookies survive an error reset; status and body do not
//! - Explicit content type always wins over the inferred one

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::http::cookie::Cookie;
use crate::http::error::HttpError;

/// Response payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl Body {
    fn default_content_type(&self) -> Option<&'static str> {
        match self {
            Body::Empty => None,
            Body::Json(_) => Some("application/json"),
            Body::Text(_) => Some("text/plain; charset=utf-8"),
            Body::Binary(_) => Some("application/octet-stream"),
        }
    }

    fn into_bytes(self) -> Result<Bytes, serde_json::Error> {
        Ok(match self {
            Body::Empty => Bytes::new(),
            Body::Json(value) => Bytes::from(serde_json::to_vec(&value)?),
            Body::Text(text) => Bytes::from(text),
            Body::Binary(bytes) => bytes,
        })
    }
}

/// Mutable response built up by hooks and handlers.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    cookies: Vec<Cookie>,
    body: Body,
    content_type: Option<String>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body: Body::Empty,
            content_type: None,
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set a header, replacing existing values.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn add_cookie(&mut self, cookie: Cookie) -> &mut Self {
        self.cookies.push(cookie);
        self
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: Body) -> &mut Self {
        self.body = body;
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, serde_json::Error> {
        self.body = Body::Json(serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.body = Body::Text(text.into());
        self
    }

    pub fn binary(&mut self, bytes: impl Into<Bytes>) -> &mut Self {
        self.body = Body::Binary(bytes.into());
        self
    }

    /// Override the inferred content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .or_else(|| self.body.default_content_type())
    }

    /// 302 redirect to `location`.
    pub fn redirect(&mut self, location: &str) -> Result<&mut Self, HttpError> {
        let value = HeaderValue::from_str(location).map_err(|e| {
            HttpError::internal().with_source(e)
        })?;
        self.status = StatusCode::FOUND;
        self.headers.insert(header::LOCATION, value);
        Ok(self)
    }

    /// Replace status and body with the default rendering of `error`.
    pub fn reset_to_error(&mut self, error: &HttpError) {
        self.status = error.status();
        self.body = Body::Json(error.to_body());
        self.content_type = None;
    }

    /// Serialize into the transport response.
    pub fn finalize(self) -> Result<axum::http::Response<Bytes>, HttpError> {
        let content_type = self.content_type().map(str::to_string);
        let Response {
            status,
            mut headers,
            cookies,
            body,
            ..
        } = self;

        let bytes = body
            .into_bytes()
            .map_err(|e| HttpError::internal().with_source(e))?;

        if let Some(content_type) = content_type {
            let value = HeaderValue::from_str(&content_type)
                .map_err(|e| HttpError::internal().with_source(e))?;
            headers.insert(header::CONTENT_TYPE, value);
        }
        for cookie in &cookies {
            let rendered = cookie
                .to_header_value()
                .map_err(|e| HttpError::internal().with_source(e))?;
            let value = HeaderValue::from_str(&rendered)
                .map_err(|e| HttpError::internal().with_source(e))?;
            headers.append(header::SET_COOKIE, value);
        }
        if !(status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED)
        {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        }

        let mut response = axum::http::Response::new(bytes);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
