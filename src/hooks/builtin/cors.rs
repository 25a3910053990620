//! CORS headers for successful and failed responses.

use async_trait::async_trait;
use axum::http::{header, HeaderValue, Method, StatusCode};

use crate::config::CorsConfig;
use crate::context::ExecutionContext;
use crate::hooks::hook::{ErrorHook, PreHook};
use crate::http::error::{BoxError, HttpError};
use crate::http::response::Body;

/// Applies CORS headers before the handler runs and again on failure.
///
/// An `OPTIONS` request that matched no endpoint is answered as a
/// preflight with `204 No Content`.
#[derive(Debug, Clone)]
pub struct Cors {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
    allow_credentials: bool,
}

impl Cors {
    pub fn new(config: &CorsConfig) -> Result<Self, BoxError> {
        Ok(Self {
            allow_origin: HeaderValue::from_str(&config.allow_origin)?,
            allow_methods: HeaderValue::from_str(&config.allow_methods.join(", "))?,
            allow_headers: HeaderValue::from_str(&config.allow_headers.join(", "))?,
            max_age: HeaderValue::from(config.max_age_secs),
            allow_credentials: config.allow_credentials,
        })
    }

    fn apply(&self, ctx: &ExecutionContext) {
        ctx.with_response(|res| {
            let headers = res.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
            if self.allow_credentials {
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
            }
        });
    }
}

#[async_trait]
impl PreHook for Cors {
    async fn before(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        self.apply(ctx);
        Ok(())
    }
}

#[async_trait]
impl ErrorHook for Cors {
    async fn on_error(&self, ctx: &ExecutionContext, error: &HttpError) -> Result<(), BoxError> {
        self.apply(ctx);
        if *ctx.request().method() == Method::OPTIONS && error.status() == StatusCode::NOT_FOUND {
            ctx.with_response(|res| {
                res.set_status(StatusCode::NO_CONTENT).set_body(Body::Empty);
            });
        }
        Ok(())
    }
}
