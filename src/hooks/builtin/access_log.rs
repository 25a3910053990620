//! Access logging and request metrics.

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::hooks::hook::{ErrorHook, PostHook};
use crate::http::error::{BoxError, HttpError};
use crate::http::MatchedRoute;
use crate::observability::metrics;

/// Logs each completed request and records request metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessLog;

impl AccessLog {
    fn record(&self, ctx: &ExecutionContext, status: u16) {
        let route = ctx
            .get::<MatchedRoute>()
            .map(|r| r.0)
            .unwrap_or_else(|| "none".to_string());
        let method = ctx.request().method().as_str();
        let latency = ctx.started().elapsed();

        tracing::info!(
            request_id = %ctx.id(),
            method = %method,
            path = %ctx.request().path(),
            route = %route,
            status,
            latency_ms = latency.as_millis() as u64,
            "Request completed"
        );
        metrics::record_request(method, status, &route, ctx.started());
    }
}

#[async_trait]
impl PostHook for AccessLog {
    async fn after(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        let status = ctx.with_response(|res| res.status().as_u16());
        self.record(ctx, status);
        Ok(())
    }
}

#[async_trait]
impl ErrorHook for AccessLog {
    async fn on_error(&self, ctx: &ExecutionContext, error: &HttpError) -> Result<(), BoxError> {
        if error.status().is_server_error() {
            tracing::error!(request_id = %ctx.id(), error = %error, cause = ?std::error::Error::source(error), "Request failed");
        }
        self.record(ctx, error.status().as_u16());
        Ok(())
    }
}
