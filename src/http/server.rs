//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router whose fallback hands every request to the dispatcher
//! - Wire up middleware (tracing, timeout, body limit)
//! - Bind server to listener and serve until shutdown
//! - Translate fatal dispatch failures into a bare 500

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::app::App;
use crate::config::ServerConfig;
use crate::http::dispatch::Dispatcher;
use crate::http::request::Request;

/// Error raised while serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for an [`App`].
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    dispatcher: Dispatcher,
}

impl HttpServer {
    /// Freeze `app` and build the transport around it.
    pub fn new(config: ServerConfig, app: App) -> Self {
        let (endpoints, hooks) = app.into_parts();
        let dispatcher = Dispatcher::new(endpoints, hooks);
        let router = Self::build_router(&config, dispatcher.clone());
        Self {
            router,
            config,
            dispatcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, dispatcher: Dispatcher) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.endpoints().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Buffer the request and hand it to the dispatcher.
async fn dispatch_handler(State(dispatcher): State<Dispatcher>, request: axum::extract::Request) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Failed to read request body");
            return body_read_failure(&e).into_response();
        }
    };

    match dispatcher.dispatch(Request::from_parts(&parts, bytes), peer).await {
        Ok(response) => response.map(Body::from).into_response(),
        Err(e) => {
            tracing::error!(
                method = %parts.method,
                path = %parts.uri.path(),
                error = %e,
                cause = ?std::error::Error::source(&e),
                "Dispatch failed"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// 413 when the body limit tripped mid-stream, 400 for any other read failure.
fn body_read_failure(error: &axum::Error) -> (StatusCode, &'static str) {
    if is_length_limit(error) {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else {
        (StatusCode::BAD_REQUEST, "Failed to read request body")
    }
}

/// `RequestBodyLimitLayer` reports streamed overruns as a boxed
/// `LengthLimitError` somewhere in the source chain.
fn is_length_limit(error: &axum::Error) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = current {
        if err.to_string() == "length limit exceeded" {
            return true;
        }
        current = err.source();
    }
    false
}
