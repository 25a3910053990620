//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use http_kernel::hooks::{ErrorHook, PostHook, PreHook};
use http_kernel::http::{BoxError, HttpError, ServerError};
use http_kernel::{App, ExecutionContext, Handler, HttpServer, ServerConfig, Shutdown};

/// Ordered record of hook and handler invocations.
#[derive(Debug, Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Hook that records its label in every phase it is registered for.
pub struct Tap {
    pub label: &'static str,
    pub trace: Trace,
}

impl Tap {
    pub fn new(label: &'static str, trace: &Trace) -> Self {
        Self {
            label,
            trace: trace.clone(),
        }
    }
}

#[async_trait]
impl PreHook for Tap {
    async fn before(&self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
        self.trace.push(format!("pre:{}", self.label));
        Ok(())
    }
}

#[async_trait]
impl PostHook for Tap {
    async fn after(&self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
        self.trace.push(format!("post:{}", self.label));
        Ok(())
    }
}

#[async_trait]
impl ErrorHook for Tap {
    async fn on_error(&self, _ctx: &ExecutionContext, error: &HttpError) -> Result<(), BoxError> {
        self.trace.push(format!("error:{}:{}", self.label, error.status().as_u16()));
        Ok(())
    }
}

/// Handler that records its label and answers with it as text.
pub struct Labelled {
    pub label: &'static str,
    pub trace: Trace,
}

impl Labelled {
    pub fn new(label: &'static str, trace: &Trace) -> Self {
        Self {
            label,
            trace: trace.clone(),
        }
    }
}

#[async_trait]
impl Handler for Labelled {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        self.trace.push(format!("handler:{}", self.label));
        ctx.with_response(|res| {
            res.text(self.label);
        });
        Ok(())
    }
}

/// Build a router for `app` with default configuration.
pub fn router(app: App) -> Router {
    HttpServer::new(ServerConfig::default(), app).router()
}

/// Drive one request through `router` in-process.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

pub fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

pub fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

/// A server listening on an ephemeral local port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) -> Result<(), ServerError> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
    }
}

/// Start `app` on 127.0.0.1 with an OS-assigned port.
pub async fn start_server(mut config: ServerConfig, app: App) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config, app);
    let handle = tokio::spawn(async move { server.run(listener, receiver).await });

    RunningServer {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
