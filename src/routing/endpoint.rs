//! Handler and endpoint contracts.

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::http::Method;

use crate::context::ExecutionContext;
use crate::hooks::EndpointHooks;
use crate::http::error::BoxError;

/// Application code invoked for a matched route.
///
/// The handler writes its result into the context's response and returns
/// `Ok(())`, or fails with any error. An [`HttpError`](crate::http::HttpError)
/// reaches the client unchanged; anything else becomes a 500.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError>;

    /// Hooks excluded for or local to this handler.
    fn hooks(&self) -> EndpointHooks {
        EndpointHooks::default()
    }
}

/// A handler that declares its own method and route pattern.
pub trait Endpoint: Handler {
    fn method(&self) -> Method;

    fn pattern(&self) -> &str;
}

type HandlerFactory = Box<dyn Fn() -> Arc<dyn Handler> + Send + Sync>;

/// Either a ready handler or a factory instantiated on first match.
pub enum HandlerSource {
    Instance(Arc<dyn Handler>),
    Factory {
        build: HandlerFactory,
        cell: OnceLock<Arc<dyn Handler>>,
    },
}

impl HandlerSource {
    pub fn instance<H: Handler>(handler: H) -> Self {
        HandlerSource::Instance(Arc::new(handler))
    }

    pub fn factory<H, F>(build: F) -> Self
    where
        H: Handler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        HandlerSource::Factory {
            build: Box::new(move || Arc::new(build()) as Arc<dyn Handler>),
            cell: OnceLock::new(),
        }
    }

    /// The handler, constructing and caching it on first call.
    pub fn get(&self) -> Arc<dyn Handler> {
        match self {
            HandlerSource::Instance(handler) => Arc::clone(handler),
            HandlerSource::Factory { build, cell } => Arc::clone(cell.get_or_init(|| build())),
        }
    }

    pub fn is_instantiated(&self) -> bool {
        match self {
            HandlerSource::Instance(_) => true,
            HandlerSource::Factory { cell, .. } => cell.get().is_some(),
        }
    }
}

impl fmt::Debug for HandlerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSource::Instance(_) => f.write_str("HandlerSource::Instance"),
            HandlerSource::Factory { .. } => f.write_str("HandlerSource::Factory"),
        }
    }
}
