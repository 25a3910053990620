//! Embedded HTTP request-handling core.
//!
//! Endpoints are matched by method and regex pattern, wrapped in global and
//! per-endpoint hooks, and run with their request context reachable through
//! the [`Kernel`] anywhere in the request's async call graph.

pub mod app;
pub mod config;
pub mod context;
pub mod hooks;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use app::App;
pub use config::ServerConfig;
pub use context::{ExecutionContext, Kernel};
pub use http::{HttpError, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{Endpoint, Handler};
