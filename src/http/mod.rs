//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body buffering, layers)
//!     → request.rs (method, path, query, headers, request ID)
//!     → dispatch.rs (routing, hooks, handler, error handling)
//!     → response.rs (status, headers, cookies, body serialization)
//!     → Send to client
//! ```

pub mod cookie;
pub mod dispatch;
pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use cookie::{Cookie, CookieError, RequestCookies, SameSite};
pub use dispatch::{DispatchError, Dispatcher, MatchedRoute};
pub use error::{BoxError, HttpError};
pub use request::{Request, RequestId, X_REQUEST_ID};
pub use response::{Body, Response};
pub use server::{HttpServer, ServerError};
