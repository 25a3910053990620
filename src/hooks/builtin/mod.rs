//! Built-in hooks.
//!
//! - `CookieParser` (pre): `Cookie` header → `RequestCookies` extension
//! - `Cors` (pre + error): CORS response headers, preflight answers
//! - `AccessLog` (post + error): completion log line and request metrics

pub mod access_log;
pub mod cookies;
pub mod cors;

pub use access_log::AccessLog;
pub use cookies::CookieParser;
pub use cors::Cors;
