//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (scan entries in registration order)
//!     → matcher.rs (whole-path regex match, named captures)
//!     → Return: RouteMatch { entry, path_vars } or 404
//!
//! Registration (at startup):
//!     (method, pattern, handler | factory)
//!     → Normalize and compile pattern
//!     → Append to EndpointRegistry
//!     → Freeze behind Arc
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod endpoint;
pub mod matcher;
pub mod router;

pub use endpoint::{Endpoint, Handler, HandlerSource};
pub use matcher::{RouteError, RoutePattern};
pub use router::{EndpointRegistry, RouteEntry, RouteMatch};
