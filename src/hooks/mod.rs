//! Hook pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     HookRegistry (global pre/post/error hooks)
//!     Endpoint::hooks() → EndpointHooks (excluded types + local hooks)
//!
//! Per request:
//!     HookSet::new(global, local)
//!     → effective list per phase = (global − excluded) ++ local
//!     → pipeline.rs runs pre → [handler] → post, or error on failure
//! ```
//!
//! # Design Decisions
//! - Cross-cutting concerns declared once, opted out per endpoint
//! - Hooks are instances or factories (built on first use, then cached)
//! - Error-hooks must not fail; if one does the request is lost

pub mod builtin;
pub mod hook;
pub mod pipeline;
pub mod set;

pub use hook::{ErrorHook, HookEntry, Phase, PostHook, PreHook};
pub use pipeline::{advance, HookSet, LifecycleState, TransitionError};
pub use set::{EndpointHooks, HookRegistry};
