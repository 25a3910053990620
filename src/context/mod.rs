//! Request context subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher receives Request
//!     → execution.rs (ExecutionContext: request + response + peer)
//!     → kernel.rs (Kernel::run makes it ambient for the request's extent)
//!     → hooks / handler / helpers call Kernel::current() or use the &ctx they got
//! ```
//!
//! # Design Decisions
//! - Exactly one context per in-flight request, never reused
//! - Ambient lookup is per task, never process-global
//! - "No context" is a normal result outside a request

pub mod execution;
pub mod kernel;

pub use execution::{ExecutionContext, PathVars};
pub use kernel::Kernel;
