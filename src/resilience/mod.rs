//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Fallible infrastructure operation (e.g. ensure a directory exists):
//!     → executor.rs (invoke, on failure wait and retry up to max_tries)
//!     → backoff.rs (compute the next delay: fixed, exponential, jittered)
//!     → last failure surfaced to the caller once tries are exhausted
//! ```
//!
//! # Design Decisions
//! - Only idempotent infrastructure checks are retried, never handlers
//! - Fixed interval by default; calculators are plain closures
//! - Delays are computed once per retry and never adjusted afterwards

pub mod backoff;
pub mod executor;

pub use backoff::DelayFn;
pub use executor::{Executor, Task};
