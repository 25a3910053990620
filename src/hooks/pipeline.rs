//! Hook pipeline execution and request lifecycle.
//!
//! # Lifecycle
//! ```text
//! Pre ──ok──▶ Execute ──ok──▶ Post ──ok──▶ Done
//!  │            │              │
//!  └────────────┴──────────────┴──fail──▶ Error ──▶ Done
//! ```
//!
//! # Design Decisions
//! - Effective list = (global − excluded) ++ local, registration order kept
//! - Hooks run strictly one after another; the first failure stops the phase
//! - Hooks never catch each other's failures; the dispatcher does

use std::sync::Arc;

use thiserror::Error;

use crate::context::ExecutionContext;
use crate::hooks::hook::{ErrorHook, HookEntry, PostHook, PreHook};
use crate::hooks::set::{EndpointHooks, HookRegistry};
use crate::http::error::{BoxError, HttpError};

/// Stage of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Pre,
    Execute,
    Post,
    Error,
    Done,
}

impl LifecycleState {
    pub fn can_transition(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Pre, Execute)
                | (Execute, Post)
                | (Post, Done)
                | (Pre | Execute | Post, Error)
                | (Error, Done)
        )
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid lifecycle transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Move `ctx` to `next`, rejecting transitions the lifecycle does not allow.
pub fn advance(ctx: &ExecutionContext, next: LifecycleState) -> Result<(), TransitionError> {
    let from = ctx.state();
    if !from.can_transition(next) {
        return Err(TransitionError { from, to: next });
    }
    tracing::trace!(from = ?from, to = ?next, "Lifecycle transition");
    ctx.set_state(next);
    Ok(())
}

/// Hooks applicable to one endpoint invocation.
#[derive(Debug, Clone, Copy)]
pub struct HookSet<'a> {
    global: &'a HookRegistry,
    local: Option<&'a EndpointHooks>,
}

impl<'a> HookSet<'a> {
    pub fn new(global: &'a HookRegistry, local: Option<&'a EndpointHooks>) -> Self {
        Self { global, local }
    }

    /// Hook set used when no endpoint was resolved.
    pub fn global_only(global: &'a HookRegistry) -> Self {
        Self::new(global, None)
    }

    fn effective<H: ?Sized>(
        &self,
        global: &'a [HookEntry<H>],
        local: impl Fn(&'a EndpointHooks) -> &'a [HookEntry<H>],
    ) -> Vec<&'a HookEntry<H>> {
        let local_entries: &'a [HookEntry<H>] = self.local.map(local).unwrap_or(&[]);
        global
            .iter()
            .filter(|entry| !self.local.is_some_and(|l| l.is_excluded(entry.type_id())))
            .chain(local_entries)
            .collect()
    }

    pub fn pre_hooks(&self) -> Vec<&'a HookEntry<dyn PreHook>> {
        self.effective(self.global.lists().pre.as_slice(), |l| l.lists().pre.as_slice())
    }

    pub fn post_hooks(&self) -> Vec<&'a HookEntry<dyn PostHook>> {
        self.effective(self.global.lists().post.as_slice(), |l| l.lists().post.as_slice())
    }

    pub fn error_hooks(&self) -> Vec<&'a HookEntry<dyn ErrorHook>> {
        self.effective(self.global.lists().error.as_slice(), |l| l.lists().error.as_slice())
    }

    /// Run the effective pre-hooks in order; stop at the first failure.
    pub async fn run_pre_hooks(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        for entry in self.pre_hooks() {
            tracing::trace!(hook = entry.name(), "Running pre-hook");
            let hook: Arc<dyn PreHook> = entry.resolve();
            hook.before(ctx).await?;
        }
        Ok(())
    }

    /// Run the effective post-hooks in order; stop at the first failure.
    pub async fn run_post_hooks(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        for entry in self.post_hooks() {
            tracing::trace!(hook = entry.name(), "Running post-hook");
            let hook: Arc<dyn PostHook> = entry.resolve();
            hook.after(ctx).await?;
        }
        Ok(())
    }

    /// Run the effective error-hooks in order. A failure here is fatal.
    pub async fn run_error_hooks(&self, ctx: &ExecutionContext, error: &HttpError) -> Result<(), BoxError> {
        for entry in self.error_hooks() {
            tracing::trace!(hook = entry.name(), "Running error-hook");
            let hook: Arc<dyn ErrorHook> = entry.resolve();
            hook.on_error(ctx, error).await?;
        }
        Ok(())
    }
}
