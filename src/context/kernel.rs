//! Ambient context propagation.
//!
//! Makes the context of the request being handled reachable from anywhere in
//! that request's async call graph. Backed by a tokio task-local slot, so
//! requests interleaved on the same worker never see each other's context.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::context::execution::ExecutionContext;

tokio::task_local! {
    static CURRENT: Arc<ExecutionContext>;
}

/// Entry point to the ambient context.
pub struct Kernel;

impl Kernel {
    /// Run `future` with `context` as the ambient context.
    ///
    /// Whatever was ambient before (possibly nothing) is visible again once
    /// the future completes.
    pub async fn run<F: Future>(context: Arc<ExecutionContext>, future: F) -> F::Output {
        CURRENT.scope(context, future).await
    }

    /// The ambient context, or `None` outside any request.
    pub fn current() -> Option<Arc<ExecutionContext>> {
        CURRENT.try_with(Arc::clone).ok()
    }

    /// Spawn a task that inherits the caller's ambient context.
    pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match Self::current() {
            Some(context) => tokio::spawn(CURRENT.scope(context, future)),
            None => tokio::spawn(future),
        }
    }
}
