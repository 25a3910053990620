//! Per-request execution context.
//!
//! # Responsibilities
//! - Bundle the request, its response and the originating peer
//! - Expose path variables, query and payload to hooks and handlers
//! - Carry typed per-request data between hooks and handlers
//!
//! # Design Decisions
//! - Created once per request by the dispatcher, shared via `Arc`
//! - The request is immutable; the response is guarded by a mutex and only
//!   reachable through closures so no guard is ever held across an await

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;

use axum::http::Extensions;

use crate::hooks::LifecycleState;
use crate::http::request::{Request, RequestId};
use crate::http::response::Response;

/// Named captures extracted from the matched route.
pub type PathVars = HashMap<String, String>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One request/response transaction.
#[derive(Debug)]
pub struct ExecutionContext {
    id: RequestId,
    request: Request,
    response: Mutex<Response>,
    peer: Option<SocketAddr>,
    path_vars: OnceLock<PathVars>,
    extensions: Mutex<Extensions>,
    state: Mutex<LifecycleState>,
    started: Instant,
}

impl ExecutionContext {
    pub fn new(request: Request, peer: Option<SocketAddr>) -> Self {
        Self {
            id: RequestId::from_headers(request.headers()),
            request,
            response: Mutex::new(Response::new()),
            peer,
            path_vars: OnceLock::new(),
            extensions: Mutex::new(Extensions::new()),
            state: Mutex::new(LifecycleState::Pre),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Record the captures of the matched route. Only the first call sticks.
    pub(crate) fn set_path_vars(&self, vars: PathVars) {
        let _ = self.path_vars.set(vars);
    }

    pub fn path_var(&self, name: &str) -> Option<&str> {
        self.path_vars
            .get()
            .and_then(|vars| vars.get(name))
            .map(String::as_str)
    }

    pub fn path_vars(&self) -> Option<&PathVars> {
        self.path_vars.get()
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.request.query(name)
    }

    /// Run `f` against the response.
    pub fn with_response<R>(&self, f: impl FnOnce(&mut Response) -> R) -> R {
        f(&mut lock(&self.response))
    }

    /// Copy of the response as it currently stands.
    pub fn response_snapshot(&self) -> Response {
        lock(&self.response).clone()
    }

    pub(crate) fn take_response(&self) -> Response {
        std::mem::take(&mut *lock(&self.response))
    }

    /// Store a typed value for later hooks or the handler.
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, value: T) -> Option<T> {
        lock(&self.extensions).insert(value)
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        lock(&self.extensions).get::<T>().cloned()
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    pub(crate) fn set_state(&self, state: LifecycleState) {
        *lock(&self.state) = state;
    }
}
