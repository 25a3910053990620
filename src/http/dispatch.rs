//! Request dispatch loop.
//!
//! # Data Flow
//! ```text
//! Request + peer
//!     → ExecutionContext (made ambient via Kernel, inside a "request" span)
//!     → EndpointRegistry::resolve ──404──┐
//!     → pre-hooks → handler → post-hooks ─fail─┐
//!     → finalize → transport             │     │
//!                                        ▼     ▼
//!                          reset response to HttpError
//!                          → error-hooks → finalize → transport
//! ```
//!
//! # Design Decisions
//! - The dispatcher is the only place failures are caught
//! - Untyped failures become a generic 500; the cause is kept for logs only
//! - Error hooks see a response already reset to the error, and may rewrite it
//! - An error-hook failure is not recovered; the transport answers a bare 500
//! - Finalization reads a snapshot, so headers and cookies set before a
//!   serialization failure are still on the error response

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use thiserror::Error;
use tracing::Instrument;

use crate::context::{ExecutionContext, Kernel};
use crate::hooks::{advance, HookRegistry, HookSet, LifecycleState, TransitionError};
use crate::http::error::{BoxError, HttpError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::routing::{EndpointRegistry, RouteEntry};

/// Normalized pattern of the route that served the request.
///
/// Inserted into the context as soon as resolution succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute(pub String);

/// Failure the dispatcher could not turn into a response.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("error hook failed while handling `{trigger}`: {source}")]
    ErrorHook {
        trigger: HttpError,
        #[source]
        source: BoxError,
    },

    #[error("error response could not be serialized: {0}")]
    Finalize(#[source] HttpError),

    #[error(transparent)]
    Lifecycle(#[from] TransitionError),
}

/// Runs requests through routing, hooks and handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    endpoints: Arc<EndpointRegistry>,
    hooks: Arc<HookRegistry>,
}

impl Dispatcher {
    pub fn new(endpoints: EndpointRegistry, hooks: HookRegistry) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            hooks: Arc::new(hooks),
        }
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    /// Handle one request end to end.
    pub async fn dispatch(
        &self,
        request: Request,
        peer: Option<SocketAddr>,
    ) -> Result<axum::http::Response<Bytes>, DispatchError> {
        let ctx = Arc::new(ExecutionContext::new(request, peer));
        let span = tracing::info_span!(
            "request",
            request_id = %ctx.id(),
            method = %ctx.request().method(),
            path = %ctx.request().path(),
        );

        Kernel::run(Arc::clone(&ctx), self.handle(&ctx).instrument(span)).await
    }

    async fn handle(&self, ctx: &ExecutionContext) -> Result<axum::http::Response<Bytes>, DispatchError> {
        let route = match self.endpoints.resolve(ctx.request().method(), ctx.request().path()) {
            Ok(route) => route,
            Err(not_found) => {
                return self.fail(ctx, HookSet::global_only(&self.hooks), not_found).await;
            }
        };

        ctx.set_path_vars(route.path_vars);
        ctx.insert(MatchedRoute(route.entry.pattern().as_str().to_string()));
        let hooks = HookSet::new(&self.hooks, Some(route.entry.hooks()));

        match self.run_endpoint(ctx, &hooks, route.entry).await {
            Ok(response) => {
                advance(ctx, LifecycleState::Done)?;
                Ok(response)
            }
            Err(error) => self.fail(ctx, hooks, error).await,
        }
    }

    /// Steps 5 to 8: pre-hooks, handler, post-hooks, finalize.
    async fn run_endpoint(
        &self,
        ctx: &ExecutionContext,
        hooks: &HookSet<'_>,
        entry: &RouteEntry,
    ) -> Result<axum::http::Response<Bytes>, HttpError> {
        hooks.run_pre_hooks(ctx).await.map_err(HttpError::from_boxed)?;

        step(ctx, LifecycleState::Execute)?;
        entry
            .handler()
            .execute(ctx)
            .await
            .map_err(HttpError::from_boxed)?;

        step(ctx, LifecycleState::Post)?;
        hooks.run_post_hooks(ctx).await.map_err(HttpError::from_boxed)?;

        ctx.response_snapshot().finalize()
    }

    /// Step 9: reset the response to `error`, run error hooks, finalize.
    async fn fail(
        &self,
        ctx: &ExecutionContext,
        hooks: HookSet<'_>,
        error: HttpError,
    ) -> Result<axum::http::Response<Bytes>, DispatchError> {
        advance(ctx, LifecycleState::Error)?;
        tracing::debug!(
            status = error.status().as_u16(),
            error = %error,
            "Request failed, running error hooks"
        );

        ctx.with_response(|res| res.reset_to_error(&error));
        if let Err(source) = hooks.run_error_hooks(ctx, &error).await {
            return Err(DispatchError::ErrorHook {
                trigger: error,
                source,
            });
        }

        advance(ctx, LifecycleState::Done)?;
        match ctx.take_response().finalize() {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    cause = ?std::error::Error::source(&e),
                    "Error response could not be serialized, dropping custom headers and cookies"
                );
                let mut bare = Response::new();
                bare.reset_to_error(&error);
                bare.finalize().map_err(DispatchError::Finalize)
            }
        }
    }
}

fn step(ctx: &ExecutionContext, next: LifecycleState) -> Result<(), HttpError> {
    advance(ctx, next).map_err(|e| HttpError::internal().with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{EndpointHooks, ErrorHook, PostHook, PreHook};
    use crate::routing::Handler;
    use async_trait::async_trait;
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn push(log: &Log, entry: impl Into<String>) {
        log.lock().unwrap().push(entry.into());
    }

    struct Boom(Log);

    #[async_trait]
    impl PreHook for Boom {
        async fn before(&self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
            push(&self.0, "pre:boom");
            Err("boom".into())
        }
    }

    struct Recorder(Log);

    #[async_trait]
    impl PostHook for Recorder {
        async fn after(&self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
            push(&self.0, "post");
            Ok(())
        }
    }

    #[async_trait]
    impl ErrorHook for Recorder {
        async fn on_error(&self, ctx: &ExecutionContext, error: &HttpError) -> Result<(), BoxError> {
            assert_eq!(ctx.state(), LifecycleState::Error);
            push(&self.0, format!("error:{}", error.status().as_u16()));
            Ok(())
        }
    }

    struct Echo(Log);

    #[async_trait]
    impl Handler for Echo {
        async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
            push(&self.0, "handler");
            let id = ctx.path_var("id").unwrap_or_default().to_string();
            ctx.with_response(|res| res.json(&json!({ "id": id })).map(|_| ()))?;
            Ok(())
        }
    }

    struct Conflict;

    #[async_trait]
    impl Handler for Conflict {
        async fn execute(&self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
            Err(HttpError::conflict("already exists")
                .with_data(json!({ "field": "email" }))
                .into())
        }
    }

    struct Exclusive(Log);

    #[async_trait]
    impl Handler for Exclusive {
        async fn execute(&self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
            push(&self.0, "handler");
            Ok(())
        }

        fn hooks(&self) -> EndpointHooks {
            EndpointHooks::new().exclude::<Boom>()
        }
    }

    struct FailingPost(Log);

    #[async_trait]
    impl PostHook for FailingPost {
        async fn after(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
            assert_eq!(ctx.state(), LifecycleState::Post);
            push(&self.0, "post:fail");
            Err("post hook broke".into())
        }
    }

    struct Leaky;

    #[async_trait]
    impl Handler for Leaky {
        async fn execute(&self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
            Err("db password leaked".into())
        }
    }

    /// Sets a header, then a response detail that cannot be serialized.
    struct Unserializable {
        bad_cookie: bool,
    }

    #[async_trait]
    impl Handler for Unserializable {
        async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
            let bad_cookie = self.bad_cookie;
            ctx.with_response(|res| {
                res.set_header(
                    axum::http::HeaderName::from_static("x-trace"),
                    axum::http::HeaderValue::from_static("t1"),
                )
                .add_cookie(crate::http::Cookie::new("keep", "1"))
                .text("partial");
                if bad_cookie {
                    res.add_cookie(crate::http::Cookie::new("session", "a; Domain=evil.example"));
                } else {
                    res.set_content_type("bad\nvalue");
                }
            });
            Ok(())
        }
    }

    struct FailingErrorHook;

    #[async_trait]
    impl ErrorHook for FailingErrorHook {
        async fn on_error(&self, _ctx: &ExecutionContext, _error: &HttpError) -> Result<(), BoxError> {
            Err("error hook broke".into())
        }
    }

    fn body_json(response: &axum::http::Response<Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn test_success_path() {
        let log: Log = Default::default();
        let mut endpoints = EndpointRegistry::new();
        endpoints
            .register(Method::GET, "/users/(?<id>[0-9]+)", Echo(log.clone()))
            .unwrap();
        let mut hooks = HookRegistry::new();
        hooks.post_and_error(Recorder(log.clone()));

        let dispatcher = Dispatcher::new(endpoints, hooks);
        let response = dispatcher
            .dispatch(Request::new(Method::GET, "/users/42"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(&response), json!({ "id": "42" }));
        assert_eq!(*log.lock().unwrap(), vec!["handler", "post"]);
    }

    #[tokio::test]
    async fn test_pre_hook_failure_runs_error_hooks_once() {
        let log: Log = Default::default();
        let mut endpoints = EndpointRegistry::new();
        endpoints.register(Method::GET, "/x", Echo(log.clone())).unwrap();
        let mut hooks = HookRegistry::new();
        hooks.pre(Boom(log.clone())).post_and_error(Recorder(log.clone()));

        let dispatcher = Dispatcher::new(endpoints, hooks);
        let response = dispatcher
            .dispatch(Request::new(Method::GET, "/x"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&response),
            json!({ "status": 500, "message": "Internal Server Error" })
        );
        assert_eq!(*log.lock().unwrap(), vec!["pre:boom", "error:500"]);
    }

    #[tokio::test]
    async fn test_post_hook_failure_runs_error_hooks_once() {
        let log: Log = Default::default();
        let mut endpoints = EndpointRegistry::new();
        endpoints.register(Method::GET, "/p", Echo(log.clone())).unwrap();
        let mut hooks = HookRegistry::new();
        hooks.post(FailingPost(log.clone())).post_and_error(Recorder(log.clone()));

        let dispatcher = Dispatcher::new(endpoints, hooks);
        let response = dispatcher
            .dispatch(Request::new(Method::GET, "/p"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&response),
            json!({ "status": 500, "message": "Internal Server Error" })
        );
        // The second post-hook never runs; the error hook runs exactly once.
        assert_eq!(*log.lock().unwrap(), vec!["handler", "post:fail", "error:500"]);
    }

    #[tokio::test]
    async fn test_untyped_handler_error_is_hidden() {
        let mut endpoints = EndpointRegistry::new();
        endpoints.register(Method::GET, "/leak", Leaky).unwrap();

        let dispatcher = Dispatcher::new(endpoints, HookRegistry::new());
        let response = dispatcher
            .dispatch(Request::new(Method::GET, "/leak"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&response),
            json!({ "status": 500, "message": "Internal Server Error" })
        );
        assert!(!String::from_utf8_lossy(response.body()).contains("leaked"));
    }

    #[tokio::test]
    async fn test_finalize_failure_keeps_headers_and_cookies() {
        let log: Log = Default::default();
        let mut endpoints = EndpointRegistry::new();
        endpoints
            .register(Method::GET, "/bad", Unserializable { bad_cookie: false })
            .unwrap();
        let mut hooks = HookRegistry::new();
        hooks.error(Recorder(log.clone()));

        let dispatcher = Dispatcher::new(endpoints, hooks);
        let response = dispatcher
            .dispatch(Request::new(Method::GET, "/bad"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-trace"], "t1");
        assert_eq!(response.headers()["set-cookie"], "keep=1");
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(*log.lock().unwrap(), vec!["error:500"]);
    }

    #[tokio::test]
    async fn test_invalid_cookie_falls_back_to_bare_error_response() {
        let log: Log = Default::default();
        let mut endpoints = EndpointRegistry::new();
        endpoints
            .register(Method::GET, "/bad", Unserializable { bad_cookie: true })
            .unwrap();
        let mut hooks = HookRegistry::new();
        hooks.error(Recorder(log.clone()));

        let dispatcher = Dispatcher::new(endpoints, hooks);
        let response = dispatcher
            .dispatch(Request::new(Method::GET, "/bad"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("set-cookie").is_none());
        assert!(response.headers().get("x-trace").is_none());
        assert_eq!(
            body_json(&response),
            json!({ "status": 500, "message": "Internal Server Error" })
        );
        assert_eq!(*log.lock().unwrap(), vec!["error:500"]);
    }

    #[tokio::test]
    async fn test_typed_error_passes_through() {
        let mut endpoints = EndpointRegistry::new();
        endpoints.register(Method::POST, "/users", Conflict).unwrap();

        let dispatcher = Dispatcher::new(endpoints, HookRegistry::new());
        let response = dispatcher
            .dispatch(Request::new(Method::POST, "/users"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(&response),
            json!({ "status": 409, "message": "already exists", "data": { "field": "email" } })
        );
    }

    #[tokio::test]
    async fn test_unmatched_request_runs_global_error_hooks() {
        let log: Log = Default::default();
        let mut hooks = HookRegistry::new();
        hooks.pre(Boom(log.clone())).post_and_error(Recorder(log.clone()));

        let dispatcher = Dispatcher::new(EndpointRegistry::new(), hooks);
        let response = dispatcher
            .dispatch(Request::new(Method::GET, "/nowhere"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(*log.lock().unwrap(), vec!["error:404"]);
    }

    #[tokio::test]
    async fn test_excluded_global_hook_is_skipped() {
        let log: Log = Default::default();
        let mut endpoints = EndpointRegistry::new();
        endpoints.register(Method::GET, "/open", Exclusive(log.clone())).unwrap();
        let mut hooks = HookRegistry::new();
        hooks.pre(Boom(log.clone()));

        let dispatcher = Dispatcher::new(endpoints, hooks);
        let response = dispatcher
            .dispatch(Request::new(Method::GET, "/open"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_error_hook_failure_is_fatal() {
        let mut hooks = HookRegistry::new();
        hooks.error(FailingErrorHook);

        let dispatcher = Dispatcher::new(EndpointRegistry::new(), hooks);
        let err = dispatcher
            .dispatch(Request::new(Method::GET, "/missing"), None)
            .await
            .unwrap_err();

        match err {
            DispatchError::ErrorHook { trigger, source } => {
                assert_eq!(trigger.status(), StatusCode::NOT_FOUND);
                assert_eq!(source.to_string(), "error hook broke");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_context_is_ambient_during_handler() {
        struct Ambient;

        #[async_trait]
        impl Handler for Ambient {
            async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
                let current = Kernel::current().ok_or("no ambient context")?;
                assert_eq!(current.id(), ctx.id());
                assert_eq!(
                    current.get::<MatchedRoute>(),
                    Some(MatchedRoute("^(?:/ambient)$".into()))
                );
                Ok(())
            }
        }

        let mut endpoints = EndpointRegistry::new();
        endpoints.register(Method::GET, "/ambient", Ambient).unwrap();
        let dispatcher = Dispatcher::new(endpoints, HookRegistry::new());

        let response = dispatcher
            .dispatch(Request::new(Method::GET, "/ambient"), None)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(Kernel::current().is_none());
    }
}
