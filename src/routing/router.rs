//! Endpoint registry and route resolution.
//!
//! # Responsibilities
//! - Store route entries in registration order
//! - Resolve (method, path) to the first matching entry
//! - Return the named captures as path variables, or an explicit 404
//!
//! # Design Decisions
//! - Append-only at startup, then frozen behind `Arc` (read-only at runtime)
//! - O(n) scan; registries are small and built once
//! - First registered wins, so a catch-all can be registered last
//! - Duplicate (method, pattern) pairs are kept and logged

use std::sync::{Arc, OnceLock};

use axum::http::Method;

use crate::context::PathVars;
use crate::hooks::EndpointHooks;
use crate::http::error::HttpError;
use crate::routing::endpoint::{Endpoint, Handler, HandlerSource};
use crate::routing::matcher::{RouteError, RoutePattern};

/// One registered (method, pattern, handler) association.
#[derive(Debug)]
pub struct RouteEntry {
    method: Method,
    pattern: RoutePattern,
    handler: HandlerSource,
    hooks: OnceLock<EndpointHooks>,
}

impl RouteEntry {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn handler(&self) -> Arc<dyn Handler> {
        self.handler.get()
    }

    /// The handler's hook declarations, read once and cached.
    pub fn hooks(&self) -> &EndpointHooks {
        self.hooks.get_or_init(|| self.handler.get().hooks())
    }

    pub fn is_instantiated(&self) -> bool {
        self.handler.is_instantiated()
    }
}

/// Result of a successful resolution.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub path_vars: PathVars,
}

/// Registered endpoints.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    routes: Vec<RouteEntry>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `method` and `pattern`.
    pub fn register<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        self.push(method, pattern, HandlerSource::instance(handler))
    }

    /// Register a handler built on its first match.
    pub fn register_factory<H, F>(
        &mut self,
        method: Method,
        pattern: &str,
        build: F,
    ) -> Result<&mut Self, RouteError>
    where
        H: Handler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.push(method, pattern, HandlerSource::factory(build))
    }

    /// Register an endpoint under its declared method and pattern.
    pub fn register_endpoint<E: Endpoint>(&mut self, endpoint: E) -> Result<&mut Self, RouteError> {
        let method = endpoint.method();
        let pattern = endpoint.pattern().to_string();
        self.push(method, &pattern, HandlerSource::instance(endpoint))
    }

    fn push(
        &mut self,
        method: Method,
        pattern: &str,
        handler: HandlerSource,
    ) -> Result<&mut Self, RouteError> {
        let pattern = RoutePattern::new(pattern)?;

        if self
            .routes
            .iter()
            .any(|r| r.method == method && r.pattern.as_str() == pattern.as_str())
        {
            tracing::warn!(
                method = %method,
                pattern = %pattern.as_str(),
                "Duplicate route registered; the earlier entry shadows it"
            );
        }

        tracing::debug!(method = %method, pattern = %pattern.as_str(), "Route registered");
        self.routes.push(RouteEntry {
            method,
            pattern,
            handler,
            hooks: OnceLock::new(),
        });
        Ok(self)
    }

    /// Find the first entry matching `method` and the whole of `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, HttpError> {
        for entry in &self.routes {
            if entry.method != *method {
                continue;
            }
            if let Some(path_vars) = entry.pattern.captures(path) {
                tracing::debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %entry.pattern.as_str(),
                    path_vars = ?path_vars,
                    "Route matched"
                );
                return Ok(RouteMatch { entry, path_vars });
            }
        }

        tracing::debug!(method = %method, path = %path, "No route matched");
        Err(HttpError::not_found(format!("No route for {} {}", method, path)))
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::http::error::BoxError;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tagged(&'static str);

    #[async_trait]
    impl Handler for Tagged {
        async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
            ctx.with_response(|res| {
                res.text(self.0);
            });
            Ok(())
        }
    }

    struct Health;

    #[async_trait]
    impl Handler for Health {
        async fn execute(&self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
            Ok(())
        }
    }

    impl Endpoint for Health {
        fn method(&self) -> Method {
            Method::GET
        }

        fn pattern(&self) -> &str {
            "/health"
        }
    }

    fn entry_pattern(m: &RouteMatch<'_>) -> String {
        m.entry.pattern().as_str().to_string()
    }

    #[test]
    fn test_named_path_variable() {
        let mut registry = EndpointRegistry::new();
        registry
            .register(Method::GET, "/users/(?<id>[0-9]+)", Tagged("user"))
            .unwrap();

        let m = registry.resolve(&Method::GET, "/users/42").unwrap();
        assert_eq!(m.path_vars.get("id").map(String::as_str), Some("42"));

        let miss = registry.resolve(&Method::GET, "/users/42/extra").unwrap_err();
        assert_eq!(miss.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_first_registered_wins() {
        let mut registry = EndpointRegistry::new();
        registry
            .register(Method::GET, "/.*", Tagged("catch-all"))
            .unwrap()
            .register(Method::GET, "/home", Tagged("home"))
            .unwrap();

        let m = registry.resolve(&Method::GET, "/home").unwrap();
        assert_eq!(entry_pattern(&m), "^(?:/.*)$");
    }

    #[test]
    fn test_method_must_match() {
        let mut registry = EndpointRegistry::new();
        registry.register(Method::POST, "/items", Tagged("create")).unwrap();

        assert!(registry.resolve(&Method::GET, "/items").is_err());
        assert!(registry.resolve(&Method::POST, "/items").is_ok());
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let mut registry = EndpointRegistry::new();
        registry
            .register(Method::GET, "/dup", Tagged("first"))
            .unwrap()
            .register(Method::GET, "/dup", Tagged("second"))
            .unwrap();

        assert_eq!(registry.len(), 2);
        let m = registry.resolve(&Method::GET, "/dup").unwrap();
        assert!(std::ptr::eq(m.entry, &registry.routes()[0]));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut registry = EndpointRegistry::new();
        registry
            .register(Method::GET, "/a/(?<x>[a-z]+)", Tagged("a"))
            .unwrap()
            .register(Method::GET, "/b", Tagged("b"))
            .unwrap();

        let first = registry.resolve(&Method::GET, "/a/q").unwrap();
        let second = registry.resolve(&Method::GET, "/a/q").unwrap();
        assert!(std::ptr::eq(first.entry, second.entry));
        assert_eq!(first.path_vars, second.path_vars);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_factory_instantiated_on_first_match() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        let mut registry = EndpointRegistry::new();
        registry
            .register_factory(Method::GET, "/lazy", || {
                BUILT.fetch_add(1, Ordering::SeqCst);
                Tagged("lazy")
            })
            .unwrap();

        assert!(!registry.routes()[0].is_instantiated());
        let m = registry.resolve(&Method::GET, "/lazy").unwrap();
        let a = m.entry.handler();
        let b = m.entry.handler();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_endpoint_declares_route() {
        let mut registry = EndpointRegistry::new();
        registry.register_endpoint(Health).unwrap();
        assert!(registry.resolve(&Method::GET, "/health").is_ok());
        assert!(registry.resolve(&Method::GET, "/healthz").is_err());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut registry = EndpointRegistry::new();
        assert!(registry.register(Method::GET, "/(unclosed", Tagged("x")).is_err());
        assert!(registry.is_empty());
    }
}
