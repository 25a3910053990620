//! Application assembly.
//!
//! # Responsibilities
//! - Collect endpoints and global hooks before the server starts
//! - Install the built-in hooks selected by configuration
//!
//! # Design Decisions
//! - Plain owned builder; the server freezes it behind `Arc` on construction
//! - Built-in hooks are registered first so application hooks see their output

use axum::http::Method;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::hooks::builtin::{AccessLog, CookieParser, Cors};
use crate::hooks::HookRegistry;
use crate::http::error::BoxError;
use crate::routing::{Endpoint, EndpointRegistry, Handler, RouteError};

/// Error raised while assembling an application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid CORS configuration: {0}")]
    Cors(#[source] BoxError),
}

/// Endpoints plus global hooks.
#[derive(Debug, Default)]
pub struct App {
    endpoints: EndpointRegistry,
    hooks: HookRegistry,
}

impl App {
    /// An application with no endpoints and no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// An application carrying the built-in hooks enabled in `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self, AppError> {
        let mut app = Self::new();
        app.hooks.pre(CookieParser);
        if config.cors.enabled {
            let cors = Cors::new(&config.cors).map_err(AppError::Cors)?;
            app.hooks.pre_and_error(cors);
        }
        app.hooks.post_and_error(AccessLog);

        tracing::debug!(
            cors = config.cors.enabled,
            "Built-in hooks installed"
        );
        Ok(app)
    }

    pub fn route<H: Handler>(&mut self, method: Method, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.endpoints.register(method, pattern, handler)?;
        Ok(self)
    }

    pub fn route_factory<H, F>(&mut self, method: Method, pattern: &str, build: F) -> Result<&mut Self, RouteError>
    where
        H: Handler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.endpoints.register_factory(method, pattern, build)?;
        Ok(self)
    }

    pub fn endpoint<E: Endpoint>(&mut self, endpoint: E) -> Result<&mut Self, RouteError> {
        self.endpoints.register_endpoint(endpoint)?;
        Ok(self)
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    pub fn endpoints_mut(&mut self) -> &mut EndpointRegistry {
        &mut self.endpoints
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    pub fn into_parts(self) -> (EndpointRegistry, HookRegistry) {
        (self.endpoints, self.hooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorsConfig;
    use crate::hooks::Phase;

    #[test]
    fn test_builtins_follow_config() {
        let app = App::from_config(&ServerConfig::default()).unwrap();
        let lists = app.hooks().lists();
        assert_eq!(lists.count(Phase::Pre), 1);
        assert_eq!(lists.count(Phase::Post), 1);
        assert_eq!(lists.count(Phase::Error), 1);

        let config = ServerConfig {
            cors: CorsConfig {
                enabled: true,
                ..CorsConfig::default()
            },
            ..ServerConfig::default()
        };
        let app = App::from_config(&config).unwrap();
        assert_eq!(app.hooks().lists().count(Phase::Pre), 2);
        assert_eq!(app.hooks().lists().count(Phase::Error), 2);
    }

    #[test]
    fn test_bad_cors_header_rejected() {
        let config = ServerConfig {
            cors: CorsConfig {
                enabled: true,
                allow_origin: "bad\norigin".into(),
                ..CorsConfig::default()
            },
            ..ServerConfig::default()
        };
        assert!(matches!(App::from_config(&config), Err(AppError::Cors(_))));
    }
}
