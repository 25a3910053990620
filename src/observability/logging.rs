//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Report the ambient request's identity to code that has no context handle
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured filter

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::context::Kernel;

/// Error raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter `{filter}`: {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("global subscriber already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber described by `config`.
pub fn init(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.log_filter)?,
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

fn parse_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|source| LoggingError::Filter {
        filter: directives.to_string(),
        source,
    })
}

/// Identity of the request being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFields {
    pub request_id: String,
    pub method: String,
    pub path: String,
}

/// Fields of the ambient request, or `None` outside any request.
pub fn request_fields() -> Option<RequestFields> {
    Kernel::current().map(|ctx| RequestFields {
        request_id: ctx.id().to_string(),
        method: ctx.request().method().to_string(),
        path: ctx.request().path().to_string(),
    })
}
