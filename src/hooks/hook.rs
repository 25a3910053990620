//! Hook capabilities and hook entries.
//!
//! A hook is one of three capability shapes: run before the handler, after
//! it, or when the request fails. A single type may implement several.

use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::http::error::{BoxError, HttpError};

/// Runs before the handler. A failure skips the remaining pre-hooks and the handler.
#[async_trait]
pub trait PreHook: Send + Sync + 'static {
    async fn before(&self, ctx: &ExecutionContext) -> Result<(), BoxError>;
}

/// Runs after a successful handler. A failure counts as a handler failure.
#[async_trait]
pub trait PostHook: Send + Sync + 'static {
    async fn after(&self, ctx: &ExecutionContext) -> Result<(), BoxError>;
}

/// Runs when the request fails. Must not fail itself.
#[async_trait]
pub trait ErrorHook: Send + Sync + 'static {
    async fn on_error(&self, ctx: &ExecutionContext, error: &HttpError) -> Result<(), BoxError>;
}

/// Hook phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pre,
    Post,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pre => write!(f, "pre"),
            Phase::Post => write!(f, "post"),
            Phase::Error => write!(f, "error"),
        }
    }
}

type Factory<H> = Box<dyn Fn() -> Arc<H> + Send + Sync>;

enum HookSource<H: ?Sized> {
    Instance(Arc<H>),
    Factory {
        build: Factory<H>,
        cell: OnceLock<Arc<H>>,
    },
}

/// A registered hook: an instance, or a factory instantiated on first use.
pub struct HookEntry<H: ?Sized> {
    type_id: TypeId,
    type_name: &'static str,
    source: HookSource<H>,
}

impl<H: ?Sized> HookEntry<H> {
    /// Concrete type of the hook, used for exclusion.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.type_name
    }

    /// The hook instance, building and caching it on first call.
    pub fn resolve(&self) -> Arc<H> {
        match &self.source {
            HookSource::Instance(hook) => Arc::clone(hook),
            HookSource::Factory { build, cell } => Arc::clone(cell.get_or_init(|| build())),
        }
    }
}

impl<H: ?Sized> fmt::Debug for HookEntry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            HookSource::Instance(_) => "instance",
            HookSource::Factory { .. } => "factory",
        };
        f.debug_struct("HookEntry")
            .field("type", &self.type_name)
            .field("source", &kind)
            .finish()
    }
}

macro_rules! entry_constructors {
    ($capability:ident) => {
        impl HookEntry<dyn $capability> {
            pub fn instance<T: $capability>(hook: T) -> Self {
                Self::shared(Arc::new(hook))
            }

            /// Share one instance across phases (e.g. a pre- and error-hook).
            pub fn shared<T: $capability>(hook: Arc<T>) -> Self {
                Self {
                    type_id: TypeId::of::<T>(),
                    type_name: type_name::<T>(),
                    source: HookSource::Instance(hook as Arc<dyn $capability>),
                }
            }

            pub fn factory<T, F>(build: F) -> Self
            where
                T: $capability,
                F: Fn() -> T + Send + Sync + 'static,
            {
                Self {
                    type_id: TypeId::of::<T>(),
                    type_name: type_name::<T>(),
                    source: HookSource::Factory {
                        build: Box::new(move || Arc::new(build()) as Arc<dyn $capability>),
                        cell: OnceLock::new(),
                    },
                }
            }
        }
    };
}

entry_constructors!(PreHook);
entry_constructors!(PostHook);
entry_constructors!(ErrorHook);
