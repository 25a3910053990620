//! Global and per-endpoint hook registration.
//!
//! # Responsibilities
//! - Hold global hooks per phase, in registration order
//! - Hold per-endpoint exclusions (by hook type) and local hooks
//!
//! # Design Decisions
//! - Built once at startup, then frozen behind `Arc` and passed to the dispatcher
//! - Exclusion is by concrete hook type and only filters global hooks

use std::any::{type_name, TypeId};
use std::sync::Arc;

use crate::hooks::hook::{ErrorHook, HookEntry, Phase, PostHook, PreHook};

/// Hook entries for each phase.
#[derive(Debug, Default)]
pub struct PhaseLists {
    pub(crate) pre: Vec<HookEntry<dyn PreHook>>,
    pub(crate) post: Vec<HookEntry<dyn PostHook>>,
    pub(crate) error: Vec<HookEntry<dyn ErrorHook>>,
}

impl PhaseLists {
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty() && self.error.is_empty()
    }

    pub fn count(&self, phase: Phase) -> usize {
        match phase {
            Phase::Pre => self.pre.len(),
            Phase::Post => self.post.len(),
            Phase::Error => self.error.len(),
        }
    }
}

/// Hooks applying to every endpoint unless excluded.
#[derive(Debug, Default)]
pub struct HookRegistry {
    lists: PhaseLists,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pre<T: PreHook>(&mut self, hook: T) -> &mut Self {
        self.add_pre(HookEntry::<dyn PreHook>::instance(hook))
    }

    pub fn pre_with<T: PreHook, F: Fn() -> T + Send + Sync + 'static>(&mut self, build: F) -> &mut Self {
        self.add_pre(HookEntry::<dyn PreHook>::factory(build))
    }

    pub fn post<T: PostHook>(&mut self, hook: T) -> &mut Self {
        self.add_post(HookEntry::<dyn PostHook>::instance(hook))
    }

    pub fn post_with<T: PostHook, F: Fn() -> T + Send + Sync + 'static>(&mut self, build: F) -> &mut Self {
        self.add_post(HookEntry::<dyn PostHook>::factory(build))
    }

    pub fn error<T: ErrorHook>(&mut self, hook: T) -> &mut Self {
        self.add_error(HookEntry::<dyn ErrorHook>::instance(hook))
    }

    pub fn error_with<T: ErrorHook, F: Fn() -> T + Send + Sync + 'static>(&mut self, build: F) -> &mut Self {
        self.add_error(HookEntry::<dyn ErrorHook>::factory(build))
    }

    /// One instance registered as both pre- and error-hook.
    pub fn pre_and_error<T: PreHook + ErrorHook>(&mut self, hook: T) -> &mut Self {
        let hook = Arc::new(hook);
        self.add_pre(HookEntry::<dyn PreHook>::shared(Arc::clone(&hook)));
        self.add_error(HookEntry::<dyn ErrorHook>::shared(hook))
    }

    /// One instance registered as both post- and error-hook.
    pub fn post_and_error<T: PostHook + ErrorHook>(&mut self, hook: T) -> &mut Self {
        let hook = Arc::new(hook);
        self.add_post(HookEntry::<dyn PostHook>::shared(Arc::clone(&hook)));
        self.add_error(HookEntry::<dyn ErrorHook>::shared(hook))
    }

    pub fn add_pre(&mut self, entry: HookEntry<dyn PreHook>) -> &mut Self {
        tracing::debug!(hook = entry.name(), phase = "pre", "Global hook registered");
        self.lists.pre.push(entry);
        self
    }

    pub fn add_post(&mut self, entry: HookEntry<dyn PostHook>) -> &mut Self {
        tracing::debug!(hook = entry.name(), phase = "post", "Global hook registered");
        self.lists.post.push(entry);
        self
    }

    pub fn add_error(&mut self, entry: HookEntry<dyn ErrorHook>) -> &mut Self {
        tracing::debug!(hook = entry.name(), phase = "error", "Global hook registered");
        self.lists.error.push(entry);
        self
    }

    pub fn lists(&self) -> &PhaseLists {
        &self.lists
    }
}

/// Hook declarations of one endpoint.
#[derive(Debug, Default)]
pub struct EndpointHooks {
    excluded: Vec<(TypeId, &'static str)>,
    lists: PhaseLists,
}

impl EndpointHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress the global hook of type `T` for this endpoint, in every phase.
    pub fn exclude<T: 'static>(mut self) -> Self {
        self.excluded.push((TypeId::of::<T>(), type_name::<T>()));
        self
    }

    pub fn pre<T: PreHook>(mut self, hook: T) -> Self {
        self.lists.pre.push(HookEntry::<dyn PreHook>::instance(hook));
        self
    }

    pub fn pre_with<T: PreHook, F: Fn() -> T + Send + Sync + 'static>(mut self, build: F) -> Self {
        self.lists.pre.push(HookEntry::<dyn PreHook>::factory(build));
        self
    }

    pub fn post<T: PostHook>(mut self, hook: T) -> Self {
        self.lists.post.push(HookEntry::<dyn PostHook>::instance(hook));
        self
    }

    pub fn post_with<T: PostHook, F: Fn() -> T + Send + Sync + 'static>(mut self, build: F) -> Self {
        self.lists.post.push(HookEntry::<dyn PostHook>::factory(build));
        self
    }

    pub fn error<T: ErrorHook>(mut self, hook: T) -> Self {
        self.lists.error.push(HookEntry::<dyn ErrorHook>::instance(hook));
        self
    }

    pub fn error_with<T: ErrorHook, F: Fn() -> T + Send + Sync + 'static>(mut self, build: F) -> Self {
        self.lists.error.push(HookEntry::<dyn ErrorHook>::factory(build));
        self
    }

    /// Share one instance between the pre and error phases.
    pub fn pre_and_error<T: PreHook + ErrorHook>(mut self, hook: T) -> Self {
        let hook = Arc::new(hook);
        self.lists.pre.push(HookEntry::<dyn PreHook>::shared(Arc::clone(&hook)));
        self.lists.error.push(HookEntry::<dyn ErrorHook>::shared(hook));
        self
    }

    pub fn is_excluded(&self, type_id: TypeId) -> bool {
        self.excluded.iter().any(|(id, _)| *id == type_id)
    }

    pub fn excluded_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.excluded.iter().map(|(_, name)| *name)
    }

    pub fn lists(&self) -> &PhaseLists {
        &self.lists
    }
}
