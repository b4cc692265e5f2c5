//! The dispatch runtime: eligibility, customizations and call sites wired
//! together behind one entry point.

use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;

use crate::call_site::{CallSiteGuard, CallSiteId};
use crate::config::DispatchConfig;
use crate::eligibility::EligibilityState;
use crate::registry::MetaClassRegistry;
use crate::resolvers::{GenericDispatch, GenericDispatcher};
use crate::{methods, DispatchResult, Value};

/// Owns the per-call-site guards and the services they consult.
///
/// Call sites are created lazily on first dispatch and live as long as the
/// runtime.
pub struct FastPathRuntime {
    config: DispatchConfig,
    eligibility: Arc<EligibilityState>,
    registry: Arc<MetaClassRegistry>,
    dispatcher: GenericDispatcher,
    call_sites: DashMap<CallSiteId, Arc<CallSiteGuard>, FxBuildHasher>,
}

impl FastPathRuntime {
    /// A runtime with default configuration and its own eligibility state.
    pub fn new() -> Self {
        RuntimeBuilder::new().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// The process-wide runtime, bound to [`EligibilityState::global`] and
    /// configured from the environment on first use.
    pub fn global() -> &'static FastPathRuntime {
        static GLOBAL: OnceLock<FastPathRuntime> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            RuntimeBuilder::new()
                .config(DispatchConfig::from_env())
                .eligibility(EligibilityState::global())
                .build()
        })
    }

    /// Evaluate `receiver[argument]` at call site `site`.
    pub fn dispatch(&self, site: CallSiteId, receiver: &Value, argument: &Value) -> DispatchResult {
        if !self.config.fast_path {
            return self.dispatcher.invoke(
                receiver,
                methods::GET_AT,
                std::slice::from_ref(argument),
            );
        }
        self.call_site(site)
            .dispatch(&self.eligibility, receiver, argument, &self.dispatcher)
    }

    /// Generic dispatch of any method, bypassing call-site caching.
    pub fn invoke(&self, receiver: &Value, method: &str, args: &[Value]) -> DispatchResult {
        self.dispatcher.invoke(receiver, method, args)
    }

    /// The guard for `site`, created unbound if it does not exist yet.
    pub fn call_site(&self, site: CallSiteId) -> Arc<CallSiteGuard> {
        if let Some(guard) = self.call_sites.get(&site) {
            return Arc::clone(guard.value());
        }
        let guard = self
            .call_sites
            .entry(site)
            .or_insert_with(|| Arc::new(CallSiteGuard::new(site)));
        Arc::clone(guard.value())
    }

    pub fn call_site_count(&self) -> usize {
        self.call_sites.len()
    }

    pub fn registry(&self) -> &Arc<MetaClassRegistry> {
        &self.registry
    }

    pub fn eligibility(&self) -> &Arc<EligibilityState> {
        &self.eligibility
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }
}

impl Default for FastPathRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FastPathRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastPathRuntime")
            .field("config", &self.config)
            .field("eligibility", &self.eligibility)
            .field("dispatcher", &self.dispatcher)
            .field("call_sites", &self.call_sites.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`FastPathRuntime`].
///
/// Unset parts default to an enabled fast path and a fresh
/// [`EligibilityState`], which keeps tests isolated from the process-wide
/// state.
#[derive(Default)]
pub struct RuntimeBuilder {
    config: DispatchConfig,
    eligibility: Option<Arc<EligibilityState>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing eligibility state instead of creating one.
    ///
    /// Runtimes sharing a state see each other's customizations: a fast path
    /// stays off until every runtime has removed what disabled it.
    #[must_use]
    pub fn eligibility(mut self, eligibility: Arc<EligibilityState>) -> Self {
        self.eligibility = Some(eligibility);
        self
    }

    pub fn build(self) -> FastPathRuntime {
        let eligibility = self
            .eligibility
            .unwrap_or_else(|| Arc::new(EligibilityState::new()));
        let registry = Arc::new(MetaClassRegistry::new(Arc::clone(&eligibility)));
        let dispatcher = GenericDispatcher::new(&registry);
        tracing::debug!(fast_path = self.config.fast_path, "fast-path runtime built");
        FastPathRuntime {
            config: self.config,
            eligibility,
            registry,
            dispatcher,
            call_sites: DashMap::with_hasher(FxBuildHasher),
        }
    }
}

#[cfg(test)]
mod tests;
