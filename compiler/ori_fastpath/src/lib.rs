//! Ori Fastpath - Guarded fast-path dispatch for built-in receivers.
//!
//! Array element access on built-in receivers is routed through a
//! per-call-site inline cache that can skip generic method resolution.
//! Skipping is only allowed while the runtime's customization features
//! (custom resolution handles, categories, replaced meta classes) leave the
//! built-in behavior observably intact.
//!
//! # Architecture
//!
//! - `EligibilityState`: process-wide snapshot of which fast-path families
//!   may run, republished on every configuration event
//! - `CallSiteGuard`: per-site state machine (unbound, specializing,
//!   permanently generic)
//! - `GenericDispatcher`: the authoritative chain of method resolvers
//! - `MetaClassRegistry` / `Category`: runtime customizations; the only
//!   producers of configuration events
//! - `FastPathRuntime`: wires the above together behind `dispatch`
//!
//! # Debugging
//!
//! Call [`init_tracing`] and run with `RUST_LOG=ori_fastpath=debug` to see
//! eligibility transitions and demotions, or `=trace` for binds and every
//! generic resolution. Set `ORI_NO_FASTPATH=1` to disable specialization.

mod array_access;
mod call_site;
mod category;
mod config;
mod eligibility;
pub mod errors;
pub mod methods;
mod registry;
mod resolvers;
mod runtime;
mod shape;
mod value;

pub use array_access::{get_at, length, resolve_index};
pub use call_site::{CallSiteCounts, CallSiteGuard, CallSiteId, GuardState};
pub use category::{Category, CategoryGuard};
pub use config::{DispatchConfig, NO_FASTPATH_ENV};
pub use eligibility::{
    ConfigEvent, Customization, EligibilityFlags, EligibilitySnapshot, EligibilityState,
};
pub use errors::{DispatchError, DispatchResult};
pub use methods::BuiltinMethod;
pub use registry::{native, MetaClassRegistry, MethodTable, NativeMethod, ResolutionHandle};
pub use resolvers::{
    BuiltinMethodResolver, CategoryResolver, GenericDispatch, GenericDispatcher, HandleResolver,
    MetaClassResolver, MethodResolution, MethodResolver, MethodResolverKind,
};
pub use runtime::{FastPathRuntime, RuntimeBuilder};
pub use shape::{FastPathFamily, ShapePair, ShapeTag};
pub use value::{TypeKind, Value};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
