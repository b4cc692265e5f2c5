//! Generic method resolution.
//!
//! This module implements a Chain of Responsibility pattern for method
//! resolution. Generic dispatch is the authoritative path: the fast path
//! only ever shortcuts it, so whatever this chain answers is correct.
//!
//! # Resolution Order
//!
//! 1. The installed resolution handle via `HandleResolver` (priority 0)
//! 2. Methods of active categories, newest first, via `CategoryResolver` (priority 1)
//! 3. Per-type user overrides via `MetaClassResolver` (priority 2)
//! 4. Built-in methods via `BuiltinMethodResolver` (priority 3)

mod builtin;
mod customized;

pub use builtin::BuiltinMethodResolver;
pub use customized::{CategoryResolver, HandleResolver, MetaClassResolver};

use std::fmt;
use std::sync::Arc;

use crate::errors::no_such_method;
use crate::methods::BuiltinMethod;
use crate::registry::{MetaClassRegistry, NativeMethod};
use crate::{DispatchResult, TypeKind, Value};

/// The full method-resolution service call sites fall back to.
///
/// Implementations must be authoritative: the specialized path is only
/// correct because it agrees with them.
pub trait GenericDispatch: Send + Sync {
    fn invoke(&self, receiver: &Value, method: &str, args: &[Value]) -> DispatchResult;
}

/// Result of method resolution.
#[derive(Clone)]
pub enum MethodResolution {
    /// Runtime-supplied body (handle, category or override).
    Native(NativeMethod),
    /// Built-in implementation.
    Builtin(BuiltinMethod),
    /// Method not found by this resolver.
    NotFound,
}

impl fmt::Debug for MethodResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodResolution::Native(_) => f.write_str("Native(..)"),
            MethodResolution::Builtin(method) => f.debug_tuple("Builtin").field(method).finish(),
            MethodResolution::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Trait for method resolvers in the chain of responsibility.
pub trait MethodResolver {
    /// Try to resolve `method` on `receiver` (whose kind is `kind`).
    fn resolve(&self, receiver: &Value, kind: TypeKind, method: &str) -> MethodResolution;

    /// Get the priority of this resolver (lower = higher priority).
    fn priority(&self) -> u8;

    /// Get a human-readable name for this resolver (for tracing).
    fn name(&self) -> &'static str;
}

/// Enum-based resolver kind for the fixed set of method resolvers.
#[derive(Clone)]
pub enum MethodResolverKind {
    Handle(HandleResolver),
    Category(CategoryResolver),
    MetaClass(MetaClassResolver),
    Builtin(BuiltinMethodResolver),
}

impl MethodResolverKind {
    pub fn resolve(&self, receiver: &Value, kind: TypeKind, method: &str) -> MethodResolution {
        match self {
            Self::Handle(r) => r.resolve(receiver, kind, method),
            Self::Category(r) => r.resolve(receiver, kind, method),
            Self::MetaClass(r) => r.resolve(receiver, kind, method),
            Self::Builtin(r) => r.resolve(receiver, kind, method),
        }
    }

    pub fn priority(&self) -> u8 {
        match self {
            Self::Handle(r) => r.priority(),
            Self::Category(r) => r.priority(),
            Self::MetaClass(r) => r.priority(),
            Self::Builtin(r) => r.priority(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Handle(r) => r.name(),
            Self::Category(r) => r.name(),
            Self::MetaClass(r) => r.name(),
            Self::Builtin(r) => r.name(),
        }
    }
}

/// Method dispatcher that chains multiple resolvers.
///
/// Uses `Arc<Vec<...>>` internally so that cloning is O(1). The resolver
/// list is immutable after construction; resolvers that read mutable
/// registry state do so through the shared [`MetaClassRegistry`].
#[derive(Clone)]
pub struct GenericDispatcher {
    resolvers: Arc<Vec<MethodResolverKind>>,
}

impl GenericDispatcher {
    /// The standard chain over `registry`.
    pub fn new(registry: &Arc<MetaClassRegistry>) -> Self {
        Self::with_resolvers(vec![
            MethodResolverKind::Handle(HandleResolver::new(Arc::clone(registry))),
            MethodResolverKind::Category(CategoryResolver::new(Arc::clone(registry))),
            MethodResolverKind::MetaClass(MetaClassResolver::new(Arc::clone(registry))),
            MethodResolverKind::Builtin(BuiltinMethodResolver::new()),
        ])
    }

    /// Create a dispatcher with the given resolvers, sorted by priority.
    pub fn with_resolvers(mut resolvers: Vec<MethodResolverKind>) -> Self {
        resolvers.sort_by_key(MethodResolverKind::priority);
        Self {
            resolvers: Arc::new(resolvers),
        }
    }

    /// Returns the first successful resolution, or `NotFound`.
    pub fn resolve(&self, receiver: &Value, kind: TypeKind, method: &str) -> MethodResolution {
        for resolver in self.resolvers.iter() {
            let result = resolver.resolve(receiver, kind, method);
            if !matches!(result, MethodResolution::NotFound) {
                tracing::trace!(resolver = resolver.name(), %kind, method, "resolved");
                return result;
            }
        }
        MethodResolution::NotFound
    }
}

impl GenericDispatch for GenericDispatcher {
    #[tracing::instrument(level = "trace", skip(self, receiver, args), fields(kind = %receiver.kind()))]
    fn invoke(&self, receiver: &Value, method: &str, args: &[Value]) -> DispatchResult {
        let kind = receiver.kind();
        match self.resolve(receiver, kind, method) {
            MethodResolution::Native(body) => body(receiver, args),
            MethodResolution::Builtin(builtin) => builtin.call(receiver, args),
            MethodResolution::NotFound => Err(no_such_method(method, kind.name())),
        }
    }
}

impl fmt::Debug for GenericDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(MethodResolverKind::name))
            .finish()
    }
}
