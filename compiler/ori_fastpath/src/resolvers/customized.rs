//! Resolvers over runtime customizations held by the meta-class registry.
//!
//! Each resolver reads the registry at resolution time, so customizations
//! made after the dispatcher was built are visible immediately.

use std::sync::Arc;

use super::{MethodResolution, MethodResolver};
use crate::registry::MetaClassRegistry;
use crate::{TypeKind, Value};

/// Resolver for the installed custom resolution handle.
///
/// Priority 0 (highest): a handle sees every call before anything else.
#[derive(Clone)]
pub struct HandleResolver {
    registry: Arc<MetaClassRegistry>,
}

impl HandleResolver {
    pub fn new(registry: Arc<MetaClassRegistry>) -> Self {
        Self { registry }
    }
}

impl MethodResolver for HandleResolver {
    fn resolve(&self, receiver: &Value, _kind: TypeKind, method: &str) -> MethodResolution {
        // Clone the handle to release the registry lock before calling out.
        let Some(handle) = self.registry.lookup_handle() else {
            return MethodResolution::NotFound;
        };
        handle
            .resolve(receiver, method)
            .map_or(MethodResolution::NotFound, MethodResolution::Native)
    }

    fn priority(&self) -> u8 {
        0
    }

    fn name(&self) -> &'static str {
        "HandleResolver"
    }
}

/// Resolver for methods of active categories.
///
/// Priority 1.
#[derive(Clone)]
pub struct CategoryResolver {
    registry: Arc<MetaClassRegistry>,
}

impl CategoryResolver {
    pub fn new(registry: Arc<MetaClassRegistry>) -> Self {
        Self { registry }
    }
}

impl MethodResolver for CategoryResolver {
    fn resolve(&self, _receiver: &Value, kind: TypeKind, method: &str) -> MethodResolution {
        self.registry
            .lookup_category(kind, method)
            .map_or(MethodResolution::NotFound, MethodResolution::Native)
    }

    fn priority(&self) -> u8 {
        1
    }

    fn name(&self) -> &'static str {
        "CategoryResolver"
    }
}

/// Resolver for per-type user overrides.
///
/// Priority 2.
#[derive(Clone)]
pub struct MetaClassResolver {
    registry: Arc<MetaClassRegistry>,
}

impl MetaClassResolver {
    pub fn new(registry: Arc<MetaClassRegistry>) -> Self {
        Self { registry }
    }
}

impl MethodResolver for MetaClassResolver {
    fn resolve(&self, _receiver: &Value, kind: TypeKind, method: &str) -> MethodResolution {
        self.registry
            .lookup_override(kind, method)
            .map_or(MethodResolution::NotFound, MethodResolution::Native)
    }

    fn priority(&self) -> u8 {
        2
    }

    fn name(&self) -> &'static str {
        "MetaClassResolver"
    }
}
