//! Built-in method resolver.
//!
//! Resolves methods on primitive receivers by checking against the method
//! table in `BUILTIN_METHODS`.

use rustc_hash::FxHashMap;

use super::{MethodResolution, MethodResolver};
use crate::methods::{BuiltinMethod, BUILTIN_METHODS};
use crate::{TypeKind, Value};

/// Resolver for built-in methods on primitive types.
///
/// Priority 3 (lowest): built-in methods are the fallback when no
/// customization handles the method.
#[derive(Clone)]
pub struct BuiltinMethodResolver {
    known_methods: FxHashMap<TypeKind, FxHashMap<&'static str, BuiltinMethod>>,
}

impl BuiltinMethodResolver {
    pub fn new() -> Self {
        let mut known_methods: FxHashMap<TypeKind, FxHashMap<&'static str, BuiltinMethod>> =
            FxHashMap::default();
        for &(kind, name, method) in BUILTIN_METHODS {
            known_methods.entry(kind).or_default().insert(name, method);
        }
        Self { known_methods }
    }
}

impl Default for BuiltinMethodResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodResolver for BuiltinMethodResolver {
    fn resolve(&self, _receiver: &Value, kind: TypeKind, method: &str) -> MethodResolution {
        self.known_methods
            .get(&kind)
            .and_then(|methods| methods.get(method))
            .map_or(MethodResolution::NotFound, |&builtin| {
                MethodResolution::Builtin(builtin)
            })
    }

    fn priority(&self) -> u8 {
        3
    }

    fn name(&self) -> &'static str {
        "BuiltinMethodResolver"
    }
}
