//! Categories: named bundles of methods active for a scope.
//!
//! A category adds or replaces methods on any receiver kind while it is
//! active. Activation is scoped by [`CategoryGuard`], which deactivates the
//! category when dropped, including during unwinding.
//!
//! # Usage
//!
//! ```text
//! let doubled = Arc::new(Category::new("Doubled").with_method(
//!     TypeKind::IntArray,
//!     methods::GET_AT,
//!     |recv, args| { ... },
//! ));
//!
//! // Guard form
//! {
//!     let _active = registry.use_category(Arc::clone(&doubled));
//!     runtime.dispatch(site, &array, &index)?;
//! } // deactivated here, even on panic
//!
//! // Closure form
//! registry.with_category(doubled, || runtime.dispatch(site, &array, &index))
//! ```

use std::fmt;

use crate::registry::{native, MetaClassRegistry, MethodTable, NativeMethod};
use crate::{DispatchResult, TypeKind, Value};

/// A named set of methods.
pub struct Category {
    name: String,
    methods: MethodTable,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: MethodTable::new(),
        }
    }

    /// Add a method to this category.
    #[must_use]
    pub fn with_method<F>(mut self, kind: TypeKind, method: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> DispatchResult + Send + Sync + 'static,
    {
        self.methods.insert(kind, method, native(body));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, kind: TypeKind, method: &str) -> Option<&NativeMethod> {
        self.methods.lookup(kind, method)
    }

    /// Number of methods in this category.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Category")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .finish()
    }
}

/// RAII guard keeping a category active.
///
/// Dropping the guard deactivates exactly the activation that created it;
/// guards may be dropped in any order.
#[must_use = "the category is deactivated as soon as the guard is dropped"]
pub struct CategoryGuard<'r> {
    registry: &'r MetaClassRegistry,
    id: u64,
}

impl<'r> CategoryGuard<'r> {
    pub(crate) fn new(registry: &'r MetaClassRegistry, id: u64) -> Self {
        Self { registry, id }
    }
}

impl Drop for CategoryGuard<'_> {
    fn drop(&mut self) {
        self.registry.deactivate_category(self.id);
    }
}

impl fmt::Debug for CategoryGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryGuard").field("id", &self.id).finish()
    }
}
