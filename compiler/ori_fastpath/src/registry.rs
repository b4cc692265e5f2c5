//! Per-type behavior overrides, the custom resolution handle and the active
//! category set.
//!
//! Everything that can change how a built-in receiver is dispatched goes
//! through [`MetaClassRegistry`], and registries in turn are the only code
//! that emits configuration events. Events that disable a fast path are
//! published *before* the new behavior becomes visible to resolvers; events
//! that re-enable one are published *after* the last holder is gone. A call
//! site can therefore never take the fast path while an override for its
//! family is resolvable.
//!
//! All tables live behind one lock so that event order matches the order in
//! which the tables changed. Registries never apply events directly: they
//! acquire and release [`Customization`] holds on the eligibility state, so
//! several registries can share one state without clearing each other's
//! flags.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::category::{Category, CategoryGuard};
use crate::eligibility::{Customization, EligibilityState};
use crate::{DispatchResult, TypeKind, Value};

/// A method body supplied at runtime (override, category or handle method).
pub type NativeMethod = Arc<dyn Fn(&Value, &[Value]) -> DispatchResult + Send + Sync>;

/// Wrap a closure as a [`NativeMethod`].
pub fn native<F>(f: F) -> NativeMethod
where
    F: Fn(&Value, &[Value]) -> DispatchResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Custom method-resolution handle.
///
/// While installed, the handle is consulted before any other resolver and
/// every fast path is disabled, whatever the handle actually returns.
pub trait ResolutionHandle: Send + Sync {
    /// Resolve `method` on `receiver`, or `None` to continue down the chain.
    fn resolve(&self, receiver: &Value, method: &str) -> Option<NativeMethod>;

    /// Name for logging.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Methods keyed by receiver kind, then by name.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: FxHashMap<TypeKind, FxHashMap<String, NativeMethod>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a method, returning the previous body if any.
    pub fn insert(
        &mut self,
        kind: TypeKind,
        method: impl Into<String>,
        body: NativeMethod,
    ) -> Option<NativeMethod> {
        self.methods
            .entry(kind)
            .or_default()
            .insert(method.into(), body)
    }

    pub fn remove(&mut self, kind: TypeKind, method: &str) -> Option<NativeMethod> {
        let per_kind = self.methods.get_mut(&kind)?;
        let removed = per_kind.remove(method);
        if per_kind.is_empty() {
            self.methods.remove(&kind);
        }
        removed
    }

    /// Remove every method for `kind`, returning how many there were.
    pub fn clear_kind(&mut self, kind: TypeKind) -> usize {
        self.methods.remove(&kind).map_or(0, |m| m.len())
    }

    pub fn lookup(&self, kind: TypeKind, method: &str) -> Option<&NativeMethod> {
        self.methods.get(&kind)?.get(method)
    }

    pub fn has_kind(&self, kind: TypeKind) -> bool {
        self.methods.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.methods.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<String> = self
            .methods
            .iter()
            .flat_map(|(kind, methods)| methods.keys().map(move |m| format!("{kind}.{m}")))
            .collect();
        entries.sort();
        f.debug_set().entries(entries).finish()
    }
}

/// The customization an override of `kind` counts as, for kinds that have
/// a fast-path family.
fn override_customization(kind: TypeKind) -> Option<Customization> {
    match kind {
        TypeKind::Int => Some(Customization::IntScalarOverride),
        TypeKind::IntArray => Some(Customization::IntArrayOverride),
        _ => None,
    }
}

struct ActiveCategory {
    id: u64,
    category: Arc<Category>,
}

#[derive(Default)]
struct RegistryTables {
    overrides: MethodTable,
    handle: Option<Arc<dyn ResolutionHandle>>,
    /// Activation order; lookups walk it newest first.
    categories: SmallVec<[ActiveCategory; 4]>,
}

/// Registry of runtime dispatch customizations.
pub struct MetaClassRegistry {
    eligibility: Arc<EligibilityState>,
    tables: RwLock<RegistryTables>,
    next_category_id: AtomicU64,
}

impl MetaClassRegistry {
    /// Create an empty registry reporting into `eligibility`, which other
    /// registries may share.
    pub fn new(eligibility: Arc<EligibilityState>) -> Self {
        Self {
            eligibility,
            tables: RwLock::new(RegistryTables::default()),
            next_category_id: AtomicU64::new(0),
        }
    }

    pub fn eligibility(&self) -> &Arc<EligibilityState> {
        &self.eligibility
    }

    // Overrides

    /// Replace `kind.method` for every receiver of `kind`.
    pub fn register_override(&self, kind: TypeKind, method: impl Into<String>, body: NativeMethod) {
        let method = method.into();
        let mut tables = self.tables.write();
        if !tables.overrides.has_kind(kind) {
            if let Some(customization) = override_customization(kind) {
                self.eligibility.acquire(customization);
            }
        }
        tracing::debug!(%kind, %method, "registered override");
        tables.overrides.insert(kind, method, body);
    }

    /// Remove one override. Returns whether it existed.
    pub fn remove_override(&self, kind: TypeKind, method: &str) -> bool {
        let mut tables = self.tables.write();
        let removed = tables.overrides.remove(kind, method).is_some();
        if removed {
            tracing::debug!(%kind, %method, "removed override");
            self.restore_if_original(&tables, kind);
        }
        removed
    }

    /// Remove every override for `kind`, returning how many were removed.
    pub fn clear_overrides(&self, kind: TypeKind) -> usize {
        let mut tables = self.tables.write();
        let removed = tables.overrides.clear_kind(kind);
        if removed > 0 {
            tracing::debug!(%kind, removed, "cleared overrides");
            self.restore_if_original(&tables, kind);
        }
        removed
    }

    fn restore_if_original(&self, tables: &RegistryTables, kind: TypeKind) {
        if tables.overrides.has_kind(kind) {
            return;
        }
        if let Some(customization) = override_customization(kind) {
            self.eligibility.release(customization);
        }
    }

    pub fn has_overrides(&self, kind: TypeKind) -> bool {
        self.tables.read().overrides.has_kind(kind)
    }

    pub(crate) fn lookup_override(&self, kind: TypeKind, method: &str) -> Option<NativeMethod> {
        self.tables.read().overrides.lookup(kind, method).cloned()
    }

    // Resolution handle

    /// Install a custom resolution handle, replacing any previous one.
    pub fn install_handle(&self, handle: Arc<dyn ResolutionHandle>) {
        let mut tables = self.tables.write();
        if tables.handle.is_none() {
            self.eligibility.acquire(Customization::ResolutionHandle);
        }
        tracing::debug!(handle = handle.name(), "installed resolution handle");
        tables.handle = Some(handle);
    }

    /// Remove the installed handle, if any, and return it.
    pub fn remove_handle(&self) -> Option<Arc<dyn ResolutionHandle>> {
        let mut tables = self.tables.write();
        let removed = tables.handle.take();
        if let Some(handle) = &removed {
            tracing::debug!(handle = handle.name(), "removed resolution handle");
            self.eligibility.release(Customization::ResolutionHandle);
        }
        removed
    }

    pub fn has_handle(&self) -> bool {
        self.tables.read().handle.is_some()
    }

    pub(crate) fn lookup_handle(&self) -> Option<Arc<dyn ResolutionHandle>> {
        self.tables.read().handle.clone()
    }

    // Categories

    /// Activate `category` until the returned guard is dropped.
    ///
    /// Categories are process-wide: while any is active, every call site in
    /// the process dispatches generically.
    pub fn use_category(&self, category: Arc<Category>) -> CategoryGuard<'_> {
        let id = self.next_category_id.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.write();
        if tables.categories.is_empty() {
            self.eligibility.acquire(Customization::Category);
        }
        tracing::debug!(category = category.name(), id, "category activated");
        tables.categories.push(ActiveCategory { id, category });
        CategoryGuard::new(self, id)
    }

    /// Run `f` with `category` active.
    pub fn with_category<R>(&self, category: Arc<Category>, f: impl FnOnce() -> R) -> R {
        let _guard = self.use_category(category);
        f()
    }

    pub(crate) fn deactivate_category(&self, id: u64) {
        let mut tables = self.tables.write();
        let Some(pos) = tables.categories.iter().position(|active| active.id == id) else {
            return;
        };
        let active = tables.categories.remove(pos);
        tracing::debug!(category = active.category.name(), id, "category deactivated");
        if tables.categories.is_empty() {
            self.eligibility.release(Customization::Category);
        }
    }

    /// Number of currently active categories.
    pub fn active_categories(&self) -> usize {
        self.tables.read().categories.len()
    }

    pub(crate) fn lookup_category(&self, kind: TypeKind, method: &str) -> Option<NativeMethod> {
        let tables = self.tables.read();
        tables
            .categories
            .iter()
            .rev()
            .find_map(|active| active.category.lookup(kind, method).cloned())
    }
}

impl Drop for MetaClassRegistry {
    /// Give back every hold this registry still has, so a dropped runtime
    /// does not keep a shared state generic forever.
    fn drop(&mut self) {
        let tables = self.tables.get_mut();
        if tables.handle.is_some() {
            self.eligibility.release(Customization::ResolutionHandle);
        }
        if !tables.categories.is_empty() {
            self.eligibility.release(Customization::Category);
        }
        for kind in [TypeKind::Int, TypeKind::IntArray] {
            if tables.overrides.has_kind(kind) {
                if let Some(customization) = override_customization(kind) {
                    self.eligibility.release(customization);
                }
            }
        }
    }
}

impl fmt::Debug for MetaClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("MetaClassRegistry")
            .field("overrides", &tables.overrides)
            .field("handle", &tables.handle.as_ref().map(|h| h.name().to_string()))
            .field(
                "categories",
                &tables
                    .categories
                    .iter()
                    .map(|active| active.category.name())
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
