//! Process-wide fast-path eligibility.
//!
//! Tracks whether anything could have altered built-in dispatch behavior:
//! a custom resolution handle, a replaced integer or integer-array meta
//! class, or an active category. From those four primary flags three
//! derived booleans are computed, and call sites consult them on every
//! invocation.
//!
//! # Publication
//!
//! State is an immutable [`EligibilitySnapshot`] published through an
//! [`ArcSwap`]. A transition computes the next primary flags, derives the
//! rest, and swaps the whole snapshot in. Readers load the current pointer
//! and never observe primary flags without their derived fields.
//!
//! Derived fields are recomputed from the primary flags on every
//! transition, never patched in place: removing a resolution handle must
//! restore each family's eligibility from its own remembered flag, which is
//! only possible because the per-family flags are kept separately from the
//! derived results.
//!
//! # Shared holders
//!
//! Several registries may report into one state. Each customization is
//! therefore reference counted through [`EligibilityState::acquire`] and
//! [`EligibilityState::release`]: the disabling event is applied when the
//! first holder appears and the restoring event only when the last one is
//! gone, whichever registry it belonged to.

use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::FastPathFamily;

/// The four primary flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EligibilityFlags {
    /// No custom method-resolution handle is installed.
    pub handle_absent: bool,
    /// Integer scalar dispatch has not been redefined.
    pub int_scalar_unmodified: bool,
    /// Integer array dispatch has not been redefined.
    pub int_array_unmodified: bool,
    /// A category is active somewhere in the process.
    pub category_active: bool,
}

impl Default for EligibilityFlags {
    /// Process-start values: nothing installed, nothing modified.
    fn default() -> Self {
        Self {
            handle_absent: true,
            int_scalar_unmodified: true,
            int_array_unmodified: true,
            category_active: false,
        }
    }
}

/// A configuration event; the only way primary flags change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigEvent {
    /// A custom resolution handle was installed (`present`) or removed.
    InstallCustomHandle { present: bool },
    /// Integer scalar behavior was replaced, or restored if `still_original`.
    ModifyIntScalarMetaclass { still_original: bool },
    /// Integer array behavior was replaced, or restored if `still_original`.
    ModifyIntArrayMetaclass { still_original: bool },
    /// The process-wide category scope became active or inactive.
    SetCategoryActive { active: bool },
}

impl EligibilityFlags {
    /// Apply one event. Total over every flag combination.
    #[must_use]
    pub fn apply(self, event: ConfigEvent) -> Self {
        let mut next = self;
        match event {
            ConfigEvent::InstallCustomHandle { present } => next.handle_absent = !present,
            ConfigEvent::ModifyIntScalarMetaclass { still_original } => {
                next.int_scalar_unmodified = still_original;
            }
            ConfigEvent::ModifyIntArrayMetaclass { still_original } => {
                next.int_array_unmodified = still_original;
            }
            ConfigEvent::SetCategoryActive { active } => next.category_active = active,
        }
        next
    }
}

/// Immutable, fully derived eligibility state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EligibilitySnapshot {
    generation: u64,
    flags: EligibilityFlags,
    int_scalar_fast_path_eligible: bool,
    int_array_fast_path_eligible: bool,
    must_force_generic: bool,
}

impl EligibilitySnapshot {
    /// Derive a snapshot from primary flags.
    pub fn derive(generation: u64, flags: EligibilityFlags) -> Self {
        Self {
            generation,
            flags,
            int_scalar_fast_path_eligible: flags.handle_absent && flags.int_scalar_unmodified,
            int_array_fast_path_eligible: flags.handle_absent && flags.int_array_unmodified,
            must_force_generic: flags.category_active || !flags.handle_absent,
        }
    }

    /// Number of transitions applied before this snapshot was published.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn flags(&self) -> EligibilityFlags {
        self.flags
    }

    /// `handle_absent && int_scalar_unmodified`.
    pub fn int_scalar_fast_path_eligible(&self) -> bool {
        self.int_scalar_fast_path_eligible
    }

    /// `handle_absent && int_array_unmodified`.
    pub fn int_array_fast_path_eligible(&self) -> bool {
        self.int_array_fast_path_eligible
    }

    /// `category_active || !handle_absent`.
    pub fn must_force_generic(&self) -> bool {
        self.must_force_generic
    }

    /// Whether `family` may take its fast path right now.
    ///
    /// `must_force_generic` dominates the per-family result.
    #[inline]
    pub fn is_eligible(&self, family: FastPathFamily) -> bool {
        if self.must_force_generic {
            return false;
        }
        match family {
            FastPathFamily::IntScalar => self.int_scalar_fast_path_eligible,
            FastPathFamily::IntArray => self.int_array_fast_path_eligible,
        }
    }
}

impl Default for EligibilitySnapshot {
    fn default() -> Self {
        Self::derive(0, EligibilityFlags::default())
    }
}

/// Holder of the current [`EligibilitySnapshot`].
///
/// Transitions are expected to be rare and externally serialized by the
/// embedding runtime; concurrent transitions are still linearized by the
/// read-copy-update loop, so none is lost.
pub struct EligibilityState {
    current: ArcSwap<EligibilitySnapshot>,
    holders: Mutex<[usize; Customization::COUNT]>,
}

/// A runtime customization that turns some fast path off while held.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Customization {
    /// A custom resolution handle is installed.
    ResolutionHandle,
    /// Integer scalar behavior is overridden.
    IntScalarOverride,
    /// Integer array behavior is overridden.
    IntArrayOverride,
    /// A category is active.
    Category,
}

impl Customization {
    const COUNT: usize = 4;

    pub const ALL: [Customization; Self::COUNT] = [
        Customization::ResolutionHandle,
        Customization::IntScalarOverride,
        Customization::IntArrayOverride,
        Customization::Category,
    ];

    fn index(self) -> usize {
        match self {
            Customization::ResolutionHandle => 0,
            Customization::IntScalarOverride => 1,
            Customization::IntArrayOverride => 2,
            Customization::Category => 3,
        }
    }

    /// The event recording that this customization is (or is no longer) held.
    pub fn event(self, held: bool) -> ConfigEvent {
        match self {
            Customization::ResolutionHandle => ConfigEvent::InstallCustomHandle { present: held },
            Customization::IntScalarOverride => {
                ConfigEvent::ModifyIntScalarMetaclass { still_original: !held }
            }
            Customization::IntArrayOverride => {
                ConfigEvent::ModifyIntArrayMetaclass { still_original: !held }
            }
            Customization::Category => ConfigEvent::SetCategoryActive { active: held },
        }
    }
}

static GLOBAL_STATE: OnceLock<Arc<EligibilityState>> = OnceLock::new();

impl EligibilityState {
    /// Create a state with process-start flags.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(EligibilitySnapshot::default()),
            holders: Mutex::new([0; Customization::COUNT]),
        }
    }

    /// The process-wide state.
    pub fn global() -> Arc<EligibilityState> {
        Arc::clone(GLOBAL_STATE.get_or_init(|| Arc::new(EligibilityState::new())))
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<EligibilitySnapshot> {
        self.current.load_full()
    }

    /// Hot-path query: may `family` take its fast path right now?
    #[inline]
    pub fn is_eligible(&self, family: FastPathFamily) -> bool {
        self.current.load().is_eligible(family)
    }

    /// Apply a configuration event and publish the resulting snapshot.
    pub fn apply(&self, event: ConfigEvent) -> EligibilitySnapshot {
        let next = |current: &EligibilitySnapshot| {
            EligibilitySnapshot::derive(
                current.generation.wrapping_add(1),
                current.flags.apply(event),
            )
        };
        let replaced = self.current.rcu(|current| next(&**current));
        let published = next(&*replaced);
        tracing::debug!(
            ?event,
            generation = published.generation,
            int_scalar_eligible = published.int_scalar_fast_path_eligible,
            int_array_eligible = published.int_array_fast_path_eligible,
            must_force_generic = published.must_force_generic,
            "eligibility transition"
        );
        published
    }

    /// Register one more holder of `customization`.
    ///
    /// The disabling event is applied, before this returns, only for the
    /// first holder. Returns the snapshot it published, if any.
    pub fn acquire(&self, customization: Customization) -> Option<EligibilitySnapshot> {
        let mut holders = self.holders.lock();
        let count = &mut holders[customization.index()];
        *count = count.saturating_add(1);
        (*count == 1).then(|| self.apply(customization.event(true)))
    }

    /// Drop one holder of `customization`.
    ///
    /// The restoring event is applied only when no holder remains anywhere.
    /// Releasing something never acquired is ignored.
    pub fn release(&self, customization: Customization) -> Option<EligibilitySnapshot> {
        let mut holders = self.holders.lock();
        let count = &mut holders[customization.index()];
        if *count == 0 {
            tracing::debug!(?customization, "release without holder ignored");
            return None;
        }
        *count -= 1;
        (*count == 0).then(|| self.apply(customization.event(false)))
    }

    /// Number of live holders of `customization`.
    pub fn holders(&self, customization: Customization) -> usize {
        self.holders.lock()[customization.index()]
    }

    pub fn set_custom_handle(&self, present: bool) -> EligibilitySnapshot {
        self.apply(ConfigEvent::InstallCustomHandle { present })
    }

    pub fn set_int_scalar_original(&self, still_original: bool) -> EligibilitySnapshot {
        self.apply(ConfigEvent::ModifyIntScalarMetaclass { still_original })
    }

    pub fn set_int_array_original(&self, still_original: bool) -> EligibilitySnapshot {
        self.apply(ConfigEvent::ModifyIntArrayMetaclass { still_original })
    }

    pub fn set_category_active(&self, active: bool) -> EligibilitySnapshot {
        self.apply(ConfigEvent::SetCategoryActive { active })
    }
}

impl Default for EligibilityState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EligibilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EligibilityState")
            .field(&**self.current.load())
            .finish()
    }
}
