//! Per-call-site specialization guard.
//!
//! Each array-access expression owns a [`CallSiteGuard`], a monomorphic
//! inline cache:
//!
//! - The first eligible call binds the guard to the observed shape pair if
//!   that pair has a specialized implementation, and demotes it otherwise.
//! - Later calls with the bound shapes run the specialized path.
//! - Any call with different shapes demotes the guard permanently.
//!
//! Global eligibility is re-read on every call and never cached in the
//! guard: an ineligible call is delegated to generic dispatch without
//! touching the guard's state, so specialization pauses and resumes as
//! eligibility flips.
//!
//! # Concurrency
//!
//! The guard state is one `AtomicU8`. Binding is a compare-exchange from
//! `Unbound`, demotion an unconditional store of `PermanentlyGeneric`, and
//! no transition leaves `PermanentlyGeneric`. A thread that loses the bind
//! race re-decides against the winner's state. The specialized path itself
//! re-checks operand types, so it can never run against mismatched values.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::array_access::specialized_get_at;
use crate::eligibility::EligibilityState;
use crate::resolvers::GenericDispatch;
use crate::shape::{ShapePair, ShapeTag, UnsupportedShape};
use crate::{methods, DispatchResult, Value};

/// Identifier of a static call location.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteId(u32);

impl CallSiteId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CallSiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site#{}", self.0)
    }
}

/// Specialization state of a call site.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GuardState {
    /// No eligible call has been seen yet.
    Unbound,
    /// Bound to one shape pair; calls with exactly these shapes take the
    /// fast path.
    Specializing(ShapePair),
    /// Proven polymorphic or unsupported. Terminal.
    PermanentlyGeneric,
}

impl GuardState {
    const UNBOUND: u8 = 0;
    const GENERIC: u8 = 1;
    const BOUND_BASE: u8 = 2;

    fn encode(self) -> u8 {
        match self {
            GuardState::Unbound => Self::UNBOUND,
            GuardState::PermanentlyGeneric => Self::GENERIC,
            GuardState::Specializing(pair) => {
                Self::BOUND_BASE + pair.receiver.index() * 3 + pair.argument.index()
            }
        }
    }

    fn decode(bits: u8) -> Self {
        match bits {
            Self::UNBOUND => GuardState::Unbound,
            Self::GENERIC => GuardState::PermanentlyGeneric,
            bound => {
                let offset = usize::from(bound - Self::BOUND_BASE);
                match (ShapeTag::ALL.get(offset / 3), ShapeTag::ALL.get(offset % 3)) {
                    (Some(&receiver), Some(&argument)) => {
                        GuardState::Specializing(ShapePair::new(receiver, argument))
                    }
                    // Unreachable for bits produced by `encode`.
                    _ => GuardState::PermanentlyGeneric,
                }
            }
        }
    }
}

/// Counters for how a call site's calls were served.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CallSiteCounts {
    /// Calls answered by the specialized path.
    pub specialized: u64,
    /// Calls delegated to generic dispatch.
    pub generic: u64,
    /// 1 once the site has been demoted, 0 before.
    pub demotions: u64,
}

#[derive(Default)]
struct CallSiteStats {
    specialized: AtomicU64,
    generic: AtomicU64,
    demotions: AtomicU64,
}

impl CallSiteStats {
    fn snapshot(&self) -> CallSiteCounts {
        CallSiteCounts {
            specialized: self.specialized.load(Ordering::Relaxed),
            generic: self.generic.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
        }
    }
}

/// Cached binding for one call location.
pub struct CallSiteGuard {
    id: CallSiteId,
    state: AtomicU8,
    stats: CallSiteStats,
}

impl CallSiteGuard {
    pub fn new(id: CallSiteId) -> Self {
        Self {
            id,
            state: AtomicU8::new(GuardState::UNBOUND),
            stats: CallSiteStats::default(),
        }
    }

    pub fn id(&self) -> CallSiteId {
        self.id
    }

    pub fn state(&self) -> GuardState {
        GuardState::decode(self.state.load(Ordering::Acquire))
    }

    pub fn counts(&self) -> CallSiteCounts {
        self.stats.snapshot()
    }

    /// Dispatch `receiver[argument]` through this call site.
    pub fn dispatch(
        &self,
        eligibility: &EligibilityState,
        receiver: &Value,
        argument: &Value,
        generic: &dyn GenericDispatch,
    ) -> DispatchResult {
        let mut state = self.state();
        if state == GuardState::PermanentlyGeneric {
            return self.delegate(receiver, argument, generic);
        }

        let actual = ShapePair::of(receiver, argument);
        if let Some(family) = actual.receiver.family() {
            if !eligibility.is_eligible(family) {
                return self.delegate(receiver, argument, generic);
            }
        }

        loop {
            match state {
                GuardState::PermanentlyGeneric => {
                    return self.delegate(receiver, argument, generic);
                }
                GuardState::Unbound if !actual.is_specializable() => {
                    self.demote(actual, "unsupported shape");
                    return self.delegate(receiver, argument, generic);
                }
                GuardState::Unbound => {
                    match self.state.compare_exchange(
                        GuardState::UNBOUND,
                        GuardState::Specializing(actual).encode(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => {
                            tracing::trace!(site = %self.id, shapes = ?actual, "call site bound");
                            return self.specialized(actual, receiver, argument, generic);
                        }
                        Err(current) => state = GuardState::decode(current),
                    }
                }
                GuardState::Specializing(expected) if expected == actual => {
                    return self.specialized(actual, receiver, argument, generic);
                }
                GuardState::Specializing(_) => {
                    self.demote(actual, "shape mismatch");
                    return self.delegate(receiver, argument, generic);
                }
            }
        }
    }

    fn specialized(
        &self,
        actual: ShapePair,
        receiver: &Value,
        argument: &Value,
        generic: &dyn GenericDispatch,
    ) -> DispatchResult {
        match specialized_get_at(receiver, argument) {
            Ok(result) => {
                self.stats.specialized.fetch_add(1, Ordering::Relaxed);
                result
            }
            Err(UnsupportedShape) => {
                self.demote(actual, "unsupported shape");
                self.delegate(receiver, argument, generic)
            }
        }
    }

    fn delegate(
        &self,
        receiver: &Value,
        argument: &Value,
        generic: &dyn GenericDispatch,
    ) -> DispatchResult {
        self.stats.generic.fetch_add(1, Ordering::Relaxed);
        generic.invoke(receiver, methods::GET_AT, std::slice::from_ref(argument))
    }

    fn demote(&self, observed: ShapePair, reason: &'static str) {
        let previous = self.state.swap(GuardState::GENERIC, Ordering::AcqRel);
        if previous != GuardState::GENERIC {
            self.stats.demotions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                site = %self.id,
                previous = ?GuardState::decode(previous),
                ?observed,
                reason,
                "call site demoted to generic dispatch"
            );
        }
    }
}

impl fmt::Debug for CallSiteGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSiteGuard")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("counts", &self.counts())
            .finish()
    }
}
