//! Runtime shapes relevant to specialization decisions.
//!
//! A shape is a coarse classification of a value: only the distinctions
//! that some fast path depends on are kept. Everything else collapses into
//! [`ShapeTag::Other`].

use crate::Value;

/// Shape of a single receiver or argument.
///
/// The same tag is used in both positions: an integer index argument has
/// shape [`ShapeTag::IntScalar`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeTag {
    IntArray,
    IntScalar,
    Other,
}

/// Built-in families whose dispatch can be replaced at runtime, each with
/// its own eligibility flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FastPathFamily {
    IntScalar,
    IntArray,
}

impl ShapeTag {
    /// All tags, in encoding order.
    pub(crate) const ALL: [ShapeTag; 3] = [ShapeTag::IntArray, ShapeTag::IntScalar, ShapeTag::Other];

    #[inline]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::IntArray(_) => ShapeTag::IntArray,
            Value::Int(_) => ShapeTag::IntScalar,
            _ => ShapeTag::Other,
        }
    }

    /// The eligibility family gating a receiver of this shape.
    ///
    /// `Other` receivers have no family: no built-in fast path exists for
    /// them, so only the call site's own shape protocol applies.
    #[inline]
    pub fn family(self) -> Option<FastPathFamily> {
        match self {
            ShapeTag::IntArray => Some(FastPathFamily::IntArray),
            ShapeTag::IntScalar => Some(FastPathFamily::IntScalar),
            ShapeTag::Other => None,
        }
    }

    pub(crate) fn index(self) -> u8 {
        match self {
            ShapeTag::IntArray => 0,
            ShapeTag::IntScalar => 1,
            ShapeTag::Other => 2,
        }
    }
}

/// Receiver/argument shape pair observed at a call site.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShapePair {
    pub receiver: ShapeTag,
    pub argument: ShapeTag,
}

impl ShapePair {
    /// The one pair with a specialized implementation: int array indexed by
    /// an integer.
    pub const INT_ARRAY_INDEX: ShapePair = ShapePair {
        receiver: ShapeTag::IntArray,
        argument: ShapeTag::IntScalar,
    };

    pub fn new(receiver: ShapeTag, argument: ShapeTag) -> Self {
        Self { receiver, argument }
    }

    #[inline]
    pub fn of(receiver: &Value, argument: &Value) -> Self {
        Self::new(ShapeTag::of(receiver), ShapeTag::of(argument))
    }

    #[inline]
    pub fn is_specializable(self) -> bool {
        self == Self::INT_ARRAY_INDEX
    }
}

/// The specialized path was handed values it cannot serve.
///
/// Never surfaced to callers: a call site receiving it demotes itself to
/// generic dispatch and retries there.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct UnsupportedShape;
