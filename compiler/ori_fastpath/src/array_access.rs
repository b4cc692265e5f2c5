//! Element reads on arrays and lists.
//!
//! [`specialized_get_at`] is the int-array fast path. [`get_at`] is the
//! generic element read the built-in resolver uses for every indexable kind.
//! Both normalize through [`resolve_index`] and fail through
//! [`index_out_of_range`], so which one serves a call is unobservable
//! except for latency.

use crate::errors::{index_out_of_range, no_such_method, wrong_arg_type, DispatchResult};
use crate::shape::UnsupportedShape;
use crate::{methods, Value};

/// Convert a signed index to unsigned, handling negative indices from the end.
///
/// `-1` is the last element. Returns `None` when the normalized index falls
/// outside `[0, len)`.
#[inline]
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        let idx = usize::try_from(index).ok()?;
        (idx < len).then_some(idx)
    } else {
        // -(i64::MIN) overflows; unsigned_abs does not.
        let from_end = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(from_end)
    }
}

/// Int-array element read.
///
/// Callers must have checked fast-path eligibility and the shapes of both
/// operands. Handed anything but an int array and an integer, it refuses
/// with [`UnsupportedShape`] instead of answering.
#[inline]
pub(crate) fn specialized_get_at(
    receiver: &Value,
    argument: &Value,
) -> Result<DispatchResult, UnsupportedShape> {
    match (receiver, argument) {
        (Value::IntArray(items), Value::Int(index)) => Ok(int_array_get_at(items, *index)),
        _ => Err(UnsupportedShape),
    }
}

#[inline]
fn int_array_get_at(items: &[i64], index: i64) -> DispatchResult {
    resolve_index(index, items.len())
        .map(|idx| Value::Int(items[idx]))
        .ok_or_else(|| index_out_of_range(index, items.len()))
}

fn read<T>(items: &[T], index: i64, wrap: impl FnOnce(&T) -> Value) -> DispatchResult {
    resolve_index(index, items.len())
        .map(|idx| wrap(&items[idx]))
        .ok_or_else(|| index_out_of_range(index, items.len()))
}

/// Element read on any indexable value.
pub fn get_at(receiver: &Value, index: &Value) -> DispatchResult {
    let Some(raw) = index.as_int() else {
        return Err(wrong_arg_type(methods::GET_AT, "int", index.type_name()));
    };

    match receiver {
        Value::IntArray(items) => int_array_get_at(items, raw),
        Value::ByteArray(items) => read(items, raw, |b| Value::Int(i64::from(*b))),
        Value::FloatArray(items) => read(items, raw, |x| Value::Float(*x)),
        Value::List(items) => read(items, raw, Value::clone),
        other => Err(no_such_method(methods::GET_AT, other.type_name())),
    }
}

/// Number of elements, for every value that has a length.
pub fn length(value: &Value) -> Option<usize> {
    match value {
        Value::IntArray(items) => Some(items.len()),
        Value::ByteArray(items) => Some(items.len()),
        Value::FloatArray(items) => Some(items.len()),
        Value::List(items) => Some(items.len()),
        Value::Str(s) => Some(s.chars().count()),
        Value::Void | Value::Bool(_) | Value::Int(_) | Value::Float(_) => None,
    }
}
