//! Built-in methods on primitive receivers.
//!
//! The table here is what the generic path falls back to when no handle,
//! category or user override claims a call. `get_at` is the method array
//! access expressions compile to, and the only one with a fast path.

use crate::array_access;
use crate::errors::{integer_overflow, no_such_method, wrong_arg_count, wrong_arg_type};
use crate::{DispatchResult, TypeKind, Value};

/// Element read: `receiver[index]`.
pub const GET_AT: &str = "get_at";
/// Element count.
pub const SIZE: &str = "size";
/// Absolute value of an integer.
pub const ABS: &str = "abs";
/// Integer addition.
pub const PLUS: &str = "plus";

/// A built-in method implementation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuiltinMethod {
    GetAt,
    Size,
    Abs,
    Plus,
}

/// Every `(receiver kind, method name)` pair with a built-in implementation.
pub const BUILTIN_METHODS: &[(TypeKind, &str, BuiltinMethod)] = &[
    (TypeKind::IntArray, GET_AT, BuiltinMethod::GetAt),
    (TypeKind::ByteArray, GET_AT, BuiltinMethod::GetAt),
    (TypeKind::FloatArray, GET_AT, BuiltinMethod::GetAt),
    (TypeKind::List, GET_AT, BuiltinMethod::GetAt),
    (TypeKind::IntArray, SIZE, BuiltinMethod::Size),
    (TypeKind::ByteArray, SIZE, BuiltinMethod::Size),
    (TypeKind::FloatArray, SIZE, BuiltinMethod::Size),
    (TypeKind::List, SIZE, BuiltinMethod::Size),
    (TypeKind::Str, SIZE, BuiltinMethod::Size),
    (TypeKind::Int, ABS, BuiltinMethod::Abs),
    (TypeKind::Int, PLUS, BuiltinMethod::Plus),
];

impl BuiltinMethod {
    /// Method name as registered in [`BUILTIN_METHODS`].
    pub fn name(self) -> &'static str {
        match self {
            BuiltinMethod::GetAt => GET_AT,
            BuiltinMethod::Size => SIZE,
            BuiltinMethod::Abs => ABS,
            BuiltinMethod::Plus => PLUS,
        }
    }

    fn arity(self) -> usize {
        match self {
            BuiltinMethod::GetAt | BuiltinMethod::Plus => 1,
            BuiltinMethod::Size | BuiltinMethod::Abs => 0,
        }
    }

    /// Execute against a receiver.
    pub fn call(self, receiver: &Value, args: &[Value]) -> DispatchResult {
        let method = self.name();
        if args.len() != self.arity() {
            return Err(wrong_arg_count(method, self.arity(), args.len()));
        }
        match (self, args) {
            (BuiltinMethod::GetAt, [index]) => array_access::get_at(receiver, index),
            (BuiltinMethod::Size, []) => {
                let len = array_access::length(receiver)
                    .ok_or_else(|| no_such_method(method, receiver.type_name()))?;
                i64::try_from(len)
                    .map(Value::Int)
                    .map_err(|_| integer_overflow(SIZE))
            }
            (BuiltinMethod::Abs, []) => match receiver {
                Value::Int(n) => n.checked_abs().map(Value::Int).ok_or_else(|| integer_overflow(ABS)),
                other => Err(no_such_method(method, other.type_name())),
            },
            (BuiltinMethod::Plus, [rhs]) => match (receiver, rhs) {
                (Value::Int(a), Value::Int(b)) => {
                    a.checked_add(*b).map(Value::Int).ok_or_else(|| integer_overflow(PLUS))
                }
                (Value::Int(_), other) => Err(wrong_arg_type(method, "int", other.type_name())),
                (other, _) => Err(no_such_method(method, other.type_name())),
            },
            // Arity was checked above.
            _ => Err(wrong_arg_count(method, self.arity(), args.len())),
        }
    }
}
