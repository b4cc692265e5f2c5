//! Dispatch errors.
//!
//! The specialized and the generic path build errors through the same
//! constructor functions below, so a call fails identically whichever path
//! served it. Constructors are the public API; match on [`DispatchError`]
//! variants to inspect a failure.

use thiserror::Error;

use crate::Value;

/// Result of a dispatched call.
pub type DispatchResult = Result<Value, DispatchError>;

/// A failed call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Normalized index fell outside `[0, len)`.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("no method '{method}' on type {type_name}")]
    NoSuchMethod {
        method: String,
        type_name: &'static str,
    },

    #[error("{method} expects {expected} argument(s), got {got}")]
    WrongArgCount {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("{method} expects {expected} argument, got {got}")]
    WrongArgType {
        method: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("integer overflow in {operation}")]
    IntegerOverflow { operation: &'static str },

    /// Raised by user-registered methods.
    #[error("{message}")]
    Custom { message: String },
}

/// Index outside the bounds of the receiver.
#[cold]
pub fn index_out_of_range(index: i64, len: usize) -> DispatchError {
    DispatchError::IndexOutOfRange { index, len }
}

/// No resolver handled the method.
#[cold]
pub fn no_such_method(method: &str, type_name: &'static str) -> DispatchError {
    DispatchError::NoSuchMethod {
        method: method.to_string(),
        type_name,
    }
}

#[cold]
pub fn wrong_arg_count(method: &str, expected: usize, got: usize) -> DispatchError {
    DispatchError::WrongArgCount {
        method: method.to_string(),
        expected,
        got,
    }
}

#[cold]
pub fn wrong_arg_type(method: &str, expected: &'static str, got: &'static str) -> DispatchError {
    DispatchError::WrongArgType {
        method: method.to_string(),
        expected,
        got,
    }
}

#[cold]
pub fn integer_overflow(operation: &'static str) -> DispatchError {
    DispatchError::IntegerOverflow { operation }
}

/// Error raised from a user-registered method body.
#[cold]
pub fn custom(message: impl Into<String>) -> DispatchError {
    DispatchError::Custom {
        message: message.into(),
    }
}
