//! Runtime values seen by the dispatch layer.
//!
//! Only the shapes that dispatch cares about are modelled here. Heap payloads
//! are reference counted so a `Value` clones in O(1), which matters because
//! the generic path hands values to user-registered methods by reference and
//! those frequently return (clones of) their inputs.

use std::fmt;
use std::sync::Arc;

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Unit value.
    Void,
    /// Boolean value.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String value.
    Str(Arc<str>),
    /// Primitive integer array. The only array kind with a fast path.
    IntArray(Arc<[i64]>),
    /// Primitive byte array.
    ByteArray(Arc<[u8]>),
    /// Primitive floating-point array.
    FloatArray(Arc<[f64]>),
    /// Heterogeneous list of values.
    List(Arc<[Value]>),
}

/// The key under which per-type behavior is registered.
///
/// One variant per [`Value`] variant. Replacing the behavior of
/// [`TypeKind::Int`] or [`TypeKind::IntArray`] affects fast-path eligibility;
/// every other kind is always dispatched generically.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Bool,
    Int,
    Float,
    Str,
    IntArray,
    ByteArray,
    FloatArray,
    List,
}

impl TypeKind {
    /// Human-readable type name, as used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Void => "void",
            TypeKind::Bool => "bool",
            TypeKind::Int => "int",
            TypeKind::Float => "float",
            TypeKind::Str => "str",
            TypeKind::IntArray => "[int]",
            TypeKind::ByteArray => "[byte]",
            TypeKind::FloatArray => "[float]",
            TypeKind::List => "list",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn int_array(items: impl Into<Arc<[i64]>>) -> Self {
        Value::IntArray(items.into())
    }

    pub fn byte_array(items: impl Into<Arc<[u8]>>) -> Self {
        Value::ByteArray(items.into())
    }

    pub fn float_array(items: impl Into<Arc<[f64]>>) -> Self {
        Value::FloatArray(items.into())
    }

    pub fn list(items: impl Into<Arc<[Value]>>) -> Self {
        Value::List(items.into())
    }

    /// The registration key for this value's type.
    pub fn kind(&self) -> TypeKind {
        match self {
            Value::Void => TypeKind::Void,
            Value::Bool(_) => TypeKind::Bool,
            Value::Int(_) => TypeKind::Int,
            Value::Float(_) => TypeKind::Float,
            Value::Str(_) => TypeKind::Str,
            Value::IntArray(_) => TypeKind::IntArray,
            Value::ByteArray(_) => TypeKind::ByteArray,
            Value::FloatArray(_) => TypeKind::FloatArray,
            Value::List(_) => TypeKind::List,
        }
    }

    /// Get the type name of this value.
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// The integer payload, if this is an integer scalar.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn seq<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str("]")
        }

        match self {
            Value::Void => f.write_str("void"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::IntArray(items) => seq(f, items),
            Value::ByteArray(items) => seq(f, items),
            Value::FloatArray(items) => seq(f, items),
            Value::List(items) => seq(f, items),
        }
    }
}

#[cfg(test)]
mod tests;
