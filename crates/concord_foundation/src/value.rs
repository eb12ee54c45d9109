//! Core value type for action inputs, outputs, and query rows.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::collections::Record;

/// A concrete value carried by a record field or bound to a variable.
///
/// Clones are cheap: strings are shared and lists and records are
/// persistent, so binding a value into many frames copies no data.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Absence.
    Nil,
    /// A boolean.
    Bool(bool),
    /// A signed integer. Never equal to a float of the same magnitude.
    Int(i64),
    /// A float, compared bitwise.
    Float(f64),
    /// Shared text.
    String(Arc<str>),
    /// A persistent list.
    List(im::Vector<Value>),
    /// A nested record.
    Record(Record),
}

impl Value {
    /// Short variant name for diagnostics and error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    /// Returns true for `nil`.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Everything except `nil` and `false` counts as true in filters.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    /// The boolean payload, if any.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(b) = self { Some(*b) } else { None }
    }

    /// The integer payload, if any.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        if let Self::Int(n) = self { Some(*n) } else { None }
    }

    /// The float payload, if any.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        if let Self::Float(n) = self { Some(*n) } else { None }
    }

    /// Either numeric payload widened to `f64`. Large ints lose precision.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_number(&self) -> Option<f64> {
        self.as_float().or_else(|| self.as_int().map(|n| n as f64))
    }

    /// The string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(s) = self { Some(s) } else { None }
    }

    /// The list payload, if any.
    #[must_use]
    pub const fn as_list(&self) -> Option<&im::Vector<Value>> {
        if let Self::List(items) = self { Some(items) } else { None }
    }

    /// The nested record, if any.
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        if let Self::Record(r) = self { Some(r) } else { None }
    }
}

// =============================================================================
// Equality, hashing, ordering
// =============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            // Bitwise so that equality stays reflexive and agrees with Hash
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Nil => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(n) => n.hash(state),
            Self::Float(n) => n.to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::List(v) => v.hash(state),
            Self::Record(r) => r.hash(state),
        }
    }
}

/// Numbers order across `Int` and `Float`, but `Some(Equal)` is only returned
/// for values that are `==`. Numeric ties between distinct values (`1` and
/// `1.0`, `0.0` and `-0.0`) are unordered.
impl PartialOrd for Value {
    #[allow(clippy::cast_precision_loss)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let unequal = |ord: Option<Ordering>| ord.filter(|o| o.is_ne());
        match (self, other) {
            _ if self == other => Some(Ordering::Equal),
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => unequal(a.partial_cmp(b)),
            (Self::Int(a), Self::Float(b)) => unequal((*a as f64).partial_cmp(b)),
            (Self::Float(a), Self::Int(b)) => unequal(a.partial_cmp(&(*b as f64))),
            (Self::String(a), Self::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

// =============================================================================
// Formatting
// =============================================================================

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::Record(r) => write!(f, "{r}"),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

value_from! {
    bool => |b| Self::Bool(b),
    i64 => |n| Self::Int(n),
    i32 => |n| Self::Int(i64::from(n)),
    u32 => |n| Self::Int(i64::from(n)),
    f64 => |n| Self::Float(n),
    &str => |s| Self::String(s.into()),
    String => |s| Self::String(s.into()),
    Arc<str> => |s| Self::String(s),
    Record => |r| Self::Record(r),
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Nil, Into::into)
    }
}
