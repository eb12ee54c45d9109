//! Persistent records with structural sharing.
//!
//! [`Record`] is a thin wrapper around `im::OrdMap`, giving action inputs,
//! action outputs, and query rows O(1) clones and a deterministic field order.

use std::fmt;
use std::iter::FromIterator;
use std::sync::Arc;

use crate::value::Value;

/// Field name of the error marker carried by failed action outputs.
pub const ERROR_FIELD: &str = "error";

/// A named-field record.
///
/// Every action takes one record and returns one record; every query takes
/// one record and returns zero or more records. Cloning is O(1).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record(im::OrdMap<Arc<str>, Value>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(im::OrdMap::new())
    }

    /// Creates the `{error: message}` record used for failed actions.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new().with(ERROR_FIELD, message.into())
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Sets a field in place.
    pub fn insert(&mut self, field: impl Into<Arc<str>>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Returns a new record with the field set.
    #[must_use]
    pub fn with(mut self, field: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Returns true if this record carries an `error` field.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.contains(ERROR_FIELD)
    }

    /// Returns the error message if this is an error record.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.get(ERROR_FIELD).and_then(Value::as_str)
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.0.iter()
    }

    /// Iterates field names in key order.
    pub fn fields(&self) -> impl Iterator<Item = &Arc<str>> {
        self.0.keys()
    }
}

impl<K: Into<Arc<str>>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

/// Builds a [`Record`] from `field => value` pairs.
///
/// ```
/// use concord_foundation::{record, Value};
///
/// let r = record! { "kind" => "increment_counter", "count" => 3 };
/// assert_eq!(r.get("count"), Some(&Value::Int(3)));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.with($field, $value))+
    };
}
