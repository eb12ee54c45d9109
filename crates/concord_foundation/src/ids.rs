//! Identifiers for concept methods and causal flows.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Identifier of a flow: one externally-rooted call and everything it triggers.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowId(Uuid);

impl FlowId {
    /// Mints a fresh random flow identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for FlowId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlowId({})", self.0)
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First group of the hyphenated form is enough to tell flows apart in logs
        let s = self.0.hyphenated().to_string();
        write!(f, "{}", &s[..8])
    }
}

/// Reference to a named method on a named concept, printed `Concept.method`.
#[derive(Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct MethodRef {
    concept: Arc<str>,
    method: Arc<str>,
}

impl MethodRef {
    fn new(concept: impl Into<Arc<str>>, method: impl Into<Arc<str>>) -> Self {
        Self {
            concept: concept.into(),
            method: method.into(),
        }
    }

    fn parse(path: &str) -> Option<Self> {
        let (concept, method) = path.split_once('.')?;
        if concept.is_empty() || method.is_empty() {
            return None;
        }
        Some(Self::new(concept, method))
    }
}

macro_rules! method_ref {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(MethodRef);

        impl $name {
            /// Creates a reference from concept and method names.
            #[must_use]
            pub fn new(concept: impl Into<Arc<str>>, method: impl Into<Arc<str>>) -> Self {
                Self(MethodRef::new(concept, method))
            }

            /// Parses a `Concept.method` path.
            #[must_use]
            pub fn parse(path: &str) -> Option<Self> {
                MethodRef::parse(path).map(Self)
            }

            /// The concept name.
            #[must_use]
            pub fn concept(&self) -> &str {
                &self.0.concept
            }

            /// The method name.
            #[must_use]
            pub fn name(&self) -> &str {
                &self.0.method
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}.{})", stringify!($name), self.0.concept, self.0.method)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}", self.0.concept, self.0.method)
            }
        }
    };
}

method_ref!(
    /// Reference to an action method, e.g. `Counter.increment`.
    ActionRef
);

method_ref!(
    /// Reference to a query method, e.g. `Counter._getCount`.
    QueryRef
);
