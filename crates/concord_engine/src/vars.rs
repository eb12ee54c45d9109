//! Variables scoped to one synchronization definition.
//!
//! A [`Var`] is an index into the [`Vars`] arena of the synchronization that
//! created it. Two synchronizations asking for the same name get variables
//! from different arenas and never interfere: frames are only ever built and
//! read within the synchronization that owns them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use concord_foundation::Value;

/// A pattern variable. Compared by identity (its arena index).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    /// The arena index of this variable.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// The state of a variable within one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding<'a> {
    /// No value yet.
    Unbound,
    /// Bound to a concrete value.
    Bound(&'a Value),
}

impl<'a> Binding<'a> {
    /// Returns the bound value, if any.
    #[must_use]
    pub const fn value(self) -> Option<&'a Value> {
        match self {
            Self::Unbound => None,
            Self::Bound(v) => Some(v),
        }
    }

    /// Returns true if bound.
    #[must_use]
    pub const fn is_bound(self) -> bool {
        matches!(self, Self::Bound(_))
    }
}

/// Variable factory for one synchronization definition.
///
/// Asking for the same name twice within one arena yields the same variable.
#[derive(Clone, Debug, Default)]
pub struct Vars {
    names: Vec<Arc<str>>,
    by_name: HashMap<Arc<str>, Var>,
}

impl Vars {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the variable for `name`, allocating it on first use.
    pub fn var(&mut self, name: &str) -> Var {
        if let Some(var) = self.by_name.get(name) {
            return *var;
        }
        let var = Var(u32::try_from(self.names.len()).unwrap_or(u32::MAX));
        let name: Arc<str> = name.into();
        self.names.push(name.clone());
        self.by_name.insert(name, var);
        var
    }

    /// Takes several variables at once, for destructuring:
    ///
    /// ```
    /// use concord_engine::Vars;
    ///
    /// let mut vars = Vars::new();
    /// let [user, count] = vars.take(["user", "count"]);
    /// assert_ne!(user, count);
    /// ```
    pub fn take<const N: usize>(&mut self, names: [&str; N]) -> [Var; N] {
        names.map(|name| self.var(name))
    }

    /// Returns the name a variable was created with.
    #[must_use]
    pub fn name(&self, var: Var) -> &str {
        self.names
            .get(var.0 as usize)
            .map_or("<foreign>", |n| n.as_ref())
    }

    /// Looks up an existing variable by name without allocating.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).copied()
    }

    /// Number of variables allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no variables were allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
