//! Pattern primitives: terms, shapes, and action patterns.
//!
//! A [`Shape`] lists the fields a pattern cares about. Each listed field is
//! either a literal that must match exactly or a variable that binds (or is
//! checked against an existing binding). Fields that are not listed are
//! wildcards.

use std::sync::Arc;

use concord_foundation::{ActionRef, Record, Value};

use crate::flow::InvocationRecord;
use crate::frames::Frame;
use crate::vars::Var;

// =============================================================================
// Terms
// =============================================================================

/// One field of a shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    /// Must equal this value exactly.
    Literal(Value),
    /// Binds to the value, or must agree with an existing binding.
    Var(Var),
}

/// Conversion into a [`Term`], used by [`Shape::with`] and [`shape!`](crate::shape).
pub trait IntoTerm {
    /// Converts `self` into a term.
    fn into_term(self) -> Term;
}

impl IntoTerm for Term {
    fn into_term(self) -> Term {
        self
    }
}

impl IntoTerm for Var {
    fn into_term(self) -> Term {
        Term::Var(self)
    }
}

macro_rules! literal_terms {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoTerm for $ty {
                fn into_term(self) -> Term {
                    Term::Literal(Value::from(self))
                }
            }
        )*
    };
}

literal_terms!(Value, &str, String, Arc<str>, i64, i32, bool, f64, Record);

// =============================================================================
// Shapes
// =============================================================================

/// The fields of an input or output a pattern constrains.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Shape {
    fields: Vec<(Arc<str>, Term)>,
}

impl Shape {
    /// Creates an empty shape (matches anything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field constraint. A later constraint on the same field replaces the earlier one.
    #[must_use]
    pub fn with(mut self, field: impl Into<Arc<str>>, term: impl IntoTerm) -> Self {
        let field = field.into();
        let term = term.into_term();
        if let Some(slot) = self.fields.iter_mut().find(|(f, _)| *f == field) {
            slot.1 = term;
        } else {
            self.fields.push((field, term));
        }
        self
    }

    /// Returns the constrained fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[(Arc<str>, Term)] {
        &self.fields
    }

    /// Returns true if no field is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates the variables referenced by this shape.
    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.fields.iter().filter_map(|(_, term)| match term {
            Term::Var(v) => Some(*v),
            Term::Literal(_) => None,
        })
    }

    /// Unifies this shape against concrete values, extending `frame`.
    ///
    /// Returns `None` if a constrained field is missing, a literal differs,
    /// or a variable is already bound to a different value.
    #[must_use]
    pub fn unify(&self, values: &Record, frame: &Frame) -> Option<Frame> {
        let mut frame = frame.clone();
        for (field, term) in &self.fields {
            let value = values.get(field)?;
            match term {
                Term::Literal(lit) => {
                    if lit != value {
                        return None;
                    }
                }
                Term::Var(var) => {
                    if !frame.bind(*var, value.clone()) {
                        return None;
                    }
                }
            }
        }
        Some(frame)
    }

    /// Substitutes bound variables to produce a concrete record.
    ///
    /// # Errors
    /// Returns the first variable that has no binding in `frame`.
    pub fn resolve(&self, frame: &Frame) -> Result<Record, Var> {
        let mut record = Record::new();
        for (field, term) in &self.fields {
            let value = match term {
                Term::Literal(lit) => lit.clone(),
                Term::Var(var) => frame.get(*var).cloned().ok_or(*var)?,
            };
            record.insert(field.clone(), value);
        }
        Ok(record)
    }
}

/// Builds a [`Shape`] from `field => term` pairs, where each term is a
/// [`Var`] or anything convertible to a literal [`Value`].
///
/// ```
/// use concord_engine::{shape, Vars};
///
/// let mut vars = Vars::new();
/// let count = vars.var("count");
/// let s = shape! { "kind" => "increment_counter", "count" => count };
/// assert_eq!(s.fields().len(), 2);
/// ```
#[macro_export]
macro_rules! shape {
    () => {
        $crate::Shape::new()
    };
    ($($field:expr => $term:expr),+ $(,)?) => {
        $crate::Shape::new()$(.with($field, $term))+
    };
}

// =============================================================================
// Patterns
// =============================================================================

/// A `when` pattern: an action plus input and output shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// The action a matching record must have.
    pub action: ActionRef,
    /// Constraints on the record's input.
    pub input: Shape,
    /// Constraints on the record's output.
    pub output: Shape,
}

impl Pattern {
    /// Creates a pattern.
    #[must_use]
    pub fn new(action: ActionRef, input: Shape, output: Shape) -> Self {
        Self {
            action,
            input,
            output,
        }
    }

    /// Unifies this pattern with one invocation record.
    #[must_use]
    pub fn unify(&self, record: &InvocationRecord, frame: &Frame) -> Option<Frame> {
        if record.action != self.action {
            return None;
        }
        let frame = self.input.unify(&record.input, frame)?;
        self.output.unify(&record.output, &frame)
    }

    /// Iterates every variable this pattern can bind.
    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.input.vars().chain(self.output.vars())
    }
}

/// Normalizes `(action, input, output)` tuples into an ordered pattern list.
#[must_use]
pub fn actions<I>(tuples: I) -> Vec<Pattern>
where
    I: IntoIterator<Item = (ActionRef, Shape, Shape)>,
{
    tuples
        .into_iter()
        .map(|(action, input, output)| Pattern::new(action, input, output))
        .collect()
}

/// A `then` entry: an action to invoke with an input built from bindings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThenAction {
    /// The action to invoke.
    pub action: ActionRef,
    /// Input shape; every variable must be bound at dispatch time.
    pub input: Shape,
}

impl ThenAction {
    /// Creates a `then` entry.
    #[must_use]
    pub fn new(action: ActionRef, input: Shape) -> Self {
        Self { action, input }
    }
}
