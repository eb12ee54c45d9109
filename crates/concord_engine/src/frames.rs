//! Frames: a small in-memory relation of variable bindings.
//!
//! A [`Frame`] is one consistent assignment of variables to values.
//! [`Frames`] is an ordered collection of frames supporting matching against
//! a flow log, joins against pure queries, filtering, and mapping. An empty
//! `Frames` means "no match" and short-circuits any downstream dispatch.

use std::sync::Arc;

use concord_foundation::{Error, Result, Value};

use crate::concept::Query;
use crate::flow::InvocationRecord;
use crate::pattern::{Pattern, Shape};
use crate::vars::{Binding, Var, Vars};

// =============================================================================
// Frame
// =============================================================================

/// One consistent mapping from variables to concrete values.
///
/// Backed by a persistent map, so cloning a frame to fan it out is O(1).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    bindings: im::OrdMap<Var, Value>,
}

impl Frame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the value bound to a variable.
    #[must_use]
    pub fn get(&self, var: Var) -> Option<&Value> {
        self.bindings.get(&var)
    }

    /// Gets the binding state of a variable.
    #[must_use]
    pub fn binding(&self, var: Var) -> Binding<'_> {
        self.get(var).map_or(Binding::Unbound, Binding::Bound)
    }

    /// Unifies `var` with `value`.
    ///
    /// Binds the variable if it is unbound. If it is already bound, leaves the
    /// frame unchanged and returns whether the existing value is equal.
    pub fn bind(&mut self, var: Var, value: Value) -> bool {
        match self.bindings.get(&var) {
            Some(existing) => *existing == value,
            None => {
                self.bindings.insert(var, value);
                true
            }
        }
    }

    /// Returns a new frame with `var` unified to `value`, or `None` on conflict.
    #[must_use]
    pub fn with(mut self, var: Var, value: Value) -> Option<Self> {
        if self.bind(var, value) { Some(self) } else { None }
    }

    /// Sets `var` unconditionally.
    pub(crate) fn assign(&mut self, var: Var, value: Value) {
        self.bindings.insert(var, value);
    }

    /// Iterates bindings in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (Var, &Value)> {
        self.bindings.iter().map(|(k, v)| (*k, v))
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// =============================================================================
// Frames
// =============================================================================

/// An ordered collection of frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frames {
    rows: Vec<Frame>,
}

impl Frames {
    /// Creates an empty collection (no match).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding one empty frame.
    #[must_use]
    pub fn unit() -> Self {
        Self {
            rows: vec![Frame::new()],
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.rows.iter()
    }

    /// Borrows the rows.
    #[must_use]
    pub fn rows(&self) -> &[Frame] {
        &self.rows
    }

    /// Appends a manually constructed frame.
    pub fn push(&mut self, row: Frame) {
        self.rows.push(row);
    }

    /// Finds every assignment of distinct log records to `patterns` positions
    /// that unifies, one frame per assignment.
    ///
    /// Assignments are produced in order: by the first position's record,
    /// then the second's, and so on. No patterns yields one empty frame.
    #[must_use]
    pub fn match_log(patterns: &[Pattern], log: &[Arc<InvocationRecord>]) -> Self {
        if patterns.is_empty() {
            return Self::unit();
        }
        let mut matcher = Matcher::new(patterns, log, None, log.len());
        matcher.search(0, &Frame::new());
        Self {
            rows: matcher.results,
        }
    }

    /// Like [`Frames::match_log`], but only assignments that use the record at
    /// `anchor`, with every other position drawn from records before it.
    ///
    /// Each combination of records is therefore produced exactly once: when
    /// its newest member is the anchor.
    #[must_use]
    pub fn match_anchored(patterns: &[Pattern], log: &[Arc<InvocationRecord>], anchor: usize) -> Self {
        let mut rows = Vec::new();
        if anchor >= log.len() {
            return Self { rows };
        }
        for position in 0..patterns.len() {
            let mut matcher = Matcher::new(patterns, log, Some((position, anchor)), anchor);
            matcher.search(0, &Frame::new());
            rows.append(&mut matcher.results);
        }
        Self { rows }
    }

    /// Joins each row against a pure query.
    ///
    /// For each row, bound variables are substituted into `input`, the query
    /// runs, and each result row is unified with `output`. Zero results drop
    /// the row; several results fan it out, one frame per result.
    ///
    /// # Errors
    /// Returns an error naming the variable (through `vars`) if `input`
    /// references a variable unbound in some row.
    pub async fn query(self, query: &dyn Query, input: &Shape, output: &Shape, vars: &Vars) -> Result<Self> {
        let mut rows = Vec::new();
        for frame in self.rows {
            let args = input
                .resolve(&frame)
                .map_err(|var| Error::unbound_variable(vars.name(var)))?;
            for result in query.rows(args).await {
                if let Some(joined) = output.unify(&result, &frame) {
                    rows.push(joined);
                }
            }
        }
        Ok(Self { rows })
    }

    /// Keeps only the rows satisfying `predicate`, unmodified.
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Frame) -> bool,
    {
        Self {
            rows: self.rows.into_iter().filter(|f| predicate(f)).collect(),
        }
    }

    /// Binds `var` in every row to a value derived from that row.
    ///
    /// Meant for variables nothing earlier has bound. Unlike matching and
    /// [`Frames::query`], it does not unify: a bound `var` is replaced, like a
    /// shadowing `let`, and rows are never dropped.
    #[must_use]
    pub fn map<F>(self, var: Var, derive: F) -> Self
    where
        F: Fn(&Frame) -> Value,
    {
        Self {
            rows: self
                .rows
                .into_iter()
                .map(|mut frame| {
                    let value = derive(&frame);
                    frame.assign(var, value);
                    frame
                })
                .collect(),
        }
    }
}

impl From<Vec<Frame>> for Frames {
    fn from(rows: Vec<Frame>) -> Self {
        Self { rows }
    }
}

impl FromIterator<Frame> for Frames {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Frames {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Frames {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// Backtracking search assigning log records to pattern positions.
struct Matcher<'a> {
    patterns: &'a [Pattern],
    log: &'a [Arc<InvocationRecord>],
    /// Position forced to a specific record index.
    pinned: Option<(usize, usize)>,
    /// Unpinned positions draw from `log[..limit]`.
    limit: usize,
    used: Vec<usize>,
    results: Vec<Frame>,
}

impl<'a> Matcher<'a> {
    fn new(
        patterns: &'a [Pattern],
        log: &'a [Arc<InvocationRecord>],
        pinned: Option<(usize, usize)>,
        limit: usize,
    ) -> Self {
        Self {
            patterns,
            log,
            pinned,
            limit: limit.min(log.len()),
            used: Vec::with_capacity(patterns.len()),
            results: Vec::new(),
        }
    }

    fn search(&mut self, position: usize, frame: &Frame) {
        let Some(pattern) = self.patterns.get(position) else {
            self.results.push(frame.clone());
            return;
        };

        if let Some((pinned_position, index)) = self.pinned {
            if pinned_position == position {
                self.try_record(position, index, pattern, frame);
                return;
            }
        }

        for index in 0..self.limit {
            if self.used.contains(&index) {
                continue;
            }
            self.try_record(position, index, pattern, frame);
        }
    }

    fn try_record(&mut self, position: usize, index: usize, pattern: &Pattern, frame: &Frame) {
        let Some(record) = self.log.get(index) else {
            return;
        };
        if let Some(next) = pattern.unify(record, frame) {
            self.used.push(index);
            self.search(position + 1, &next);
            self.used.pop();
        }
    }
}
