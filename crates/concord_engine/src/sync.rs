//! Synchronization definitions.
//!
//! A synchronization is a named rule: a `when` list of patterns that must all
//! match distinct records of one flow, an optional [`Where`] refinement over
//! the matched frames, and a `then` list of actions to invoke per frame.
//!
//! Definitions are built by a [`SyncFn`], called once at registration with a
//! fresh [`Vars`] arena, and fixed afterwards.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use concord_foundation::{ActionRef, Error, QueryRef, Result, Value};

use crate::concept::Query;
use crate::frames::{Frame, Frames};
use crate::pattern::{Pattern, Shape, ThenAction};
use crate::vars::{Var, Vars};

/// Builds a synchronization description from a fresh variable arena.
pub type SyncFn = fn(&mut Vars) -> SyncDescription;

type Predicate = Arc<dyn Fn(&Frame) -> bool + Send + Sync>;
type Derive = Arc<dyn Fn(&Frame) -> Value + Send + Sync>;
type Custom = Arc<dyn Fn(Frames) -> Result<Frames> + Send + Sync>;

// =============================================================================
// Where
// =============================================================================

/// One step of a `where` refinement.
#[derive(Clone)]
pub enum Step {
    /// Join each frame against a concept query.
    Query {
        /// The query to run.
        query: QueryRef,
        /// Input shape, substituted from each frame.
        input: Shape,
        /// Output shape, unified with each result row.
        output: Shape,
    },
    /// Keep only frames passing a predicate.
    Filter(Predicate),
    /// Bind a variable to a value derived from each frame.
    Map {
        /// The variable to bind.
        var: Var,
        /// Derives the value from the frame.
        derive: Derive,
    },
    /// Arbitrary transformation, e.g. to push constructed frames.
    Apply(Custom),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query {
                query,
                input,
                output,
            } => f
                .debug_struct("Query")
                .field("query", query)
                .field("input", input)
                .field("output", output)
                .finish(),
            Self::Filter(_) => f.write_str("Filter(..)"),
            Self::Map { var, .. } => f.debug_struct("Map").field("var", var).finish_non_exhaustive(),
            Self::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

/// A `where` refinement: steps applied in order to the matched frames.
///
/// An empty pipeline passes frames through unchanged. An empty intermediate
/// result skips the remaining steps.
#[derive(Clone, Debug, Default)]
pub struct Where {
    steps: Vec<Step>,
}

impl Where {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a join against a concept query.
    #[must_use]
    pub fn query(mut self, query: QueryRef, input: Shape, output: Shape) -> Self {
        self.steps.push(Step::Query {
            query,
            input,
            output,
        });
        self
    }

    /// Adds a filter.
    #[must_use]
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Frame) -> bool + Send + Sync + 'static,
    {
        self.steps.push(Step::Filter(Arc::new(predicate)));
        self
    }

    /// Adds a derived binding for a variable not bound earlier.
    ///
    /// See [`Frames::map`]: an already bound `var` is replaced, not unified.
    #[must_use]
    pub fn map<F>(mut self, var: Var, derive: F) -> Self
    where
        F: Fn(&Frame) -> Value + Send + Sync + 'static,
    {
        self.steps.push(Step::Map {
            var,
            derive: Arc::new(derive),
        });
        self
    }

    /// Adds an arbitrary transformation.
    #[must_use]
    pub fn apply<F>(mut self, f: F) -> Self
    where
        F: Fn(Frames) -> Result<Frames> + Send + Sync + 'static,
    {
        self.steps.push(Step::Apply(Arc::new(f)));
        self
    }

    /// The steps in order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Returns true if there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the pipeline, resolving query references through `resolve`.
    /// `vars` names variables in errors.
    ///
    /// # Errors
    /// Fails if a query cannot be resolved, a query input is unbound, or a
    /// custom step fails.
    pub async fn run<R>(&self, mut frames: Frames, vars: &Vars, resolve: R) -> Result<Frames>
    where
        R: Fn(&QueryRef) -> Option<Arc<dyn Query>> + Send + Sync,
    {
        for step in &self.steps {
            if frames.is_empty() {
                break;
            }
            frames = match step {
                Step::Query {
                    query,
                    input,
                    output,
                } => {
                    let source = resolve(query)
                        .ok_or_else(|| Error::unknown_query(query.concept(), query.name()))?;
                    frames.query(source.as_ref(), input, output, vars).await?
                }
                Step::Filter(predicate) => frames.filter(|f| predicate(f)),
                Step::Map { var, derive } => frames.map(*var, |f| derive(f)),
                Step::Apply(custom) => custom(frames)?,
            };
        }
        Ok(frames)
    }

    /// Variables that steps other than `apply` can bind.
    pub(crate) fn bound_vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.steps.iter().flat_map(|step| match step {
            Step::Query { output, .. } => output.vars().collect::<Vec<_>>(),
            Step::Map { var, .. } => vec![*var],
            Step::Filter(_) | Step::Apply(_) => Vec::new(),
        })
    }

    pub(crate) fn has_custom_steps(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, Step::Apply(_)))
    }

    pub(crate) fn queries(&self) -> impl Iterator<Item = &QueryRef> {
        self.steps.iter().filter_map(|step| match step {
            Step::Query { query, .. } => Some(query),
            _ => None,
        })
    }
}

// =============================================================================
// Descriptions
// =============================================================================

/// What a [`SyncFn`] returns: `when`, optional `where`, and `then`.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct SyncDescription {
    when: Vec<Pattern>,
    refine: Where,
    then: Vec<ThenAction>,
}

impl SyncDescription {
    /// Creates an empty description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `when` patterns. See [`actions`](crate::actions).
    pub fn when(mut self, patterns: impl IntoIterator<Item = Pattern>) -> Self {
        self.when = patterns.into_iter().collect();
        self
    }

    /// Sets the `where` refinement.
    pub fn refine(mut self, refine: Where) -> Self {
        self.refine = refine;
        self
    }

    /// Sets the `then` actions.
    pub fn then(mut self, actions: impl IntoIterator<Item = (ActionRef, Shape)>) -> Self {
        self.then = actions
            .into_iter()
            .map(|(action, input)| ThenAction::new(action, input))
            .collect();
        self
    }
}

// =============================================================================
// Synchronization
// =============================================================================

/// A registered, immutable synchronization.
#[derive(Debug)]
pub struct Synchronization {
    name: Arc<str>,
    vars: Vars,
    when: Vec<Pattern>,
    refine: Where,
    then: Vec<ThenAction>,
}

impl Synchronization {
    /// Builds a synchronization by calling `build` once with a fresh arena.
    pub fn build<F>(name: impl Into<Arc<str>>, build: F) -> Self
    where
        F: FnOnce(&mut Vars) -> SyncDescription,
    {
        let mut vars = Vars::new();
        let description = build(&mut vars);
        Self {
            name: name.into(),
            vars,
            when: description.when,
            refine: description.refine,
            then: description.then,
        }
    }

    /// The synchronization name.
    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// The variable arena, for naming variables in traces.
    #[must_use]
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    /// The `when` patterns.
    #[must_use]
    pub fn when(&self) -> &[Pattern] {
        &self.when
    }

    /// The `where` refinement.
    #[must_use]
    pub fn refinement(&self) -> &Where {
        &self.refine
    }

    /// The `then` actions.
    #[must_use]
    pub fn then(&self) -> &[ThenAction] {
        &self.then
    }

    /// Names of `then` variables that nothing in `when` or `where` binds.
    ///
    /// Empty when the refinement has custom steps, which may bind anything.
    #[must_use]
    pub fn unbindable_vars(&self) -> Vec<&str> {
        if self.refine.has_custom_steps() {
            return Vec::new();
        }
        let bindable: HashSet<Var> = self
            .when
            .iter()
            .flat_map(Pattern::vars)
            .chain(self.refine.bound_vars())
            .collect();

        let mut missing: Vec<&str> = Vec::new();
        for var in self.then.iter().flat_map(|t| t.input.vars()) {
            let name = self.vars.name(var);
            if !bindable.contains(&var) && !missing.contains(&name) {
                missing.push(name);
            }
        }
        missing
    }

    /// Every action referenced by `when` or `then`.
    pub(crate) fn referenced_actions(&self) -> impl Iterator<Item = &ActionRef> {
        self.when
            .iter()
            .map(|p| &p.action)
            .chain(self.then.iter().map(|t| &t.action))
    }
}
