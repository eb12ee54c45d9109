//! The concept contract and pure query adapters.
//!
//! A concept is an opaque module the engine never owns. It exposes named
//! actions (one record in, one record out, may mutate, may fail) and named
//! queries (one record in, ordered rows out, pure, infallible).

use std::sync::Arc;

use async_trait::async_trait;
use concord_foundation::Record;
use thiserror::Error;

// =============================================================================
// Concept
// =============================================================================

/// A rejected action. Recorded as an `{error: message}` output.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionFailure {
    message: String,
}

impl ActionFailure {
    /// Creates a failure with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of performing an action.
///
/// `Ok` may itself carry an `{error}` record; both forms are recorded the same way.
pub type ActionResult = std::result::Result<Record, ActionFailure>;

/// A module whose actions the engine observes.
///
/// Implementations guard their own state against concurrent flows.
#[async_trait]
pub trait Concept: Send + Sync {
    /// Names of the actions this concept exposes.
    fn actions(&self) -> &[&'static str];

    /// Names of the pure queries this concept exposes.
    fn queries(&self) -> &[&'static str] {
        &[]
    }

    /// Performs an action.
    async fn perform(&self, action: &str, input: Record) -> ActionResult;

    /// Runs a pure query. Must not mutate state.
    async fn query(&self, query: &str, input: Record) -> Vec<Record> {
        let _ = (query, input);
        Vec::new()
    }

    /// Returns true if the concept exposes `action`.
    fn has_action(&self, action: &str) -> bool {
        self.actions().contains(&action)
    }

    /// Returns true if the concept exposes `query`.
    fn has_query(&self, query: &str) -> bool {
        self.queries().contains(&query)
    }
}

// =============================================================================
// Query
// =============================================================================

/// A pure function from one record to zero or more rows.
#[async_trait]
pub trait Query: Send + Sync {
    /// Returns the result rows for `input`, in order.
    async fn rows(&self, input: Record) -> Vec<Record>;
}

/// A named query on a concept.
pub struct ConceptQuery {
    concept: Arc<dyn Concept>,
    name: Arc<str>,
}

impl ConceptQuery {
    /// Binds a concept query by name.
    #[must_use]
    pub fn new(concept: Arc<dyn Concept>, name: impl Into<Arc<str>>) -> Self {
        Self {
            concept,
            name: name.into(),
        }
    }
}

#[async_trait]
impl Query for ConceptQuery {
    async fn rows(&self, input: Record) -> Vec<Record> {
        self.concept.query(&self.name, input).await
    }
}

/// A query backed by a synchronous closure. See [`query_fn`].
pub struct QueryFn<F> {
    f: F,
}

/// Wraps a closure as a [`Query`].
#[must_use]
pub fn query_fn<F>(f: F) -> QueryFn<F>
where
    F: Fn(&Record) -> Vec<Record> + Send + Sync,
{
    QueryFn { f }
}

#[async_trait]
impl<F> Query for QueryFn<F>
where
    F: Fn(&Record) -> Vec<Record> + Send + Sync,
{
    async fn rows(&self, input: Record) -> Vec<Record> {
        (self.f)(&input)
    }
}
