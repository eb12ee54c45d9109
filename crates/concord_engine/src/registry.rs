//! Registry of instrumented concepts and registered synchronizations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use concord_foundation::{ActionRef, Error, ErrorKind, QueryRef, Result};

use crate::concept::{Concept, ConceptQuery, Query};
use crate::sync::Synchronization;

/// Concepts by name, plus synchronizations in registration order.
#[derive(Default)]
pub struct Registry {
    concepts: HashMap<Arc<str>, Arc<dyn Concept>>,
    syncs: Vec<Arc<Synchronization>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Concepts
    // =========================================================================

    /// Adds concepts. All-or-nothing: a duplicate name adds none of them.
    ///
    /// # Errors
    /// Returns `DuplicateConcept` if a name is already taken or repeated.
    pub fn add_concepts(&mut self, concepts: Vec<(Arc<str>, Arc<dyn Concept>)>) -> Result<()> {
        let mut seen = HashSet::new();
        for (name, _) in &concepts {
            if self.concepts.contains_key(name) || !seen.insert(name.clone()) {
                return Err(Error::new(ErrorKind::DuplicateConcept(name.to_string())));
            }
        }
        self.concepts.extend(concepts);
        Ok(())
    }

    /// Looks up a concept by name.
    #[must_use]
    pub fn concept(&self, name: &str) -> Option<&Arc<dyn Concept>> {
        self.concepts.get(name)
    }

    /// Resolves an action to the concept that performs it.
    ///
    /// # Errors
    /// Returns `UnknownConcept` or `UnknownAction`.
    pub fn action_target(&self, action: &ActionRef) -> Result<Arc<dyn Concept>> {
        let concept = self
            .concept(action.concept())
            .ok_or_else(|| Error::unknown_concept(action.concept()))?;
        if !concept.has_action(action.name()) {
            return Err(Error::unknown_action(action.concept(), action.name()));
        }
        Ok(concept.clone())
    }

    /// Resolves a query reference.
    #[must_use]
    pub fn query(&self, query: &QueryRef) -> Option<Arc<dyn Query>> {
        let concept = self.concept(query.concept())?;
        if !concept.has_query(query.name()) {
            return None;
        }
        Some(Arc::new(ConceptQuery::new(concept.clone(), query.name())))
    }

    /// Number of concepts.
    #[must_use]
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    // =========================================================================
    // Synchronizations
    // =========================================================================

    /// Validates and adds synchronizations. All-or-nothing.
    ///
    /// # Errors
    /// Rejects duplicate names, empty `when` lists, and references to
    /// actions or queries no instrumented concept exposes.
    pub fn add_syncs(&mut self, syncs: Vec<Synchronization>) -> Result<()> {
        let mut seen: HashSet<Arc<str>> = self.syncs.iter().map(|s| s.name().clone()).collect();
        for sync in &syncs {
            if !seen.insert(sync.name().clone()) {
                return Err(Error::new(ErrorKind::DuplicateSync(sync.name().to_string())));
            }
            self.validate(sync)?;
        }

        for sync in syncs {
            for name in sync.unbindable_vars() {
                tracing::warn!(
                    target: "concord::engine",
                    sync = %sync.name(),
                    variable = name,
                    "then references a variable nothing can bind"
                );
            }
            tracing::debug!(target: "concord::engine", sync = %sync.name(), "registered");
            self.syncs.push(Arc::new(sync));
        }
        Ok(())
    }

    fn validate(&self, sync: &Synchronization) -> Result<()> {
        let invalid = |message: String| Error::invalid_sync(sync.name().to_string(), message);

        if sync.when().is_empty() {
            return Err(invalid("when must list at least one pattern".to_string()));
        }
        for action in sync.referenced_actions() {
            self.action_target(action)
                .map_err(|e| invalid(e.kind.to_string()))?;
        }
        for query in sync.refinement().queries() {
            if self.query(query).is_none() {
                return Err(invalid(format!("unknown query: {query}")));
            }
        }
        Ok(())
    }

    /// Registered synchronizations in registration order.
    #[must_use]
    pub fn syncs(&self) -> &[Arc<Synchronization>] {
        &self.syncs
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.concepts.keys().map(|k| &**k).collect();
        names.sort_unstable();
        f.debug_struct("Registry")
            .field("concepts", &names)
            .field("syncs", &self.syncs.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}
