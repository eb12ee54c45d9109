//! The synchronization engine and instrumented concept handles.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use concord_debug::{TraceLevel, Tracer};
use concord_foundation::{ActionRef, Error, QueryRef, Record, Result};
use parking_lot::{Mutex, RwLock};

use crate::concept::Concept;
use crate::config::EngineConfig;
use crate::evaluator::Evaluation;
use crate::flow::{FlowContext, FlowLog};
use crate::registry::Registry;
use crate::sync::{SyncDescription, SyncFn, Synchronization};
use crate::vars::Vars;

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) tracer: Tracer,
    pub(crate) registry: RwLock<Registry>,
    settled: Mutex<VecDeque<FlowLog>>,
}

// =============================================================================
// SyncEngine
// =============================================================================

/// A synchronization engine instance.
///
/// Cloning yields another handle on the same engine. Engines share nothing
/// with each other, including their trace level.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let tracer = Tracer::new(config.tracer());
        Self {
            inner: Arc::new(EngineInner {
                config,
                tracer,
                registry: RwLock::new(Registry::new()),
                settled: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Instruments concepts, returning a handle per concept name.
    ///
    /// Actions called through a handle are recorded and trigger evaluation;
    /// queries pass straight through.
    ///
    /// # Errors
    /// Returns `DuplicateConcept` if a name is already instrumented; in that
    /// case none of the given concepts are added.
    pub fn instrument<I, N>(&self, concepts: I) -> Result<HashMap<String, Instrumented>>
    where
        I: IntoIterator<Item = (N, Arc<dyn Concept>)>,
        N: Into<Arc<str>>,
    {
        let concepts: Vec<(Arc<str>, Arc<dyn Concept>)> = concepts
            .into_iter()
            .map(|(name, concept)| (name.into(), concept))
            .collect();
        self.inner.registry.write().add_concepts(concepts.clone())?;

        Ok(concepts
            .into_iter()
            .map(|(name, concept)| {
                tracing::debug!(target: "concord::engine", concept = %name, "instrumented");
                (
                    name.to_string(),
                    Instrumented {
                        engine: self.clone(),
                        name,
                        concept,
                    },
                )
            })
            .collect())
    }

    /// Instruments a single concept.
    ///
    /// # Errors
    /// Returns `DuplicateConcept` if the name is already instrumented.
    pub fn instrument_concept(&self, name: &str, concept: Arc<dyn Concept>) -> Result<Instrumented> {
        let mut handles = self.instrument([(name, concept)])?;
        handles
            .remove(name)
            .ok_or_else(|| Error::unknown_concept(name))
    }

    /// Registers synchronizations. Each function is called exactly once.
    ///
    /// # Errors
    /// Fails on duplicate names or invalid descriptions; in that case none
    /// of the given synchronizations are registered.
    pub fn register<I, N>(&self, syncs: I) -> Result<()>
    where
        I: IntoIterator<Item = (N, SyncFn)>,
        N: Into<Arc<str>>,
    {
        let built = syncs
            .into_iter()
            .map(|(name, build)| Synchronization::build(name, build))
            .collect();
        self.inner.registry.write().add_syncs(built)
    }

    /// Registers one synchronization built by a closure.
    ///
    /// # Errors
    /// Fails on a duplicate name or an invalid description.
    pub fn register_sync<F>(&self, name: impl Into<Arc<str>>, build: F) -> Result<()>
    where
        F: FnOnce(&mut Vars) -> SyncDescription,
    {
        let sync = Synchronization::build(name, build);
        self.inner.registry.write().add_syncs(vec![sync])
    }

    /// Names of registered synchronizations, in registration order.
    #[must_use]
    pub fn sync_names(&self) -> Vec<String> {
        self.inner
            .registry
            .read()
            .syncs()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    /// Starts a flow that several rooting calls can share.
    #[must_use]
    pub fn begin_flow(&self) -> FlowContext {
        FlowContext::new()
    }

    /// Invokes an action in a fresh flow and runs its cascade to a fixpoint.
    ///
    /// Returns the action's own output, which is an `{error}` record if the
    /// action rejected the input.
    ///
    /// # Errors
    /// Fails if the action is unknown or the flow exceeds the firing limit.
    pub async fn invoke(&self, action: &ActionRef, input: Record) -> Result<Record> {
        let cx = self.begin_flow();
        let result = self.invoke_in(&cx, action, input).await;
        self.retain(&cx).await;
        result
    }

    /// Invokes an action within an existing flow.
    ///
    /// Calls sharing a flow are recorded one at a time; a call waits for the
    /// flow's current cascade to settle before it starts.
    ///
    /// # Errors
    /// Fails if the action is unknown or the flow exceeds the firing limit.
    pub async fn invoke_in(&self, cx: &FlowContext, action: &ActionRef, input: Record) -> Result<Record> {
        let mut state = cx.state.lock().await;
        Evaluation::new(&self.inner, cx.id(), &mut state)
            .root(action, input)
            .await
    }

    /// Runs a concept query directly. Nothing is recorded.
    ///
    /// # Errors
    /// Fails if no instrumented concept exposes the query.
    pub async fn query(&self, query: &QueryRef, input: Record) -> Result<Vec<Record>> {
        let source = self
            .inner
            .registry
            .read()
            .query(query)
            .ok_or_else(|| Error::unknown_query(query.concept(), query.name()))?;
        Ok(source.rows(input).await)
    }

    async fn retain(&self, cx: &FlowContext) {
        let keep = self.inner.config.retained_flows;
        if keep == 0 {
            return;
        }
        let log = cx.log().await;
        let mut settled = self.inner.settled.lock();
        settled.push_back(log);
        while settled.len() > keep {
            settled.pop_front();
        }
    }

    /// Logs of the most recently settled flows started by [`SyncEngine::invoke`],
    /// oldest first.
    #[must_use]
    pub fn settled_flows(&self) -> Vec<FlowLog> {
        self.inner.settled.lock().iter().cloned().collect()
    }

    // =========================================================================
    // Tracing
    // =========================================================================

    /// The current trace level.
    #[must_use]
    pub fn trace_level(&self) -> TraceLevel {
        self.inner.tracer.level()
    }

    /// Changes the trace level. Takes effect for the next traced event.
    pub fn set_trace_level(&self, level: TraceLevel) {
        self.inner.tracer.set_level(level);
    }

    /// The engine's tracer, for reading buffered trace records.
    #[must_use]
    pub fn tracer(&self) -> &Tracer {
        &self.inner.tracer
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.inner.config)
            .field("registry", &*self.inner.registry.read())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Instrumented
// =============================================================================

/// An instrumented concept handle.
#[derive(Clone)]
pub struct Instrumented {
    engine: SyncEngine,
    name: Arc<str>,
    concept: Arc<dyn Concept>,
}

impl Instrumented {
    /// The concept name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying concept.
    #[must_use]
    pub fn concept(&self) -> &Arc<dyn Concept> {
        &self.concept
    }

    /// A reference to one of this concept's actions, for patterns.
    #[must_use]
    pub fn action(&self, action: &str) -> ActionRef {
        ActionRef::new(self.name.clone(), action)
    }

    /// A reference to one of this concept's queries, for `where` joins.
    #[must_use]
    pub fn query_ref(&self, query: &str) -> QueryRef {
        QueryRef::new(self.name.clone(), query)
    }

    /// Calls an action in a fresh flow. See [`SyncEngine::invoke`].
    ///
    /// # Errors
    /// Fails if the action is unknown or the flow exceeds the firing limit.
    pub async fn call(&self, action: &str, input: Record) -> Result<Record> {
        self.engine.invoke(&self.action(action), input).await
    }

    /// Calls an action in an existing flow. See [`SyncEngine::invoke_in`].
    ///
    /// # Errors
    /// Fails if the action is unknown or the flow exceeds the firing limit.
    pub async fn call_in(&self, cx: &FlowContext, action: &str, input: Record) -> Result<Record> {
        self.engine.invoke_in(cx, &self.action(action), input).await
    }

    /// Runs a query, unrecorded.
    ///
    /// # Errors
    /// Fails if the concept does not expose the query.
    pub async fn query(&self, query: &str, input: Record) -> Result<Vec<Record>> {
        if !self.concept.has_query(query) {
            return Err(Error::unknown_query(self.name.to_string(), query));
        }
        Ok(self.concept.query(query, input).await)
    }
}

impl fmt::Debug for Instrumented {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumented")
            .field("name", &self.name)
            .field("actions", &self.concept.actions())
            .finish_non_exhaustive()
    }
}
