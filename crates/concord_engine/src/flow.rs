//! Flows: causally scoped, append-only logs of action invocations.

use std::fmt;
use std::sync::Arc;

use concord_foundation::{ActionRef, FlowId, Record};
use tokio::sync::Mutex;

/// An immutable fact: one completed action invocation within a flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationRecord {
    /// The flow this record belongs to.
    pub flow: FlowId,
    /// Position in the flow log, starting at 0.
    pub seq: u64,
    /// The action that ran.
    pub action: ActionRef,
    /// The concrete input.
    pub input: Record,
    /// The concrete output, possibly an `{error}` record.
    pub output: Record,
}

impl fmt::Display for InvocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {} => {}", self.seq, self.action, self.input, self.output)
    }
}

/// Mutable state of one flow. Only reachable through the flow's lock.
#[derive(Debug, Default)]
pub(crate) struct FlowState {
    pub(crate) log: Vec<Arc<InvocationRecord>>,
}

impl FlowState {
    /// Appends a record and returns its index.
    pub(crate) fn append(
        &mut self,
        flow: FlowId,
        action: ActionRef,
        input: Record,
        output: Record,
    ) -> usize {
        let index = self.log.len();
        self.log.push(Arc::new(InvocationRecord {
            flow,
            seq: index as u64,
            action,
            input,
            output,
        }));
        index
    }
}

/// A handle on one flow.
///
/// Cloning is cheap; the flow's log lives as long as any handle does. Every
/// call made through the same context is recorded into the same log, one at
/// a time.
#[derive(Clone)]
pub struct FlowContext {
    id: FlowId,
    pub(crate) state: Arc<Mutex<FlowState>>,
}

impl FlowContext {
    /// Creates a fresh, empty flow.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: FlowId::new(),
            state: Arc::new(Mutex::new(FlowState::default())),
        }
    }

    /// The flow identifier.
    #[must_use]
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Returns a snapshot of the log.
    ///
    /// Waits for any cascade currently running in this flow to settle.
    pub async fn log(&self) -> FlowLog {
        let state = self.state.lock().await;
        FlowLog {
            id: self.id,
            records: state.log.clone(),
        }
    }

    /// Number of records in the log.
    pub async fn len(&self) -> usize {
        self.state.lock().await.log.len()
    }

    /// Returns true if nothing has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for FlowContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A snapshot of a flow's log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowLog {
    /// The flow identifier.
    pub id: FlowId,
    /// Records in append order.
    pub records: Vec<Arc<InvocationRecord>>,
}

impl FlowLog {
    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates records of one action.
    pub fn of<'a>(&'a self, action: &'a ActionRef) -> impl Iterator<Item = &'a InvocationRecord> + 'a {
        self.records
            .iter()
            .map(AsRef::as_ref)
            .filter(move |r| &r.action == action)
    }
}
