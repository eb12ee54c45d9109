//! Trace event and record types.
//!
//! This module defines the events that can be traced while flows are
//! recorded and synchronizations evaluated.

use std::sync::Arc;

use concord_foundation::{ActionRef, FlowId, Record, Value};

use crate::level::TraceLevel;

// =============================================================================
// Trace Event
// =============================================================================

/// Events that can be traced during flow execution.
#[derive(Clone, Debug)]
pub enum TraceEvent {
    /// An action invocation was appended to a flow log.
    Invocation {
        /// The flow the record belongs to.
        flow: FlowId,
        /// Sequence number within the flow.
        seq: u64,
        /// The action that ran.
        action: ActionRef,
        /// Concrete input.
        input: Record,
        /// Concrete output (possibly an `{error}` record).
        output: Record,
    },

    /// A synchronization's `when` clause was matched against a new record.
    MatchAttempt {
        /// The flow being evaluated.
        flow: FlowId,
        /// The synchronization.
        sync: Arc<str>,
        /// Sequence number of the record that triggered evaluation.
        seq: u64,
        /// Number of frames produced by matching.
        matched: usize,
    },

    /// Frames surviving a synchronization's `where` refinement.
    Refined {
        /// The flow being evaluated.
        flow: FlowId,
        /// The synchronization.
        sync: Arc<str>,
        /// One entry per frame: variable name to bound value.
        frames: Vec<Vec<(String, Value)>>,
    },

    /// A `then` entry is being dispatched.
    Dispatch {
        /// The flow being evaluated.
        flow: FlowId,
        /// The synchronization that fired.
        sync: Arc<str>,
        /// The target action.
        action: ActionRef,
        /// The resolved input.
        input: Record,
    },

    /// A `then` entry referenced a variable with no binding and was skipped.
    BindingDefect {
        /// The flow being evaluated.
        flow: FlowId,
        /// The synchronization.
        sync: Arc<str>,
        /// The target action that was skipped.
        action: ActionRef,
        /// The unbound variable.
        variable: String,
    },

    /// A `where` refinement failed; the firing was abandoned.
    RefinementFailed {
        /// The flow being evaluated.
        flow: FlowId,
        /// The synchronization.
        sync: Arc<str>,
        /// Failure description.
        message: String,
    },

    /// A flow's cascade reached its fixpoint.
    FlowSettled {
        /// The settled flow.
        flow: FlowId,
        /// Total records in its log.
        records: usize,
    },

    /// A flow hit the firing kill switch.
    LimitExceeded {
        /// The flow that was cut off.
        flow: FlowId,
        /// The configured limit.
        limit: usize,
    },
}

impl TraceEvent {
    /// Returns a short name for the event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Invocation { .. } => "invocation",
            Self::MatchAttempt { .. } => "match-attempt",
            Self::Refined { .. } => "refined",
            Self::Dispatch { .. } => "dispatch",
            Self::BindingDefect { .. } => "binding-defect",
            Self::RefinementFailed { .. } => "refinement-failed",
            Self::FlowSettled { .. } => "flow-settled",
            Self::LimitExceeded { .. } => "limit-exceeded",
        }
    }

    /// The minimum trace level at which this event is emitted.
    #[must_use]
    pub fn level(&self) -> TraceLevel {
        match self {
            Self::Invocation { .. }
            | Self::BindingDefect { .. }
            | Self::RefinementFailed { .. }
            | Self::LimitExceeded { .. } => TraceLevel::Trace,
            Self::MatchAttempt { .. }
            | Self::Refined { .. }
            | Self::Dispatch { .. }
            | Self::FlowSettled { .. } => TraceLevel::Verbose,
        }
    }

    /// The flow this event belongs to.
    #[must_use]
    pub fn flow(&self) -> FlowId {
        match self {
            Self::Invocation { flow, .. }
            | Self::MatchAttempt { flow, .. }
            | Self::Refined { flow, .. }
            | Self::Dispatch { flow, .. }
            | Self::BindingDefect { flow, .. }
            | Self::RefinementFailed { flow, .. }
            | Self::FlowSettled { flow, .. }
            | Self::LimitExceeded { flow, .. } => *flow,
        }
    }

    /// Returns true if this event reports an engine defect.
    #[must_use]
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::BindingDefect { .. } | Self::RefinementFailed { .. } | Self::LimitExceeded { .. }
        )
    }
}

// =============================================================================
// Trace Record
// =============================================================================

/// A recorded trace event with metadata.
#[derive(Clone, Debug)]
pub struct TraceRecord {
    /// Unique record ID (monotonically increasing).
    pub id: u64,
    /// Nanoseconds since the tracer started.
    pub timestamp_ns: u64,
    /// The traced event.
    pub event: TraceEvent,
}

impl TraceRecord {
    /// Creates a new trace record.
    #[must_use]
    pub fn new(id: u64, timestamp_ns: u64, event: TraceEvent) -> Self {
        Self {
            id,
            timestamp_ns,
            event,
        }
    }

    /// Returns the event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}
