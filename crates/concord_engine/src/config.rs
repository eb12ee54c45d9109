//! Configuration for a synchronization engine instance.

use concord_debug::{TraceLevel, TraceOutput, TracerConfig};

/// Default bound on `then` dispatches within one flow.
pub const DEFAULT_MAX_FIRINGS: usize = 10_000;

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
///
/// Controls tracing, the firing kill switch, and flow retention.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Initial trace level (changeable later at runtime).
    pub trace_level: TraceLevel,

    /// Where admitted trace lines are written.
    pub trace_output: TraceOutput,

    /// Trace ring buffer size (number of records to retain).
    pub trace_buffer_size: usize,

    /// Maximum `then` dispatches caused by one rooting call before its cascade
    /// is halted. The count starts over with every call, so long-lived flows
    /// are not worn down by earlier cascades.
    pub max_firings_per_call: usize,

    /// Number of settled flow logs to keep for inspection.
    pub retained_flows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trace_level: TraceLevel::Off,
            trace_output: TraceOutput::Log,
            trace_buffer_size: 10_000,
            max_firings_per_call: DEFAULT_MAX_FIRINGS,
            retained_flows: 0,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration for development: one line per invocation on stderr.
    #[must_use]
    pub fn development() -> Self {
        Self {
            trace_level: TraceLevel::Trace,
            trace_output: TraceOutput::Stderr,
            ..Self::default()
        }
    }

    /// Creates a configuration for debugging: match attempts and frames too,
    /// with recent flows retained.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            trace_level: TraceLevel::Verbose,
            trace_output: TraceOutput::Stderr,
            trace_buffer_size: 50_000,
            retained_flows: 16,
            ..Self::default()
        }
    }

    /// Builder method to set the trace level.
    #[must_use]
    pub fn with_trace_level(mut self, level: TraceLevel) -> Self {
        self.trace_level = level;
        self
    }

    /// Builder method to set the trace output.
    #[must_use]
    pub fn with_trace_output(mut self, output: TraceOutput) -> Self {
        self.trace_output = output;
        self
    }

    /// Builder method to set the trace buffer size.
    #[must_use]
    pub fn with_trace_buffer_size(mut self, size: usize) -> Self {
        self.trace_buffer_size = size;
        self
    }

    /// Builder method to set the firing limit.
    #[must_use]
    pub fn with_max_firings(mut self, limit: usize) -> Self {
        self.max_firings_per_call = limit;
        self
    }

    /// Builder method to set how many settled flows are retained.
    #[must_use]
    pub fn with_retained_flows(mut self, count: usize) -> Self {
        self.retained_flows = count;
        self
    }

    /// The tracer configuration derived from this one.
    #[must_use]
    pub fn tracer(&self) -> TracerConfig {
        TracerConfig::new()
            .with_level(self.trace_level)
            .with_buffer_size(self.trace_buffer_size)
            .with_output(self.trace_output)
    }
}
