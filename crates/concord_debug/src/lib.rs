//! Tracing and trace formatting for Concord.
//!
//! This crate provides:
//! - [`TraceLevel`] - `Off`, `Trace`, and `Verbose` reporting levels
//! - [`Tracer`] - Per-engine trace sink with a bounded [`TraceBuffer`]
//! - [`HumanFormatter`] - Single-line rendering of trace records
//!
//! Tracing is strictly observational. The level is held by each engine's
//! own `Tracer`, so concurrent engines (and concurrent tests) never share it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod buffer;
pub mod format;
pub mod level;
pub mod record;

pub use buffer::{TraceBuffer, TraceBufferStats};
pub use format::{HumanFormatter, TraceFormatter};
pub use level::{ParseTraceLevelError, TraceLevel};
pub use record::{TraceEvent, TraceRecord};

use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

// =============================================================================
// Trace Output
// =============================================================================

/// Where admitted trace lines are written, in addition to the buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceOutput {
    /// Buffer only.
    None,
    /// Write lines to stderr.
    Stderr,
    /// Emit lines through the `tracing` crate under target `concord::trace`.
    #[default]
    Log,
}

// =============================================================================
// Tracer Configuration
// =============================================================================

/// How a [`Tracer`] starts out.
#[derive(Clone, Debug)]
pub struct TracerConfig {
    /// Initial trace level.
    pub level: TraceLevel,
    /// Capacity of the trace buffer.
    pub buffer_size: usize,
    /// Where admitted lines are written.
    pub output: TraceOutput,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            level: TraceLevel::Off,
            buffer_size: 10000,
            output: TraceOutput::Log,
        }
    }
}

impl TracerConfig {
    /// The default configuration: off, logged through `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the level.
    #[must_use]
    pub fn with_level(mut self, level: TraceLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the buffer capacity.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Builder method to set the output destination.
    #[must_use]
    pub fn with_output(mut self, output: TraceOutput) -> Self {
        self.output = output;
        self
    }
}

// =============================================================================
// Tracer
// =============================================================================

/// Records trace events for one engine instance.
///
/// Safe to share across concurrently running flows. The level can be read
/// and changed at any time; `record` returns immediately when the level
/// does not admit the event.
pub struct Tracer {
    level: AtomicU8,
    output: TraceOutput,
    buffer: Mutex<TraceBuffer>,
    start_time: Instant,
}

impl Tracer {
    /// Creates a tracer.
    #[must_use]
    pub fn new(config: TracerConfig) -> Self {
        Self {
            level: AtomicU8::new(config.level as u8),
            output: config.output,
            buffer: Mutex::new(TraceBuffer::new(config.buffer_size)),
            start_time: Instant::now(),
        }
    }

    /// Creates a tracer with default configuration (off).
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(TracerConfig::default())
    }

    /// Returns the current level.
    #[must_use]
    pub fn level(&self) -> TraceLevel {
        TraceLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Sets the current level.
    pub fn set_level(&self, level: TraceLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Returns true if events at `level` would currently be recorded.
    #[must_use]
    #[inline]
    pub fn admits(&self, level: TraceLevel) -> bool {
        self.level().admits(level)
    }

    /// Offers an event to the tracer.
    ///
    /// Defect events are always logged (the kill switch at error level, the
    /// rest at warn). Everything else is dropped unless the current level
    /// admits it.
    pub fn record(&self, event: TraceEvent) {
        if event.is_defect() {
            let line = HumanFormatter::event_line(&event);
            let flow = event.flow();
            if matches!(event, TraceEvent::LimitExceeded { .. }) {
                tracing::error!(target: "concord::engine", flow = %flow, "{}", line.trim_start());
            } else {
                tracing::warn!(target: "concord::engine", flow = %flow, "{}", line.trim_start());
            }
        }

        if !self.admits(event.level()) {
            return;
        }

        self.record_internal(event);
    }

    fn record_internal(&self, event: TraceEvent) {
        #[allow(clippy::cast_possible_truncation)]
        let timestamp_ns = self.start_time.elapsed().as_nanos() as u64;

        let line = match self.output {
            TraceOutput::None => None,
            TraceOutput::Stderr | TraceOutput::Log => {
                Some(HumanFormatter::event_line(&event))
            }
        };
        let flow = event.flow();
        let defect = event.is_defect();

        self.buffer.lock().push(timestamp_ns, event);

        match (self.output, line) {
            (TraceOutput::Stderr, Some(line)) => {
                let _ = writeln!(io::stderr(), "flow {flow} {line}");
            }
            // Defects already went out at warn level above
            (TraceOutput::Log, Some(line)) if !defect => {
                tracing::info!(target: "concord::trace", flow = %flow, "{line}");
            }
            _ => {}
        }
    }

    /// Returns a snapshot of the buffered records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<TraceRecord> {
        self.buffer.lock().iter().cloned().collect()
    }

    /// Formats the buffered records with the given formatter.
    #[must_use]
    pub fn lines(&self, formatter: &dyn TraceFormatter) -> Vec<String> {
        self.buffer.lock().iter().map(|r| formatter.format(r)).collect()
    }

    /// Runs `f` against the buffer while holding its lock.
    pub fn with_buffer<R>(&self, f: impl FnOnce(&TraceBuffer) -> R) -> R {
        f(&self.buffer.lock())
    }

    /// Drops every buffered record.
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    /// Summarizes the buffered records.
    #[must_use]
    pub fn stats(&self) -> TraceBufferStats {
        self.buffer.lock().stats()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("level", &self.level())
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
