//! Rendering trace records as text.

use std::fmt::Write;

use crate::record::{TraceEvent, TraceRecord};

/// Renders one trace record as one line.
pub trait TraceFormatter {
    /// Formats a single trace record to a single line.
    fn format(&self, record: &TraceRecord) -> String;

    /// Formats multiple records, one per line.
    fn format_many(&self, records: &[&TraceRecord]) -> String {
        records
            .iter()
            .map(|r| self.format(r))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The default line format used for stderr and `tracing` output.
#[derive(Clone, Debug, Default)]
pub struct HumanFormatter {
    /// Prefix each line with the time since the tracer started.
    pub show_timestamps: bool,
    /// Prefix each line with the buffer record id.
    pub show_ids: bool,
}

impl HumanFormatter {
    /// A formatter that prints only the event line.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the elapsed-time prefix.
    #[must_use]
    pub fn with_timestamps(mut self) -> Self {
        self.show_timestamps = true;
        self
    }

    /// Adds the record id prefix.
    #[must_use]
    pub fn with_ids(mut self) -> Self {
        self.show_ids = true;
        self
    }

    /// Elapsed time in the largest unit that keeps it readable.
    #[allow(clippy::cast_precision_loss)]
    fn format_timestamp(ns: u64) -> String {
        let us = ns / 1000;
        if us >= 1_000_000 {
            format!("{:.3}s", us as f64 / 1_000_000.0)
        } else if us >= 1000 {
            format!("{:.3}ms", us as f64 / 1000.0)
        } else {
            format!("{us}us")
        }
    }

    /// Renders only the event body, without prefix.
    #[must_use]
    pub fn event_line(event: &TraceEvent) -> String {
        match event {
            TraceEvent::Invocation {
                seq,
                action,
                input,
                output,
                ..
            } => format!("#{seq} {action} {input} => {output}"),
            TraceEvent::MatchAttempt {
                sync, seq, matched, ..
            } => format!("  ?{sync} on #{seq}: {matched} match(es)"),
            TraceEvent::Refined { sync, frames, .. } => {
                let rows: Vec<String> = frames
                    .iter()
                    .map(|row| {
                        let bindings: Vec<String> =
                            row.iter().map(|(k, v)| format!("{k}={v}")).collect();
                        format!("{{{}}}", bindings.join(", "))
                    })
                    .collect();
                format!("  ={sync} frames [{}]", rows.join(", "))
            }
            TraceEvent::Dispatch {
                sync,
                action,
                input,
                ..
            } => format!("  !{sync} -> {action} {input}"),
            TraceEvent::BindingDefect {
                sync,
                action,
                variable,
                ..
            } => format!("  DEFECT {sync}: {action} skipped, ?{variable} unbound"),
            TraceEvent::RefinementFailed { sync, message, .. } => {
                format!("  FAILED {sync}: {message}")
            }
            TraceEvent::FlowSettled { records, .. } => {
                format!("settled after {records} record(s)")
            }
            TraceEvent::LimitExceeded { limit, .. } => {
                format!("  HALTED: max firings ({limit}) exceeded")
            }
        }
    }
}

impl TraceFormatter for HumanFormatter {
    fn format(&self, record: &TraceRecord) -> String {
        let mut prefix = String::new();

        if self.show_ids {
            let _ = write!(prefix, "[{:06}] ", record.id);
        }

        let _ = write!(prefix, "flow {} ", record.event.flow());

        if self.show_timestamps {
            let _ = write!(
                prefix,
                "{:>10} ",
                Self::format_timestamp(record.timestamp_ns)
            );
        }

        format!("{prefix}{}", Self::event_line(&record.event))
    }
}
