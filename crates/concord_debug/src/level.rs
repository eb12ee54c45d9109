//! Trace verbosity levels.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// How much the engine reports about its own execution.
///
/// Levels are strictly observational: changing the level never changes
/// which synchronizations fire or what they bind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TraceLevel {
    /// Nothing is traced.
    #[default]
    Off = 0,
    /// One line per recorded action invocation, plus engine defects.
    Trace = 1,
    /// Additionally, every synchronization match attempt and its frames.
    Verbose = 2,
}

impl TraceLevel {
    /// Returns true if an event at `event_level` should be emitted under `self`.
    #[must_use]
    #[inline]
    pub fn admits(self, event_level: TraceLevel) -> bool {
        self != Self::Off && event_level <= self
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Off,
            1 => Self::Trace,
            _ => Self::Verbose,
        }
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Trace => write!(f, "trace"),
            Self::Verbose => write!(f, "verbose"),
        }
    }
}

/// Error returned when parsing an unrecognized trace level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown trace level: {0} (expected off, trace, or verbose)")]
pub struct ParseTraceLevelError(String);

impl FromStr for TraceLevel {
    type Err = ParseTraceLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "0" => Ok(Self::Off),
            "trace" | "1" => Ok(Self::Trace),
            "verbose" | "2" => Ok(Self::Verbose),
            other => Err(ParseTraceLevelError(other.to_string())),
        }
    }
}
