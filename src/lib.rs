//! Concord - Reactive synchronization of independent concepts
//!
//! This crate re-exports all layers of the Concord system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: concord_engine     — Vars, patterns, frames, instrumentation, evaluation
//! Layer 1: concord_debug      — Trace levels, trace events, ring buffer, formatters
//! Layer 0: concord_foundation — Core types (Value, Record, ActionRef, FlowId, Error)
//! ```

pub use concord_debug as debug;
pub use concord_engine as engine;
pub use concord_foundation as foundation;
