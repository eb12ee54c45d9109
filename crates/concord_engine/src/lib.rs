//! Synchronization engine for Concord.
//!
//! This crate provides:
//! - [`Vars`], [`Shape`], [`Pattern`] - Declarative rule primitives
//! - [`Frames`] - Binding relations with match, query join, filter, and map
//! - [`Concept`] - The contract for observed modules and their pure queries
//! - [`SyncEngine`] - Instrumentation, synchronization registry, and cascade evaluation
//!
//! # Example
//!
//! ```
//! use concord_engine::{actions, shape, ActionRef, Shape, SyncDescription, Vars};
//!
//! fn echo(vars: &mut Vars) -> SyncDescription {
//!     let text = vars.var("text");
//!     SyncDescription::new()
//!         .when(actions([(
//!             ActionRef::new("Input", "typed"),
//!             shape! { "text" => text },
//!             Shape::new(),
//!         )]))
//!         .then([(ActionRef::new("Output", "print"), shape! { "text" => text })])
//! }
//! # let _ = echo;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod concept;
pub mod config;
pub mod engine;
mod evaluator;
pub mod flow;
pub mod frames;
pub mod pattern;
pub mod registry;
pub mod sync;
pub mod vars;

pub use concept::{ActionFailure, ActionResult, Concept, ConceptQuery, Query, QueryFn, query_fn};
pub use config::{DEFAULT_MAX_FIRINGS, EngineConfig};
pub use engine::{Instrumented, SyncEngine};
pub use flow::{FlowContext, FlowLog, InvocationRecord};
pub use frames::{Frame, Frames};
pub use pattern::{IntoTerm, Pattern, Shape, Term, ThenAction, actions};
pub use registry::Registry;
pub use sync::{Step, SyncDescription, SyncFn, Synchronization, Where};
pub use vars::{Binding, Var, Vars};

pub use concord_foundation::{ActionRef, QueryRef};
