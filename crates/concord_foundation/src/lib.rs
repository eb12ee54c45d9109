//! Core values, records, identifiers, and errors for Concord.
//!
//! This crate provides:
//! - [`Value`] - The concrete value type carried by action inputs and outputs
//! - [`Record`] - Persistent field maps used as action/query arguments and results
//! - [`ActionRef`], [`QueryRef`], [`FlowId`] - Identifiers for concept methods and flows
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod error;
pub mod ids;
pub mod value;

pub use collections::Record;
pub use error::{Error, ErrorContext, ErrorKind, SemanticLimit};
pub use ids::{ActionRef, FlowId, QueryRef};
pub use value::Value;

/// Result type alias using Concord's Error type.
pub type Result<T> = std::result::Result<T, Error>;
