//! Error types for the Concord system.
//!
//! These are engine-level errors. Concept-level failures are ordinary data
//! (`{error: ...}` records) and never surface as [`Error`].

use std::fmt;

use thiserror::Error;

/// The main error type for Concord operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Which sync and flow were being evaluated, when known.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Wraps a kind with no context.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Attaches evaluation context.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an unknown concept error.
    #[must_use]
    pub fn unknown_concept(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownConcept(name.into()))
    }

    /// Creates an unknown action error.
    #[must_use]
    pub fn unknown_action(concept: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownAction {
            concept: concept.into(),
            action: action.into(),
        })
    }

    /// Creates an unknown query error.
    #[must_use]
    pub fn unknown_query(concept: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownQuery {
            concept: concept.into(),
            query: query.into(),
        })
    }

    /// Creates an unbound variable error.
    #[must_use]
    pub fn unbound_variable(variable: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnboundVariable(variable.into()))
    }

    /// Creates an invalid synchronization error.
    #[must_use]
    pub fn invalid_sync(sync: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSync {
            sync: sync.into(),
            message: message.into(),
        })
    }

    /// Creates a refinement (`where` clause) failure.
    #[must_use]
    pub fn refinement(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Refinement(message.into()))
    }

    /// The firing limit was hit.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }
}

/// Error categories, for matching in callers and tests.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// No concept is registered under this name.
    #[error("unknown concept: {0}")]
    UnknownConcept(String),

    /// The concept does not expose this action.
    #[error("unknown action: {concept}.{action}")]
    UnknownAction {
        /// The concept that was addressed.
        concept: String,
        /// The action name that was not found.
        action: String,
    },

    /// The concept does not expose this query.
    #[error("unknown query: {concept}.{query}")]
    UnknownQuery {
        /// The concept that was addressed.
        concept: String,
        /// The query name that was not found.
        query: String,
    },

    /// A concept name was instrumented twice.
    #[error("duplicate concept: {0}")]
    DuplicateConcept(String),

    /// A synchronization name was registered twice.
    #[error("duplicate synchronization: {0}")]
    DuplicateSync(String),

    /// A synchronization description is malformed.
    #[error("invalid synchronization {sync}: {message}")]
    InvalidSync {
        /// The synchronization name.
        sync: String,
        /// What is wrong with it.
        message: String,
    },

    /// A `where` query input referenced a variable with no binding.
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// A `where` refinement failed.
    #[error("refinement failed: {0}")]
    Refinement(String),

    /// A flow dispatched more `then` actions than allowed.
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),
}

/// Limits that stop a runaway cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// Maximum `then` dispatches within one rooting call exceeded.
    MaxFirings {
        /// The configured limit.
        limit: usize,
        /// The synchronization that attempted the dispatch over the limit.
        sync: Option<String>,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxFirings { limit, sync } => {
                write!(f, "max firings per call ({limit}) exceeded")?;
                if let Some(name) = sync {
                    write!(f, " in {name}")?;
                }
                Ok(())
            }
        }
    }
}

/// Where in evaluation an error was raised.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Synchronization being evaluated.
    pub sync: Option<String>,
    /// Flow being evaluated (display form).
    pub flow: Option<String>,
    /// Chain of dispatches leading to the error, outermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// An empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the synchronization name.
    #[must_use]
    pub fn with_sync(mut self, sync: impl Into<String>) -> Self {
        self.sync = Some(sync.into());
        self
    }

    /// Sets the flow.
    #[must_use]
    pub fn with_flow(mut self, flow: impl fmt::Display) -> Self {
        self.flow = Some(flow.to_string());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sync) = &self.sync {
            write!(f, "in sync {sync}")?;
        }
        if let Some(flow) = &self.flow {
            write!(f, " (flow {flow})")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  via {frame}")?;
            }
        }
        Ok(())
    }
}
