//! # Error Types
//!
//! Errors here fall into two layers that must never blur together:
//!
//! - [`ComposeError`]: the interpreter does not *cover* the program. These are
//!   structural problems, detected when interpreters are combined or before
//!   the first operation of a run executes — never mid-run for an operation
//!   that was visible when the run started.
//! - [`RunError`]: a run that started cleanly still failed — a capability
//!   implementation refused an operation, a value crossed a boundary with the
//!   wrong type, or the execution context itself broke.
//!
//! Capability implementations report failure with [`OperationError`]; the
//! engine wraps it with the operation name so the caller sees exactly one
//! error value per failed run.

use thiserror::Error;

/// Failure raised by a capability implementation while handling an operation.
///
/// This is the only error type a [`Handles`](crate::Handles) implementation
/// produces; the engine attaches the operation name when it propagates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct OperationError {
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl OperationError {
    /// Create an operation failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Structural mismatch between a program and the interpreters composed for it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// The program references an operation no interpreter covers.
    #[error("no interpreter covers operation `{operation}`")]
    MissingHandler { operation: &'static str },

    /// Two interpreters claim the same operation. Rejected so that the order
    /// in which interpreters are combined can never change semantics.
    #[error("operation `{operation}` is covered by more than one interpreter")]
    DuplicateHandler { operation: &'static str },
}

/// The single error value a run yields.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A capability implementation could not complete an operation.
    #[error("operation `{operation}` failed: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: OperationError,
    },

    /// The program and the interpreter do not fit together.
    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// A value crossed an operation boundary with an unexpected type.
    #[error("operation `{operation}` value did not have the expected type")]
    TypeMismatch { operation: &'static str },

    /// The execution context itself failed (e.g. a worker task panicked).
    #[error("execution context failure: {reason}")]
    Context { reason: String },
}

impl RunError {
    /// Wrap a capability failure with the operation that raised it.
    pub fn operation(operation: &'static str, source: OperationError) -> Self {
        Self::Operation { operation, source }
    }
}
