//! Error types for the tableau core.
//!
//! The four kinds map directly onto the error taxonomy: clashes during
//! rule application are never errors (they drive backtracking), only the
//! conditions below are.

use thiserror::Error;

/// Kernel-level error type.
#[derive(Error, Debug)]
pub enum KernelError {
    /// The knowledge base was found (or is known to be) unsatisfiable.
    /// Once raised, subsequent queries are expected to answer `YES`
    /// trivially rather than re-raise this.
    #[error("inconsistent knowledge base: {0}")]
    InconsistentKb(String),

    /// The axiom stream uses a construct the core cannot decide, or an
    /// internal precondition that the source treats as an assertion
    /// failure is surfaced here instead of aborting.
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// The cooperative timeout fired; no side effects on the KB remain.
    #[error("operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// A non-recoverable invariant violation.
    #[error("internal invariant violation: {0}")]
    Internal(String),

    /// `newKB` called while a KB is already open.
    #[error("a knowledge base is already open")]
    KbAlreadyOpen,

    /// An operation that requires an open KB was called without one.
    #[error("no knowledge base is open")]
    NoOpenKb,

    /// Invalid IRI supplied to the front end.
    #[error("invalid IRI: {0}")]
    InvalidIri(String),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
