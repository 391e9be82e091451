//! Error types for the solver driver.

use thiserror::Error;

/// Failures of the solving machinery itself. Unsatisfiability and timeouts
/// are ordinary [`crate::Outcome`]s and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// The backend rejected a clause or failed to solve.
    #[error("SAT backend failed: {0}")]
    Backend(String),

    /// The worker thread is gone, usually after a panic.
    #[error("solver session is no longer available: {0}")]
    Disconnected(String),

    /// A solve on a session whose earlier solve timed out.
    #[error("solver session timed out earlier and cannot be reused")]
    Abandoned,
}
