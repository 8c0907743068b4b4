//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Malformed input. Always raised before any state is touched.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission denied: consultation {0} belongs to another owner")]
    PermissionDenied(String),

    /// Caller may recover by starting a new consultation.
    #[error("Consultation {0} is closed")]
    ConsultationClosed(String),

    #[error("Consultation {0} not found")]
    NotFound(String),

    /// Classifier hint source down or timed out. Absorbed by the triage service.
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Repository error: {0}")]
    Repo(String),

    #[error("Facility catalog error: {0}")]
    Catalog(String),

    /// Interactive terminal could not read input.
    #[error("Terminal error: {0}")]
    Terminal(String),
}
