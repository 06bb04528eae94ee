use thiserror::Error;

/// Failures that stop a processing run from being created.
///
/// Executor failures are not listed here: they stay attached to the task
/// that produced them (see [`crate::schedule::TaskError`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Unresolvable reference: {0}")]
    UnresolvableReference(String),

    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Run already in progress: {0}")]
    RunInProgress(String),
}

impl AgentError {
    pub fn metadata_unavailable(reason: impl Into<String>) -> Self {
        Self::MetadataUnavailable(reason.into())
    }

    pub fn invalid_selection(reason: impl Into<String>) -> Self {
        Self::InvalidSelection(reason.into())
    }

    /// Stable machine-readable code used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnresolvableReference(_) => "UnresolvableReference",
            Self::MetadataUnavailable(_) => "MetadataUnavailable",
            Self::InvalidSelection(_) => "InvalidSelection",
            Self::RunInProgress(_) => "RunInProgress",
        }
    }
}
