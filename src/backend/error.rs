use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

/// Why a backend round-trip did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("no authenticated session")]
    Unauthorized,
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("backend unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("request rejected: {reason}")]
    Rejected { reason: String },
}

impl BackendError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Stable code safe to log and to surface in status snapshots.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "BACKEND_UNAUTHORIZED",
            Self::NotFound { .. } => "BACKEND_NOT_FOUND",
            Self::Unavailable { .. } => "BACKEND_UNAVAILABLE",
            Self::Timeout { .. } => "BACKEND_TIMEOUT",
            Self::Rejected { .. } => "BACKEND_REJECTED",
        }
    }
}
