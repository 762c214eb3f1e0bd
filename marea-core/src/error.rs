/// Domain error taxonomy shared by the dispatch engine and the API layer.
///
/// Lifecycle guard failures surface immediately as the matching variant with
/// no automatic retry; callers re-poll or resubmit.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Store(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DomainError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        DomainError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        DomainError::Conflict(msg.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
