//! Error type returned by the application services.
//!
//! Handlers map each variant onto one HTTP status (see `server.rs`);
//! the CLI prints the `Display` form.

use larder_core::UpstreamError;

#[derive(Debug)]
pub enum ServiceError {
    /// Bad caller input. Nothing was changed.
    Validation(String),
    /// An upload exceeded the configured size limit.
    TooLarge { limit: usize },
    /// The referenced record does not exist.
    NotFound(String),
    /// An external capability failed or timed out.
    Upstream(UpstreamError),
    /// Storage or other plumbing failure.
    Internal(anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        ServiceError::NotFound(format!("{} not found: {}", what, id))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Validation(msg) => write!(f, "{}", msg),
            ServiceError::TooLarge { limit } => {
                write!(f, "File too large. Maximum size is {} bytes", limit)
            }
            ServiceError::NotFound(msg) => write!(f, "{}", msg),
            ServiceError::Upstream(e) => write!(f, "{}", e),
            ServiceError::Internal(e) => write!(f, "internal error: {:#}", e),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<anyhow::Error> for ServiceError {
    fn from(e: anyhow::Error) -> Self {
        ServiceError::Internal(e)
    }
}

impl From<UpstreamError> for ServiceError {
    fn from(e: UpstreamError) -> Self {
        ServiceError::Upstream(e)
    }
}
