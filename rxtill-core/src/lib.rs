pub mod catalog;
pub mod identity;
pub mod payment;
pub mod pricing;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Boxed error type used across collaborator traits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
