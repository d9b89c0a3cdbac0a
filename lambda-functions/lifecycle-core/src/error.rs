use aws_sdk_ecs::error::DisplayErrorContext;
use thiserror::Error;

/// A failed call to one of the managed services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct ApiError {
    pub operation: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    /// Renders an SDK error with its full source chain. The plain `Display`
    /// of `SdkError` is just "service error", which is useless in logs.
    pub fn from_sdk<E>(operation: &'static str, err: E) -> Self
    where
        E: std::error::Error,
    {
        Self::new(operation, DisplayErrorContext(err).to_string())
    }
}
