use thiserror::Error;

/// Rule violations detected before anything reaches the store.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("project `{id}` does not exist")]
    UnknownProject { id: i32 },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
