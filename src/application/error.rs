use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{application::repos::RepoError, domain::error::DomainError, infra::error::InfraError};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failure of an application service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// The store could not be reached or did not answer in time.
    #[error("store unavailable: {0}")]
    StoreUnavailable(RepoError),
    /// The store answered but refused the operation.
    #[error("store rejected the operation: {0}")]
    StoreRejected(RepoError),
}

impl From<RepoError> for ServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Persistence(_) | RepoError::Timeout => Self::StoreUnavailable(err),
            RepoError::NotFound | RepoError::InvalidInput { .. } | RepoError::Integrity { .. } => {
                Self::StoreRejected(err)
            }
        }
    }
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::validation(message))
    }
}

/// Process-level failure reported by the binary before exiting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct Outer(RepoError);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("listing failed")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn store_refusals_are_not_reported_as_outages() {
        let error = ServiceError::from(RepoError::InvalidInput {
            message: "insert or update on table \"tasks\" violates foreign key constraint".into(),
        });
        assert!(matches!(error, ServiceError::StoreRejected(_)));
        assert!(!error.to_string().contains("unavailable"));

        let error = ServiceError::from(RepoError::Integrity {
            message: "duplicate key".into(),
        });
        assert_eq!(
            error.to_string(),
            "store rejected the operation: integrity error: duplicate key"
        );
    }

    #[test]
    fn report_walks_the_source_chain() {
        let error = Outer(RepoError::Timeout);
        let report = ErrorReport::from_error("test", StatusCode::SERVICE_UNAVAILABLE, &error);
        assert_eq!(report.messages, vec!["listing failed", "database timeout"]);
    }

    #[test]
    fn repo_failures_read_as_store_unavailable() {
        let error = ServiceError::from(RepoError::from_persistence("connection reset"));
        assert_eq!(
            error.to_string(),
            "store unavailable: persistence error: connection reset"
        );
        assert!(matches!(
            ServiceError::from(RepoError::Timeout),
            ServiceError::StoreUnavailable(RepoError::Timeout)
        ));
        assert!(matches!(
            ServiceError::validation("title is required"),
            ServiceError::Domain(DomainError::Validation { .. })
        ));
    }
}
