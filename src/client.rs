//! The SQL execution seam.
//!
//! Connection management, authentication and retries belong to whatever
//! implements [`Client`]. This crate only hands it rendered statements and reads
//! back rows. Cancellation is by dropping the returned future.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A single result row keyed by lower-case column name.
pub type Row = Map<String, Value>;

/// Platform error code for "object does not exist or not authorized".
pub const OBJECT_NOT_FOUND_CODE: i32 = 2003;

const OBJECT_NOT_FOUND_MESSAGE: &str = "does not exist or not authorized";

/// Executes rendered SQL against the platform's control API.
#[async_trait]
pub trait Client: Send + Sync {
    /// Execute a statement that returns no rows (CREATE, ALTER, DROP).
    async fn exec(&self, sql: &str) -> Result<(), ClientError>;

    /// Execute a statement and collect its rows (SHOW, DESCRIBE).
    async fn query(&self, sql: &str) -> Result<Vec<Row>, ClientError>;
}

#[async_trait]
impl<C: Client + ?Sized> Client for &C {
    async fn exec(&self, sql: &str) -> Result<(), ClientError> {
        (**self).exec(sql).await
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>, ClientError> {
        (**self).query(sql).await
    }
}

#[async_trait]
impl<C: Client + ?Sized> Client for std::sync::Arc<C> {
    async fn exec(&self, sql: &str) -> Result<(), ClientError> {
        (**self).exec(sql).await
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>, ClientError> {
        (**self).query(sql).await
    }
}

/// Errors reported by a [`Client`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The transport already classified the failure as a missing object.
    #[error("object does not exist or not authorized: {0}")]
    ObjectNotFound(String),

    /// The statement reached the platform and failed there.
    #[error("SQL execution error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Execution {
        /// Platform error code, when one was returned.
        code: Option<i32>,
        /// Platform error message.
        message: String,
    },

    /// The statement never reached the platform.
    #[error("connection error: {0}")]
    Connection(String),
}

impl ClientError {
    /// Create an execution error carrying a platform error code.
    pub fn execution(code: i32, message: impl Into<String>) -> Self {
        Self::Execution {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Whether this error means the object is absent, however the transport
    /// chose to signal it.
    pub fn is_object_not_found(&self) -> bool {
        match self {
            Self::ObjectNotFound(_) => true,
            Self::Execution { code, message } => {
                *code == Some(OBJECT_NOT_FOUND_CODE) || message.contains(OBJECT_NOT_FOUND_MESSAGE)
            },
            Self::Connection(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(ClientError::ObjectNotFound("X".to_string()).is_object_not_found());
        assert!(ClientError::execution(2003, "whatever").is_object_not_found());
        assert!(ClientError::Execution {
            code: None,
            message: "Notification contact 'X' does not exist or not authorized.".to_string(),
        }
        .is_object_not_found());

        assert!(!ClientError::execution(1003, "syntax error").is_object_not_found());
        assert!(!ClientError::Connection("reset by peer".to_string()).is_object_not_found());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ClientError::execution(1003, "syntax error").to_string(),
            "SQL execution error 1003: syntax error"
        );
        assert_eq!(
            ClientError::Execution {
                code: None,
                message: "boom".to_string()
            }
            .to_string(),
            "SQL execution error: boom"
        );
    }
}
