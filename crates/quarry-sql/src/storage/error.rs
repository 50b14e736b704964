//! Store error types.

use std::fmt;

use quarry_common::ExecutionError;

/// Store error type.
#[derive(Debug)]
pub enum StoreError {
    /// The store could not be opened or reached.
    Unreachable(String),
    /// The store rejected a statement as malformed.
    Malformed(String),
    /// The store refused the operation.
    PermissionDenied(String),
    /// A persisted schema could not be decoded, or a declared one is invalid.
    InvalidSchema {
        /// Table the schema belongs to.
        table: String,
        /// What is wrong with it.
        message: String,
    },
    /// Any other storage engine failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unreachable(msg) => write!(f, "Store unreachable: {}", msg),
            StoreError::Malformed(msg) => write!(f, "Malformed statement: {}", msg),
            StoreError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            StoreError::InvalidSchema { table, message } => {
                write!(f, "Invalid schema for table \"{}\": {}", table, message)
            }
            StoreError::Backend(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        let message = e.to_string();
        match e.sqlite_error_code() {
            Some(ErrorCode::CannotOpen | ErrorCode::NotADatabase) => StoreError::Unreachable(message),
            Some(
                ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
                | ErrorCode::AuthorizationForStatementDenied,
            ) => StoreError::PermissionDenied(message),
            // SQLITE_ERROR: syntax errors, missing tables and columns.
            Some(ErrorCode::Unknown) => StoreError::Malformed(message),
            _ => StoreError::Backend(message),
        }
    }
}

impl From<StoreError> for ExecutionError {
    fn from(e: StoreError) -> Self {
        let message = e.to_string();
        match e {
            StoreError::Unreachable(_) => ExecutionError::Unreachable(message),
            StoreError::Malformed(_) => ExecutionError::MalformedStatement(message),
            StoreError::PermissionDenied(_) => ExecutionError::PermissionDenied(message),
            StoreError::InvalidSchema { .. } | StoreError::Backend(_) => ExecutionError::Store(message),
        }
    }
}

/// Store result type.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::InvalidSchema {
            table: "Books".to_string(),
            message: "bad blob".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid schema for table \"Books\": bad blob");
    }

    #[test]
    fn test_into_execution_error() {
        let err: ExecutionError = StoreError::Malformed("near \"FROM\"".to_string()).into();
        assert!(matches!(err, ExecutionError::MalformedStatement(ref m) if m.contains("near")));

        let err: ExecutionError = StoreError::Unreachable("gone".to_string()).into();
        assert!(matches!(err, ExecutionError::Unreachable(_)));

        let err: ExecutionError = StoreError::Backend("disk full".to_string()).into();
        assert!(matches!(err, ExecutionError::Store(_)));
    }

    #[test]
    fn test_from_rusqlite_syntax_error() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn.execute_batch("SELEC 1").unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Malformed(_)));
    }
}
