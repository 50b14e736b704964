//! Query pipeline error types.
//!
//! Compile errors always name the offending identifier or clause and are
//! never partially applied. Execution errors carry the store's message
//! verbatim. Format errors are meant to be shown to the person who wrote
//! the query.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and are stable
/// across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Compile errors (0x0100 - 0x01FF)
    /// A table named in the query is not declared.
    UnknownTable = 0x0100,
    /// A field named in the query does not exist.
    UnknownField = 0x0101,
    /// A bare field name matches several tables.
    AmbiguousField = 0x0102,
    /// A clause failed validation.
    InvalidClause = 0x0103,
    /// A display parameter is both global and query-specific.
    ConflictingParameter = 0x0104,
    /// A stored schema could not be loaded.
    SchemaLoad = 0x0105,

    // Execution errors (0x0200 - 0x02FF)
    /// The store could not be reached.
    StoreUnreachable = 0x0200,
    /// The store rejected the generated statement.
    MalformedStatement = 0x0201,
    /// The store refused access.
    PermissionDenied = 0x0202,
    /// Any other store failure.
    StoreFailure = 0x0203,

    // Format errors (0x0300 - 0x03FF)
    /// Nothing to display.
    NoResults = 0x0300,
    /// A field the format requires is missing.
    MissingField = 0x0301,
    /// A display parameter was supplied in an unusable form.
    InvalidParameter = 0x0302,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x01 => "Compile",
            0x02 => "Execution",
            0x03 => "Format",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Errors raised while compiling DSL clauses into a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A table in `tables=` is not declared.
    #[error("table \"{table}\" does not exist")]
    UnknownTable {
        /// The unresolved table name.
        table: String,
    },

    /// A field in `fields=` does not exist in any of the queried tables.
    #[error("field \"{field}\" was not found in the queried tables")]
    UnknownField {
        /// The unresolved field reference.
        field: String,
    },

    /// A bare field name exists in more than one of the queried tables.
    #[error("field \"{field}\" exists in more than one table; qualify it as Table.{field}")]
    AmbiguousField {
        /// The ambiguous field name.
        field: String,
    },

    /// A clause failed validation.
    #[error("invalid \"{clause}\" clause: {message}")]
    InvalidClause {
        /// The clause key, e.g. `where` or `join on`.
        clause: String,
        /// What is wrong with it.
        message: String,
    },

    /// A compound query used one parameter name both globally and per query.
    #[error("\"{name}\" cannot be used as both a query-specific parameter and an overall display parameter")]
    ConflictingParameter {
        /// The conflicting parameter name.
        name: String,
    },

    /// The stored schema of a table could not be read or decoded.
    #[error("invalid field information found for table \"{table}\": {message}")]
    SchemaLoad {
        /// The table whose schema failed to load.
        table: String,
        /// Underlying reason.
        message: String,
    },
}

impl CompileError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownTable { .. } => ErrorCode::UnknownTable,
            Self::UnknownField { .. } => ErrorCode::UnknownField,
            Self::AmbiguousField { .. } => ErrorCode::AmbiguousField,
            Self::InvalidClause { .. } => ErrorCode::InvalidClause,
            Self::ConflictingParameter { .. } => ErrorCode::ConflictingParameter,
            Self::SchemaLoad { .. } => ErrorCode::SchemaLoad,
        }
    }

    /// Creates an unknown table error.
    #[must_use]
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }

    /// Creates an unknown field error.
    #[must_use]
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    /// Creates an invalid clause error.
    #[must_use]
    pub fn invalid_clause(clause: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidClause {
            clause: clause.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the store while running a compiled statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The store could not be reached or opened.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The store rejected the statement.
    #[error("malformed statement: {0}")]
    MalformedStatement(String),

    /// The store refused the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(String),
}

impl ExecutionError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unreachable(_) => ErrorCode::StoreUnreachable,
            Self::MalformedStatement(_) => ErrorCode::MalformedStatement,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Store(_) => ErrorCode::StoreFailure,
        }
    }
}

/// Errors raised by a formatter that cannot render its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// There is nothing to display.
    #[error("{0}")]
    NoResults(String),

    /// A field the format depends on is absent from the query.
    #[error("{0}")]
    MissingField(String),

    /// A parameter that only makes sense once per display was given per query.
    #[error("\"{name}\" must be an overall display parameter, not a query-specific one")]
    ConflictingParameter {
        /// The parameter name.
        name: String,
    },

    /// A parameter value cannot be used.
    #[error("invalid value \"{value}\" for parameter \"{name}\"")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// The rejected value.
        value: String,
    },
}

impl FormatError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoResults(_) => ErrorCode::NoResults,
            Self::MissingField(_) => ErrorCode::MissingField,
            Self::ConflictingParameter { .. } => ErrorCode::ConflictingParameter,
            Self::InvalidParameter { .. } => ErrorCode::InvalidParameter,
        }
    }

    /// Creates a no-results error.
    #[must_use]
    pub fn no_results(message: impl Into<String>) -> Self {
        Self::NoResults(message.into())
    }
}

/// The main error type for Quarry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuarryError {
    /// The query could not be compiled.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The store failed to run the query.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The results could not be rendered.
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl QuarryError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Compile(e) => e.code(),
            Self::Execution(e) => e.code(),
            Self::Format(e) => e.code(),
        }
    }

    /// Returns the message shown to the query's author.
    #[must_use]
    pub fn user_message(&self) -> String {
        format!("Error: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = CompileError::unknown_table("Books");
        assert_eq!(err.code(), ErrorCode::UnknownTable);
        assert_eq!(err.code().category(), "Compile");

        let err = ExecutionError::PermissionDenied("read only".to_string());
        assert_eq!(err.code().category(), "Execution");
        assert_eq!(FormatError::no_results("none").code().category(), "Format");
    }

    #[test]
    fn test_error_display() {
        let err = CompileError::unknown_table("Books");
        assert_eq!(err.to_string(), "table \"Books\" does not exist");

        let err = CompileError::invalid_clause("where", "unbalanced parentheses");
        assert_eq!(
            err.to_string(),
            "invalid \"where\" clause: unbalanced parentheses"
        );
    }

    #[test]
    fn test_quarry_error_from() {
        let err: QuarryError = CompileError::unknown_field("Author").into();
        assert_eq!(err.code(), ErrorCode::UnknownField);
        assert_eq!(
            err.user_message(),
            "Error: field \"Author\" was not found in the queried tables"
        );

        let err: QuarryError = ExecutionError::Unreachable("gone".to_string()).into();
        assert_eq!(err.to_string(), "store unreachable: gone");
    }

    #[test]
    fn test_conflicting_parameter_message() {
        let err = CompileError::ConflictingParameter {
            name: "icon".to_string(),
        };
        assert!(err.to_string().starts_with("\"icon\" cannot be used"));
    }
}
