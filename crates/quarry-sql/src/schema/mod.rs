//! Field descriptors and table schemas.
//!
//! A [`TableSchema`] is an ordered mapping of field name to
//! [`FieldDescription`]. Schemas are persisted next to the table metadata
//! as a JSON object and decoded into these types as soon as they are read;
//! nothing past the load boundary sees the encoded form.
//!
//! # Persisted form
//!
//! ```text
//! {
//!   "Author":   {"type": "Page", "isList": true, "delimiter": ";"},
//!   "Website":  {"type": "URL", "link text": "homepage"},
//!   "Location": {"type": "Coordinates", "hidden": true}
//! }
//! ```

use thiserror::Error;

mod field;
mod table;

pub use field::{FieldDescription, FieldDescriptions, FieldType};
pub use table::TableSchema;

/// Errors raised while building, encoding or decoding a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The persisted blob is not a valid schema.
    #[error("cannot decode schema: {0}")]
    Decode(String),

    /// The schema could not be encoded.
    #[error("cannot encode schema: {0}")]
    Encode(String),

    /// A field breaks a schema invariant.
    #[error("invalid field \"{field}\": {message}")]
    InvalidField {
        /// The offending field.
        field: String,
        /// Which invariant it breaks.
        message: String,
    },
}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
