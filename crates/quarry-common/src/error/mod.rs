//! Error handling for Quarry.
//!
//! Errors are split by pipeline stage: [`CompileError`] for everything
//! detected while turning DSL text into a statement, [`ExecutionError`] for
//! failures reported by the store, and [`FormatError`] for results that a
//! formatter refuses to render. [`QuarryError`] unifies the three.

mod query;

pub use query::{CompileError, ErrorCode, ExecutionError, FormatError, QuarryError};

/// Result type alias for Quarry operations.
pub type QuarryResult<T> = std::result::Result<T, QuarryError>;
