//! # quarry-common
//!
//! Common types, errors, and configuration for Quarry.
//!
//! This crate provides the foundational pieces shared by every Quarry
//! component:
//!
//! - **Errors**: the compile / execution / format error taxonomy and the
//!   unified [`QuarryError`]
//! - **Config**: query limits and rendering settings
//! - **Constants**: names of built-in columns, storage suffixes and
//!   metadata tables
//!
//! ## Example
//!
//! ```rust
//! use quarry_common::config::QuarryConfig;
//! use quarry_common::error::{CompileError, QuarryResult};
//!
//! fn check(config: &QuarryConfig) -> QuarryResult<()> {
//!     if config.query.default_limit == 0 {
//!         return Err(CompileError::invalid_clause("limit", "zero limit").into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(&QuarryConfig::default()).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;

pub use config::{QuarryConfig, QueryConfig, RenderConfig};
pub use error::{
    CompileError, ErrorCode, ExecutionError, FormatError, QuarryError, QuarryResult,
};
