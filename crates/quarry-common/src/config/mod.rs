//! Configuration for Quarry.
//!
//! This module provides the configuration structures consumed by the
//! compiler, the executor and the formatters.

mod query;

pub use query::{QuarryConfig, QueryConfig, RenderConfig};
