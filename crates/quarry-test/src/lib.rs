//! # quarry-test
//!
//! Integration tests for Quarry.
//!
//! This crate contains:
//! - Seeded fixture stores shared by the end-to-end tests
//! - End-to-end tests of the compile / execute / render pipeline (`tests/`)

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Seeded stores
pub mod fixtures;
