//! Fixture test support utilities
//!
//! Shared helpers for unit and integration tests across the workspace:
//! one-time logging initialization and unique name generation.

pub mod logging;
pub mod unique_helpers;

pub use unique_helpers::unique_str;
