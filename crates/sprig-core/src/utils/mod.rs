//! Utility functions for sprig operations.
//!
//! This module provides common utilities used across the sprig ecosystem:
//! - Package name normalization and validation

pub mod name;

pub use name::{is_valid_name, normalize_name};
