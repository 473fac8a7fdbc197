//! sprig benchmarking suite
//!
//! Benchmarks for resolution, version selection and parsing, driven by
//! synthetic registries so no network or disk access is involved.

pub mod common;

pub use common::*;
