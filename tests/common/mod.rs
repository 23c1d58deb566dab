//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use std::path::PathBuf;

/// Path of a fixture under `tests/data`
pub fn datapath(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Read a fixture as text
pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(datapath(name))
        .unwrap_or_else(|e| panic!("missing fixture {}: {}", name, e))
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
