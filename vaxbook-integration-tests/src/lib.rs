//! Integration tests for `vaxbook`
//!
//! This crate contains integration tests that drive the scheduling engine
//! against the in-memory backend, with and without injected failures.

// This is a test-only crate
#![cfg(test)]
