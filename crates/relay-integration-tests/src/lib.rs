//! Integration test crate for the relay fleet.
//!
//! This crate exists solely to run scenario tests that span several relay
//! crates. It has no public API; everything lives under `tests/`.

#![forbid(unsafe_code)]
