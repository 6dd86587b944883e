//! Test utilities for the benchmark engine and its backends.
//!
//! This crate provides utilities to facilitate testing of `mixbench`. See the modules for all
//! available utilities.

pub mod backend;
pub mod tracing;
