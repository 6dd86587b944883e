//! Command line harness for the `mixbench` storage benchmark.
//!
//! This builds on top of [`mixbench_engine`], resolving the configuration, opening the selected
//! backend and printing the final report.

pub mod cli;
pub mod config;
pub mod observability;
pub mod storage;
