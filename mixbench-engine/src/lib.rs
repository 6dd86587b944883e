//! This is a benchmarking engine which runs a weighted mix of reads and writes against a
//! pluggable storage [`Backend`](backend::Backend).
//!
//! A [`Benchmark`] is created from a [`WorkloadProfile`], which resolves a named workload such as
//! *write-heavy* or *mixed* into a pair of weights over the `write` and `read` actions.
//!
//! Every run first *prepopulates* the backend with a batch of records, so that reads have a
//! non-trivial population to sample from. It then issues the configured number of operations,
//! drawing each one independently from the profile's weights:
//!
//! - *Writes* store a freshly generated record and add the returned [`Identifier`] to the
//!   [`KeyPool`].
//! - *Reads* sample an identifier uniformly from the pool and hand it to the backend, which either
//!   looks it up directly or samples an arbitrary record, depending on its natural access pattern.
//!
//! The whole steady state is timed with a single wall-clock timer, and the outcome is summarized in
//! a [`Report`].
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod backend;
pub mod engine;
pub mod error;
pub mod id;
pub mod payload;
pub mod pool;
pub mod profile;
pub mod report;
pub mod sampling;

pub use crate::engine::{Benchmark, BenchmarkBuilder, Phase};
pub use crate::error::{EngineError, Result};
pub use crate::id::Identifier;
pub use crate::payload::{PayloadGenerator, Record};
pub use crate::pool::KeyPool;
pub use crate::profile::{Action, WorkloadProfile};
pub use crate::report::Report;
