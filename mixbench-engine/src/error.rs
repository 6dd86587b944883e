//! Errors that abort a benchmark run.

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;
use crate::engine::Phase;
use crate::sampling::WeightsError;

/// Errors that abort a benchmark run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The workload name does not match any known profile.
    #[error("invalid workload `{name}`, expected one of: {expected}")]
    InvalidWorkload {
        /// The requested name.
        name: String,
        /// Comma-separated list of known profiles.
        expected: String,
    },

    /// The weights of a profile cannot be sampled from.
    #[error("invalid weights for workload `{name}`")]
    InvalidWeights {
        /// Name of the profile.
        name: String,
        /// Why the weights were rejected.
        #[source]
        cause: WeightsError,
    },

    /// A benchmark parameter is out of range.
    #[error("invalid benchmark configuration: {0}")]
    InvalidConfig(&'static str),

    /// The backend could not store the initial population.
    #[error("prepopulation failed on {backend}: inserted {inserted} of {requested} records")]
    PrepopulationFailed {
        /// Name of the backend.
        backend: &'static str,
        /// Number of records that were requested.
        requested: usize,
        /// Number of identifiers the backend returned.
        inserted: usize,
        /// The backend error, if the insert failed outright.
        #[source]
        cause: Option<BackendError>,
    },

    /// A write failed during the timed steady state.
    #[error("steady-state write failed on {backend}")]
    WriteFailed {
        /// Name of the backend.
        backend: &'static str,
        /// The backend error.
        #[source]
        cause: BackendError,
    },

    /// A read failed during the timed steady state.
    #[error("steady-state read failed on {backend}")]
    ReadFailed {
        /// Name of the backend.
        backend: &'static str,
        /// The backend error.
        #[source]
        cause: BackendError,
    },

    /// The run did not complete within its configured timeout.
    #[error("run aborted during {phase} after exceeding its timeout of {timeout:?}")]
    TimedOut {
        /// The phase that was still in progress.
        phase: Phase,
        /// The configured timeout.
        timeout: Duration,
    },

    /// A concurrent worker panicked or was cancelled.
    #[error("benchmark worker terminated unexpectedly")]
    Worker(#[from] tokio::task::JoinError),
}

impl EngineError {
    /// The phase of the run in which this error aborted it.
    pub fn phase(&self) -> Phase {
        match self {
            Self::InvalidWorkload { .. } | Self::InvalidWeights { .. } | Self::InvalidConfig(_) => {
                Phase::Idle
            }
            Self::PrepopulationFailed { .. } => Phase::Prepopulating,
            Self::WriteFailed { .. } | Self::ReadFailed { .. } | Self::Worker(_) => Phase::Running,
            Self::TimedOut { phase, .. } => *phase,
        }
    }
}

/// Result type for engine operations.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
