//! Named workload profiles and their read/write weights.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::EngineError;
use crate::sampling::WeightedChoice;

/// The class of an operation issued by the engine.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Action {
    /// Store a freshly generated record.
    Write,
    /// Read an existing record.
    Read,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => f.write_str("write"),
            Self::Read => f.write_str("read"),
        }
    }
}

/// Built-in profiles as `(name, write weight, read weight)`.
pub const BUILTIN_PROFILES: &[(&str, f64, f64)] = &[
    ("write-heavy", 0.8, 0.2),
    ("read-heavy", 0.2, 0.8),
    ("mixed", 0.5, 0.5),
    ("write", 1.0, 0.0),
    ("read", 0.0, 1.0),
];

/// An immutable read/write mix.
///
/// Construction validates the weights, so every profile can be sampled from.
#[derive(Debug, Clone)]
pub struct WorkloadProfile {
    name: String,
    choice: WeightedChoice<Action>,
}

impl WorkloadProfile {
    /// Resolves one of the [`BUILTIN_PROFILES`] by name.
    ///
    /// Unknown names are rejected with [`EngineError::InvalidWorkload`]; there is no fallback to
    /// `mixed`.
    pub fn resolve(name: &str) -> Result<Self, EngineError> {
        let Some(&(name, writes, reads)) = BUILTIN_PROFILES.iter().find(|(n, ..)| *n == name)
        else {
            return Err(EngineError::InvalidWorkload {
                name: name.to_owned(),
                expected: BUILTIN_PROFILES
                    .iter()
                    .map(|(n, ..)| *n)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };

        Self::custom(name, writes, reads)
    }

    /// Creates a profile with user-defined weights.
    pub fn custom(name: impl Into<String>, writes: f64, reads: f64) -> Result<Self, EngineError> {
        let name = name.into();
        match WeightedChoice::new([(Action::Write, writes), (Action::Read, reads)]) {
            Ok(choice) => Ok(Self { name, choice }),
            Err(cause) => Err(EngineError::InvalidWeights { name, cause }),
        }
    }

    /// Name of the profile for identification in logs and reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `(write, read)` weights.
    pub fn weights(&self) -> (f64, f64) {
        let mut writes = 0.0;
        let mut reads = 0.0;
        for (action, weight) in self.choice.weights() {
            match action {
                Action::Write => writes = weight,
                Action::Read => reads = weight,
            }
        }
        (writes, reads)
    }

    /// Draws the next action.
    pub fn next_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        self.choice.sample(rng)
    }
}

impl FromStr for WorkloadProfile {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}
