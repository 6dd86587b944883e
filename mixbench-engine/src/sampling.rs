//! Weighted random choice over a fixed set of labels.

use rand::Rng;
use rand_distr::Distribution;
use rand_distr::weighted::WeightedIndex;
use thiserror::Error;

/// Errors for a set of weights that cannot be sampled from.
#[derive(Debug, Error, PartialEq)]
pub enum WeightsError {
    /// No labels were given.
    #[error("no weights given")]
    Empty,
    /// A weight was negative, infinite or NaN.
    #[error("weight #{index} is not a finite, non-negative number: {weight}")]
    Invalid {
        /// Position of the offending weight.
        index: usize,
        /// The offending weight.
        weight: f64,
    },
    /// All weights are zero, so no label could ever be chosen.
    #[error("weights must sum to a positive value")]
    ZeroSum,
}

/// Picks one of a fixed set of labels, with probability proportional to its weight.
///
/// Weights do not need to sum to one. The random source is passed in on every draw, which keeps
/// the choice deterministic under a seeded RNG.
#[derive(Debug, Clone)]
pub struct WeightedChoice<T> {
    labels: Vec<T>,
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl<T: Copy> WeightedChoice<T> {
    /// Creates a choice from `(label, weight)` pairs.
    pub fn new(items: impl IntoIterator<Item = (T, f64)>) -> Result<Self, WeightsError> {
        let (labels, weights): (Vec<T>, Vec<f64>) = items.into_iter().unzip();

        if weights.is_empty() {
            return Err(WeightsError::Empty);
        }
        if let Some((index, &weight)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(WeightsError::Invalid { index, weight });
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(WeightsError::ZeroSum);
        }

        let index = WeightedIndex::new(&weights).map_err(|_| WeightsError::ZeroSum)?;
        Ok(Self {
            labels,
            weights,
            index,
        })
    }

    /// Draws one label.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.labels[self.index.sample(rng)]
    }

    /// Iterates over all labels with their configured weights.
    pub fn weights(&self) -> impl Iterator<Item = (T, f64)> + '_ {
        self.labels.iter().copied().zip(self.weights.iter().copied())
    }
}
