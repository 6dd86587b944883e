//! Generation of record payloads.

use std::ops::RangeInclusive;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// The range of the integer value stored alongside every payload.
pub const VALUE_RANGE: RangeInclusive<u32> = 1..=1000;

/// A record as it is stored in a backend.
///
/// The harness never keeps records around after writing them, only their
/// [`Identifier`](crate::Identifier)s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque string payload of the configured length.
    #[serde(rename = "name")]
    pub payload: String,
    /// An integer within [`VALUE_RANGE`].
    pub value: u32,
}

/// Produces records with fixed-length random payloads.
#[derive(Debug, Clone)]
pub struct PayloadGenerator {
    payload_size: usize,
    rng: SmallRng,
}

impl PayloadGenerator {
    /// Creates a generator drawing from the given RNG.
    pub fn new(payload_size: usize, rng: SmallRng) -> Self {
        Self { payload_size, rng }
    }

    /// Creates a generator with a deterministic RNG derived from `seed`.
    pub fn from_seed(payload_size: usize, seed: u64) -> Self {
        Self::new(payload_size, SmallRng::seed_from_u64(seed))
    }

    /// Generates a single record.
    pub fn record(&mut self) -> Record {
        let payload = random_string(&mut self.rng, self.payload_size);
        let value = self.rng.random_range(VALUE_RANGE);
        Record { payload, value }
    }

    /// Generates a batch of `count` records.
    pub fn records(&mut self, count: usize) -> Vec<Record> {
        (0..count).map(|_| self.record()).collect()
    }
}

/// Lowercase ASCII, one character per requested unit of length.
fn random_string<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_have_exact_length() {
        let mut generator = PayloadGenerator::from_seed(5, 7);
        for record in generator.records(50) {
            assert_eq!(record.payload.len(), 5);
            assert!(record.payload.bytes().all(|b| b.is_ascii_lowercase()));
            assert!(VALUE_RANGE.contains(&record.value));
        }
    }

    #[test]
    fn empty_payloads() {
        let mut generator = PayloadGenerator::from_seed(0, 1);
        assert_eq!(generator.record().payload, "");
    }

    #[test]
    fn same_seed_same_records() {
        let a = PayloadGenerator::from_seed(16, 42).records(10);
        let b = PayloadGenerator::from_seed(16, 42).records(10);
        assert_eq!(a, b);
    }

    #[test]
    fn serializes_payload_as_name() {
        let record = Record {
            payload: "abc".into(),
            value: 7,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"name": "abc", "value": 7}));
    }
}
