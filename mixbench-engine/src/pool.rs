//! The pool of identifiers that reads are sampled from.

use parking_lot::RwLock;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::id::Identifier;

/// An append-only collection of identifiers of records known to exist.
///
/// The pool only ever grows during a run. Reads sample from it uniformly at random, so the order
/// of insertion carries no meaning. It is internally synchronized and can be shared between
/// concurrent workers; a sample may or may not observe an identifier appended concurrently.
#[derive(Debug, Default)]
pub struct KeyPool {
    ids: RwLock<Vec<Identifier>>,
}

impl KeyPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single identifier.
    pub fn append(&self, id: Identifier) {
        self.ids.write().push(id);
    }

    /// Adds all identifiers from the iterator.
    pub fn extend(&self, ids: impl IntoIterator<Item = Identifier>) {
        self.ids.write().extend(ids);
    }

    /// The number of identifiers in the pool.
    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    /// Returns `true` if no identifier has been added yet.
    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }

    /// Picks an identifier uniformly at random, or `None` if the pool is empty.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Identifier> {
        self.ids.read().choose(rng).cloned()
    }
}

impl FromIterator<Identifier> for KeyPool {
    fn from_iter<T: IntoIterator<Item = Identifier>>(iter: T) -> Self {
        Self {
            ids: RwLock::new(iter.into_iter().collect()),
        }
    }
}
