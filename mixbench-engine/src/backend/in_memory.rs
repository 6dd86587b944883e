//! In-memory key-value backend.
//!
//! Records live in a `HashMap` under keys of the form `key:{n}`, minted from a counter that keeps
//! counting after prepopulation. The backend is [`Clone`] so tests can hold a handle for direct
//! inspection while the engine owns a shared copy.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::seq::IteratorRandom;

use super::{Backend, BackendError, BackendResult};
use crate::id::Identifier;
use crate::payload::Record;

#[derive(Debug, Default)]
struct Store {
    records: HashMap<String, Record>,
    next_key: u64,
}

impl Store {
    fn insert(&mut self, record: Record) -> Identifier {
        let key = format!("key:{}", self.next_key);
        self.next_key += 1;
        self.records.insert(key.clone(), record);
        Identifier::Key(key)
    }
}

/// A key-value store held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<Mutex<Store>>,
}

impl InMemoryBackend {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.store.lock().records.len()
    }

    /// Returns `true` if no record has been stored.
    pub fn is_empty(&self) -> bool {
        self.store.lock().records.is_empty()
    }

    /// Returns a clone of the record stored at `key`, bypassing the `Backend` trait.
    pub fn get_stored(&self, key: &str) -> Option<Record> {
        self.store.lock().records.get(key).cloned()
    }
}

#[async_trait::async_trait]
impl Backend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn bulk_insert(&self, records: Vec<Record>) -> BackendResult<Vec<Identifier>> {
        let mut store = self.store.lock();
        Ok(records.into_iter().map(|r| store.insert(r)).collect())
    }

    async fn put(&self, record: Record) -> BackendResult<Identifier> {
        Ok(self.store.lock().insert(record))
    }

    async fn point_get(&self, id: &Identifier) -> BackendResult<Option<Record>> {
        let Some(key) = id.as_key() else {
            return Err(BackendError::UnsupportedIdentifier {
                backend: self.name(),
                id: id.clone(),
            });
        };
        Ok(self.store.lock().records.get(key).cloned())
    }

    async fn sample_get(&self) -> BackendResult<Option<Record>> {
        let store = self.store.lock();
        Ok(store.records.values().choose(&mut rand::rng()).cloned())
    }
}
