//! Column-family backend built on an embedded `fjall` keyspace.
//!
//! Rows live in a single partition and are keyed by a random UUID, mirroring a table with a `uuid`
//! primary key. Row contents are stored as JSON.

use std::fmt;
use std::path::{Path, PathBuf};

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use uuid::Uuid;

use super::{Backend, BackendError, BackendResult};
use crate::id::Identifier;
use crate::payload::Record;

/// Name of the partition holding all benchmark rows.
pub const PARTITION: &str = "records";

/// A column-family store persisted in a local directory.
pub struct FjallBackend {
    path: PathBuf,
    keyspace: Keyspace,
    records: PartitionHandle,
}

impl FjallBackend {
    /// Opens or creates the keyspace at `path`.
    pub fn open(path: &Path) -> BackendResult<Self> {
        let keyspace = Config::new(path).open()?;
        let records = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;

        Ok(Self {
            path: path.into(),
            keyspace,
            records,
        })
    }

    fn encode(record: &Record) -> BackendResult<Vec<u8>> {
        serde_json::to_vec(record).map_err(|cause| BackendError::Serde {
            context: "failed to encode row".into(),
            cause,
        })
    }

    fn decode(id: Uuid, bytes: &[u8]) -> BackendResult<Record> {
        serde_json::from_slice(bytes).map_err(|cause| BackendError::Serde {
            context: format!("failed to decode row `{id}`"),
            cause,
        })
    }

    fn row_id(&self, id: &Identifier) -> BackendResult<Uuid> {
        id.as_uuid()
            .ok_or_else(|| BackendError::UnsupportedIdentifier {
                backend: self.name(),
                id: id.clone(),
            })
    }
}

impl fmt::Debug for FjallBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FjallBackend")
            .field("path", &self.path)
            .field("partition", &PARTITION)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Backend for FjallBackend {
    fn name(&self) -> &'static str {
        "fjall"
    }

    async fn bulk_insert(&self, records: Vec<Record>) -> BackendResult<Vec<Identifier>> {
        let mut batch = self.keyspace.batch();
        let mut ids = Vec::with_capacity(records.len());

        for record in &records {
            let id = Uuid::new_v4();
            batch.insert(&self.records, id.as_bytes().to_vec(), Self::encode(record)?);
            ids.push(Identifier::Uuid(id));
        }
        batch.commit()?;

        Ok(ids)
    }

    async fn put(&self, record: Record) -> BackendResult<Identifier> {
        let id = Uuid::new_v4();
        self.records
            .insert(id.as_bytes().to_vec(), Self::encode(&record)?)?;
        Ok(Identifier::Uuid(id))
    }

    async fn point_get(&self, id: &Identifier) -> BackendResult<Option<Record>> {
        let id = self.row_id(id)?;
        match self.records.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(id, &bytes)?)),
            None => Ok(None),
        }
    }

    async fn sample_get(&self) -> BackendResult<Option<Record>> {
        // Seek from a random key and wrap around. Rows after larger key gaps are picked more often.
        let start = Uuid::new_v4();
        let found = match self.records.range(start.as_bytes().to_vec()..).next() {
            Some(kv) => Some(kv?),
            None => self.records.first_key_value()?,
        };

        let Some((key, value)) = found else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&key).map_err(|cause| BackendError::Generic {
            context: format!("malformed row key in partition `{PARTITION}`"),
            cause: cause.into(),
        })?;
        Ok(Some(Self::decode(id, &value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReadOutcome;
    use crate::payload::PayloadGenerator;

    #[tokio::test]
    async fn stores_rows() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = FjallBackend::open(tempdir.path()).unwrap();
        let mut payloads = PayloadGenerator::from_seed(12, 3);

        let records = payloads.records(5);
        let ids = backend.bulk_insert(records.clone()).await.unwrap();
        assert_eq!(ids.len(), 5);

        for (id, record) in ids.iter().zip(&records) {
            assert_eq!(backend.point_get(id).await.unwrap().as_ref(), Some(record));
        }

        let record = payloads.record();
        let id = backend.put(record.clone()).await.unwrap();
        assert!(id.as_uuid().is_some());
        assert_eq!(backend.point_get(&id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn samples_rows() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = FjallBackend::open(tempdir.path()).unwrap();
        assert_eq!(backend.sample_get().await.unwrap(), None);

        let record = PayloadGenerator::from_seed(3, 0).record();
        backend.put(record.clone()).await.unwrap();

        // with a single row, every sample has to wrap around to it
        for _ in 0..10 {
            assert_eq!(backend.sample_get().await.unwrap().as_ref(), Some(&record));
        }
    }

    #[tokio::test]
    async fn malformed_row_keys_are_errors() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = FjallBackend::open(tempdir.path()).unwrap();

        let record = PayloadGenerator::from_seed(4, 1).record();
        let value = FjallBackend::encode(&record).unwrap();
        backend.records.insert(b"not-a-uuid".to_vec(), value).unwrap();

        assert!(matches!(
            backend.sample_get().await.unwrap_err(),
            BackendError::Generic { .. }
        ));
    }

    #[tokio::test]
    async fn missing_rows_are_absent() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = FjallBackend::open(tempdir.path()).unwrap();

        let missing = Identifier::Uuid(Uuid::new_v4());
        assert_eq!(
            backend.perform_read(Some(&missing)).await.unwrap(),
            ReadOutcome::Absent
        );

        let foreign = Identifier::Key("key:0".into());
        assert!(matches!(
            backend.point_get(&foreign).await.unwrap_err(),
            BackendError::UnsupportedIdentifier { .. }
        ));
    }

    #[tokio::test]
    async fn reopens_existing_keyspace() {
        let tempdir = tempfile::tempdir().unwrap();
        let record = PayloadGenerator::from_seed(6, 9).record();

        let id = {
            let backend = FjallBackend::open(tempdir.path()).unwrap();
            let id = backend.put(record.clone()).await.unwrap();
            backend.keyspace.persist(fjall::PersistMode::SyncAll).unwrap();
            id
        };

        let backend = FjallBackend::open(tempdir.path()).unwrap();
        assert_eq!(backend.point_get(&id).await.unwrap(), Some(record));
    }
}
