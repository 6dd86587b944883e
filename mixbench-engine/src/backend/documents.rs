//! Document-store backend keeping one JSON document per file.
//!
//! Documents are addressed by an implicit UUIDv7 handle, and reads do not target a specific
//! document: they sample one arbitrary document from the collection instead.
//!
//! The directory is scanned once when the collection is opened. After that, the backend samples
//! from an in-process index of document paths, so documents created by other processes while the
//! backend is open are not considered for sampling.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use rand::seq::IndexedRandom;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{Backend, BackendError, BackendResult, ReadOutcome};
use crate::id::Identifier;
use crate::payload::Record;

const EXTENSION: &str = "json";

/// A collection of JSON documents in a local directory.
pub struct DocumentBackend {
    path: PathBuf,
    documents: RwLock<Vec<PathBuf>>,
}

impl DocumentBackend {
    /// Opens the collection at `path`, creating the directory if needed.
    pub async fn open(path: &Path) -> BackendResult<Self> {
        tokio::fs::create_dir_all(path).await?;
        let documents = list(path).await?;

        Ok(Self {
            path: path.into(),
            documents: RwLock::new(documents),
        })
    }

    /// Removes all documents from the collection, returning how many were removed.
    pub async fn clear(&self) -> BackendResult<usize> {
        let documents = list(&self.path).await?;
        self.documents.write().clear();
        for path in &documents {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(documents.len())
    }

    fn document_path(&self, id: Uuid) -> PathBuf {
        self.path.join(format!("{id}.{EXTENSION}"))
    }

    async fn insert(&self, record: &Record) -> BackendResult<Identifier> {
        let id = Uuid::now_v7();
        let contents = serde_json::to_vec(record).map_err(|cause| BackendError::Serde {
            context: "failed to encode document".into(),
            cause,
        })?;

        let path = self.document_path(id);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&contents).await?;
        file.flush().await?;

        self.documents.write().push(path);
        Ok(Identifier::Uuid(id))
    }

    async fn load(&self, path: &Path) -> BackendResult<Option<Record>> {
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let record = serde_json::from_slice(&contents).map_err(|cause| BackendError::Serde {
            context: format!("failed to decode document `{}`", path.display()),
            cause,
        })?;
        Ok(Some(record))
    }
}

impl fmt::Debug for DocumentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentBackend")
            .field("path", &self.path)
            .field("documents", &self.documents.read().len())
            .finish()
    }
}

async fn list(path: &Path) -> BackendResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(path).await?;
    let mut documents = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == EXTENSION) {
            documents.push(path);
        }
    }
    Ok(documents)
}

#[async_trait::async_trait]
impl Backend for DocumentBackend {
    fn name(&self) -> &'static str {
        "documents"
    }

    async fn bulk_insert(&self, records: Vec<Record>) -> BackendResult<Vec<Identifier>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in &records {
            ids.push(self.insert(record).await?);
        }
        Ok(ids)
    }

    async fn put(&self, record: Record) -> BackendResult<Identifier> {
        self.insert(&record).await
    }

    async fn point_get(&self, id: &Identifier) -> BackendResult<Option<Record>> {
        let Some(uuid) = id.as_uuid() else {
            return Err(BackendError::UnsupportedIdentifier {
                backend: self.name(),
                id: id.clone(),
            });
        };
        self.load(&self.document_path(uuid)).await
    }

    async fn sample_get(&self) -> BackendResult<Option<Record>> {
        let chosen = self.documents.read().choose(&mut rand::rng()).cloned();
        match chosen {
            Some(path) => self.load(&path).await,
            None => Ok(None),
        }
    }

    async fn perform_read(&self, _target: Option<&Identifier>) -> BackendResult<ReadOutcome> {
        Ok(match self.sample_get().await? {
            Some(_) => ReadOutcome::Found,
            None => ReadOutcome::Absent,
        })
    }
}
