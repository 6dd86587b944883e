//! The capability interface that storage backends implement, and the built-in adapters.

use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

use crate::id::Identifier;
use crate::payload::Record;

mod column_family;
mod documents;
mod in_memory;

pub use column_family::FjallBackend;
pub use documents::DocumentBackend;
pub use in_memory::InMemoryBackend;

/// A type-erased, shareable [`Backend`] instance.
pub type SharedBackend = Arc<dyn Backend>;

/// What happened to a single read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadOutcome {
    /// A record was returned.
    Found,
    /// The backend answered, but had no matching record.
    Absent,
    /// No read was issued because there was nothing to read.
    Skipped,
}

impl ReadOutcome {
    fn from_record(record: Option<Record>) -> Self {
        match record {
            Some(_) => Self::Found,
            None => Self::Absent,
        }
    }
}

/// A storage technology the benchmark can run against.
///
/// Implementations receive a ready-to-use connection or handle; setting up and tearing down the
/// storage target happens outside of the engine.
#[async_trait::async_trait]
pub trait Backend: Debug + Send + Sync + 'static {
    /// The backend name, used in logs and reports.
    fn name(&self) -> &'static str;

    /// Stores all records, returning one identifier per stored record.
    ///
    /// This is used to prepopulate the backend before measurements start.
    async fn bulk_insert(&self, records: Vec<Record>) -> BackendResult<Vec<Identifier>>;

    /// Stores a single record and returns its newly assigned identifier.
    async fn put(&self, record: Record) -> BackendResult<Identifier>;

    /// Looks up a record by its identifier. A missing record is not an error.
    async fn point_get(&self, id: &Identifier) -> BackendResult<Option<Record>>;

    /// Returns an arbitrary existing record, or `None` if the backend is empty.
    async fn sample_get(&self) -> BackendResult<Option<Record>>;

    /// Performs one read the way this backend is naturally accessed.
    ///
    /// `target` is an identifier sampled from the key pool, if the pool had any. The default
    /// looks the target up with [`point_get`](Self::point_get) and skips the read without a
    /// target. Backends which sample records instead override this with
    /// [`sample_get`](Self::sample_get).
    async fn perform_read(&self, target: Option<&Identifier>) -> BackendResult<ReadOutcome> {
        match target {
            Some(id) => Ok(ReadOutcome::from_record(self.point_get(id).await?)),
            None => Ok(ReadOutcome::Skipped),
        }
    }
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// IO errors related to file operations.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to de/serialization of stored records.
    #[error("serde error: {context}")]
    Serde {
        /// What was being de/serialized.
        context: String,
        /// The underlying error.
        #[source]
        cause: serde_json::Error,
    },

    /// Errors from the embedded column-family store.
    #[error("storage engine error: {0}")]
    Storage(#[from] fjall::Error),

    /// The identifier was not minted by this kind of backend.
    #[error("{backend} cannot address record `{id}`")]
    UnsupportedIdentifier {
        /// Name of the backend.
        backend: &'static str,
        /// The foreign identifier.
        id: Identifier,
    },

    /// Any other error stemming from a storage backend.
    #[error("storage backend error: {context}")]
    Generic {
        /// Description of the failed operation.
        context: String,
        /// The underlying error.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
