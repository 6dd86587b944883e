//! Opens the configured storage backend.

use std::sync::Arc;

use anyhow::{Context, Result};
use mixbench_engine::backend::{DocumentBackend, FjallBackend, InMemoryBackend, SharedBackend};

use crate::config::Storage;

/// Creates a ready-to-use backend for the given configuration.
pub async fn open(storage: &Storage) -> Result<SharedBackend> {
    let backend: SharedBackend = match storage {
        Storage::Memory => Arc::new(InMemoryBackend::new()),
        Storage::Fjall { path } => Arc::new(
            FjallBackend::open(path)
                .with_context(|| format!("failed to open keyspace at {}", path.display()))?,
        ),
        Storage::Documents { path, clear } => {
            let backend = DocumentBackend::open(path)
                .await
                .with_context(|| format!("failed to open collection at {}", path.display()))?;
            if *clear {
                let removed = backend.clear().await.context("failed to clear collection")?;
                tracing::debug!(removed, "cleared documents of previous runs");
            }
            Arc::new(backend)
        }
    };

    Ok(backend)
}
