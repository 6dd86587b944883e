//! A scriptable backend for exercising the engine's error paths.
//!
//! [`FakeBackend`] stores records in an [`InMemoryBackend`] and can be told to misbehave: return
//! fewer identifiers than requested on prepopulation, fail writes after a number of successes, fail
//! every read, or answer slowly. It also counts every call it receives. The backend is [`Clone`] so tests can
//! keep a handle for inspection while the engine owns a shared copy.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mixbench_engine::backend::{Backend, BackendError, BackendResult, InMemoryBackend, ReadOutcome};
use mixbench_engine::{Identifier, Record};

#[derive(Clone, Debug, Default)]
struct Script {
    bulk_insert_shortfall: usize,
    writes_before_failure: Option<u64>,
    fail_reads: bool,
    sample_reads: bool,
    latency: Option<Duration>,
    bulk_insert_latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct Calls {
    bulk_insert: AtomicU64,
    bulk_inserted: AtomicU64,
    put: AtomicU64,
    point_get: AtomicU64,
    sample_get: AtomicU64,
}

/// Number of calls a [`FakeBackend`] received, per method.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CallCounts {
    /// Calls to `bulk_insert`.
    pub bulk_insert: u64,
    /// Records passed to `bulk_insert`, summed over all calls.
    pub bulk_inserted: u64,
    /// Calls to `put`.
    pub put: u64,
    /// Calls to `point_get`.
    pub point_get: u64,
    /// Calls to `sample_get`.
    pub sample_get: u64,
}

impl CallCounts {
    /// Calls made after prepopulation, i.e. everything except `bulk_insert`.
    pub fn steady_state(&self) -> u64 {
        self.put + self.point_get + self.sample_get
    }
}

/// An in-memory backend with scripted failures.
#[derive(Clone, Debug, Default)]
pub struct FakeBackend {
    inner: InMemoryBackend,
    script: Script,
    calls: Arc<Calls>,
}

impl FakeBackend {
    /// Creates a well-behaved fake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `bulk_insert` return `shortfall` fewer identifiers than requested.
    pub fn short_bulk_insert(mut self, shortfall: usize) -> Self {
        self.script.bulk_insert_shortfall = shortfall;
        self
    }

    /// Makes every `put` fail once `successes` writes went through.
    pub fn fail_writes_after(mut self, successes: u64) -> Self {
        self.script.writes_before_failure = Some(successes);
        self
    }

    /// Makes every read fail.
    pub fn fail_reads(mut self) -> Self {
        self.script.fail_reads = true;
        self
    }

    /// Reads sample an arbitrary record instead of looking up the sampled identifier.
    pub fn sample_reads(mut self) -> Self {
        self.script.sample_reads = true;
        self
    }

    /// Delays every steady-state operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.script.latency = Some(latency);
        self
    }

    /// Delays `bulk_insert` by `latency` before it stores anything.
    pub fn with_bulk_insert_latency(mut self, latency: Duration) -> Self {
        self.script.bulk_insert_latency = Some(latency);
        self
    }

    /// Returns the number of calls received so far.
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            bulk_insert: self.calls.bulk_insert.load(Ordering::SeqCst),
            bulk_inserted: self.calls.bulk_inserted.load(Ordering::SeqCst),
            put: self.calls.put.load(Ordering::SeqCst),
            point_get: self.calls.point_get.load(Ordering::SeqCst),
            sample_get: self.calls.sample_get.load(Ordering::SeqCst),
        }
    }

    /// Returns the number of records actually stored.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    async fn delay(&self) {
        if let Some(latency) = self.script.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_read(&self) -> BackendResult<()> {
        if self.script.fail_reads {
            return Err(BackendError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset while reading",
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn bulk_insert(&self, records: Vec<Record>) -> BackendResult<Vec<Identifier>> {
        self.calls.bulk_insert.fetch_add(1, Ordering::SeqCst);
        self.calls
            .bulk_inserted
            .fetch_add(records.len() as u64, Ordering::SeqCst);
        if let Some(latency) = self.script.bulk_insert_latency {
            tokio::time::sleep(latency).await;
        }

        let mut ids = self.inner.bulk_insert(records).await?;
        let keep = ids.len().saturating_sub(self.script.bulk_insert_shortfall);
        ids.truncate(keep);
        Ok(ids)
    }

    async fn put(&self, record: Record) -> BackendResult<Identifier> {
        let previous = self.calls.put.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self
            .script
            .writes_before_failure
            .is_some_and(|successes| previous >= successes)
        {
            return Err(BackendError::Generic {
                context: "failed to store record".into(),
                cause: Box::new(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "connection lost",
                )),
            });
        }
        self.inner.put(record).await
    }

    async fn point_get(&self, id: &Identifier) -> BackendResult<Option<Record>> {
        self.calls.point_get.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check_read()?;
        self.inner.point_get(id).await
    }

    async fn sample_get(&self) -> BackendResult<Option<Record>> {
        self.calls.sample_get.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check_read()?;
        self.inner.sample_get().await
    }

    async fn perform_read(&self, target: Option<&Identifier>) -> BackendResult<ReadOutcome> {
        let record = match target {
            _ if self.script.sample_reads => self.sample_get().await?,
            Some(id) => self.point_get(id).await?,
            None => return Ok(ReadOutcome::Skipped),
        };
        Ok(match record {
            Some(_) => ReadOutcome::Found,
            None => ReadOutcome::Absent,
        })
    }
}
