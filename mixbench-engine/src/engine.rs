//! Runs a [`WorkloadProfile`] against a backend and collects the outcome in a [`Report`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use tokio::task::JoinSet;

use crate::backend::{Backend, BackendError, ReadOutcome, SharedBackend};
use crate::error::{EngineError, Result};
use crate::payload::PayloadGenerator;
use crate::pool::KeyPool;
use crate::profile::{Action, WorkloadProfile};
use crate::report::Report;

/// Default number of operations in the steady state.
pub const DEFAULT_OPS: u64 = 1000;
/// Default number of characters per payload.
pub const DEFAULT_PAYLOAD_SIZE: usize = 10;
/// Default number of records inserted before measurements start.
pub const DEFAULT_PREPOPULATE: usize = 100;

/// The states a benchmark run goes through.
///
/// A run starts [`Idle`](Self::Idle), fills the backend while
/// [`Prepopulating`](Self::Prepopulating), issues timed operations while
/// [`Running`](Self::Running) and ends in [`Reporting`](Self::Reporting). Errors abort the run in
/// whichever phase they occur, see [`EngineError::phase`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Configured, but not started.
    Idle,
    /// Inserting the initial population.
    Prepopulating,
    /// Issuing timed operations.
    Running,
    /// Done; the report is available.
    Reporting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Prepopulating => "prepopulation",
            Self::Running => "steady state",
            Self::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// A builder for creating a [`Benchmark`].
#[derive(Debug)]
pub struct BenchmarkBuilder {
    profile: WorkloadProfile,
    num_ops: u64,
    payload_size: usize,
    prepopulate: usize,
    concurrency: usize,
    seed: u64,
    tolerant: bool,
    timeout: Option<Duration>,
}

impl BenchmarkBuilder {
    /// The number of operations to issue after prepopulation.
    pub fn ops(mut self, num_ops: u64) -> Self {
        self.num_ops = num_ops;
        self
    }

    /// The number of characters in every written payload.
    pub fn payload_size(mut self, payload_size: usize) -> Self {
        self.payload_size = payload_size;
        self
    }

    /// The number of records to insert before measurements start.
    ///
    /// With `0`, the run starts on an empty key pool and reads are skipped until the first write.
    pub fn prepopulate(mut self, count: usize) -> Self {
        self.prepopulate = count;
        self
    }

    /// The number of workers issuing operations in parallel.
    ///
    /// With `1`, every operation completes before the next one is drawn.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Seed for all random decisions and payloads of the run.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Log and count failed operations instead of aborting the run.
    pub fn tolerant(mut self, tolerant: bool) -> Self {
        self.tolerant = tolerant;
        self
    }

    /// Aborts the whole run, prepopulation included, if it takes longer than `timeout`.
    ///
    /// The reported elapsed time still covers the steady state only.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates the parameters and creates the benchmark.
    pub fn build(self) -> Result<Benchmark> {
        if self.payload_size == 0 {
            return Err(EngineError::InvalidConfig("payload size must be positive"));
        }
        if self.concurrency == 0 {
            return Err(EngineError::InvalidConfig("concurrency must be positive"));
        }

        Ok(Benchmark {
            profile: self.profile,
            num_ops: self.num_ops,
            payload_size: self.payload_size,
            prepopulate: self.prepopulate,
            concurrency: self.concurrency,
            seed: self.seed,
            tolerant: self.tolerant,
            timeout: self.timeout,
        })
    }
}

/// A fully configured benchmark that can be run against any [`Backend`].
///
/// All state of a run lives in the [`run`](Self::run) call, so one benchmark can be run many
/// times, and several benchmarks can run in the same process without interfering.
#[derive(Debug, Clone)]
pub struct Benchmark {
    profile: WorkloadProfile,
    num_ops: u64,
    payload_size: usize,
    prepopulate: usize,
    concurrency: usize,
    seed: u64,
    tolerant: bool,
    timeout: Option<Duration>,
}

impl Benchmark {
    /// Constructs a new benchmark builder for the given profile.
    pub fn builder(profile: WorkloadProfile) -> BenchmarkBuilder {
        BenchmarkBuilder {
            profile,
            num_ops: DEFAULT_OPS,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            prepopulate: DEFAULT_PREPOPULATE,
            concurrency: 1,
            seed: rand::random(),
            tolerant: false,
            timeout: None,
        }
    }

    /// The workload profile driving this benchmark.
    pub fn profile(&self) -> &WorkloadProfile {
        &self.profile
    }

    /// The seed all random decisions are derived from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Runs the benchmark to completion.
    ///
    /// The backend is first prepopulated, then the configured number of operations is issued while
    /// a single timer measures the elapsed wall-clock time. Any error aborts the run, and no
    /// report is produced.
    pub async fn run(&self, backend: SharedBackend) -> Result<Report> {
        let deadline = self.timeout.map(|timeout| tokio::time::Instant::now() + timeout);
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let pool = Arc::new(KeyPool::new());

        tracing::debug!(
            backend = backend.name(),
            workload = self.profile.name(),
            seed = self.seed,
            "{}",
            Phase::Prepopulating
        );
        let prepopulation = self.prepopulate(backend.as_ref(), &pool, &mut rng);
        self.within(deadline, Phase::Prepopulating, prepopulation)
            .await?;

        let counters = Arc::new(RunCounters::default());
        let workers: Vec<_> = (0..self.concurrency)
            .map(|_| Worker {
                backend: Arc::clone(&backend),
                pool: Arc::clone(&pool),
                counters: Arc::clone(&counters),
                profile: self.profile.clone(),
                payloads: PayloadGenerator::from_seed(self.payload_size, rng.next_u64()),
                rng: SmallRng::seed_from_u64(rng.next_u64()),
                tolerant: self.tolerant,
            })
            .collect();

        tracing::debug!(
            ops = self.num_ops,
            concurrency = self.concurrency,
            pool = pool.len(),
            "{}",
            Phase::Running
        );
        let start = Instant::now();
        self.within(deadline, Phase::Running, self.steady_state(workers))
            .await?;
        let elapsed = start.elapsed();

        tracing::debug!(?elapsed, pool = pool.len(), "{}", Phase::Reporting);
        Ok(counters.report(backend.name(), self, elapsed))
    }

    /// Awaits `future`, failing with [`EngineError::TimedOut`] once `deadline` has passed.
    async fn within<T>(
        &self,
        deadline: Option<tokio::time::Instant>,
        phase: Phase,
        future: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let (Some(deadline), Some(timeout)) = (deadline, self.timeout) else {
            return future.await;
        };

        tokio::time::timeout_at(deadline, future)
            .await
            .map_err(|_| EngineError::TimedOut { phase, timeout })?
    }

    async fn prepopulate(
        &self,
        backend: &dyn Backend,
        pool: &KeyPool,
        rng: &mut SmallRng,
    ) -> Result<()> {
        let mut payloads = PayloadGenerator::from_seed(self.payload_size, rng.next_u64());
        if self.prepopulate == 0 {
            return Ok(());
        }

        let requested = self.prepopulate;
        let ids = backend
            .bulk_insert(payloads.records(requested))
            .await
            .map_err(|cause| EngineError::PrepopulationFailed {
                backend: backend.name(),
                requested,
                inserted: 0,
                cause: Some(cause),
            })?;

        if ids.len() < requested {
            return Err(EngineError::PrepopulationFailed {
                backend: backend.name(),
                requested,
                inserted: ids.len(),
                cause: None,
            });
        }

        pool.extend(ids);
        Ok(())
    }

    async fn steady_state(&self, workers: Vec<Worker>) -> Result<()> {
        let tickets = Arc::new(Tickets::new(self.num_ops));

        if self.concurrency == 1 {
            for worker in workers {
                worker.run(tickets.clone()).await?;
            }
            return Ok(());
        }

        // Dropping the set on error aborts all workers that are still running.
        let mut tasks = JoinSet::new();
        for worker in workers {
            tasks.spawn(worker.run(Arc::clone(&tickets)));
        }
        while let Some(joined) = tasks.join_next().await {
            joined??;
        }

        Ok(())
    }
}

/// Hands out exactly `total` operations across all workers.
#[derive(Debug)]
struct Tickets {
    issued: AtomicU64,
    total: u64,
}

impl Tickets {
    fn new(total: u64) -> Self {
        Self {
            issued: AtomicU64::new(0),
            total,
        }
    }

    fn claim(&self) -> bool {
        self.issued.fetch_add(1, Ordering::Relaxed) < self.total
    }
}

/// Operation counts of a single run.
///
/// Every attempted operation is counted, regardless of its outcome.
#[derive(Debug, Default)]
struct RunCounters {
    writes: AtomicU64,
    reads: AtomicU64,
    write_failures: AtomicU64,
    read_failures: AtomicU64,
    reads_skipped: AtomicU64,
    reads_absent: AtomicU64,
}

impl RunCounters {
    /// Number of write attempts so far.
    fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of read attempts so far.
    fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn report(&self, backend: &'static str, benchmark: &Benchmark, elapsed: Duration) -> Report {
        let writes = self.writes();
        let reads = self.reads();
        Report {
            backend,
            workload: benchmark.profile.name().to_owned(),
            payload_size: benchmark.payload_size,
            total_ops: writes + reads,
            writes,
            reads,
            write_failures: self.write_failures.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            reads_skipped: self.reads_skipped.load(Ordering::Relaxed),
            reads_absent: self.reads_absent.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Issues operations until the shared tickets run out.
#[derive(Debug)]
struct Worker {
    backend: SharedBackend,
    pool: Arc<KeyPool>,
    counters: Arc<RunCounters>,
    profile: WorkloadProfile,
    payloads: PayloadGenerator,
    rng: SmallRng,
    tolerant: bool,
}

impl Worker {
    async fn run(mut self, tickets: Arc<Tickets>) -> Result<()> {
        while tickets.claim() {
            match self.profile.next_action(&mut self.rng) {
                Action::Write => self.write().await?,
                Action::Read => self.read().await?,
            }
        }
        Ok(())
    }

    async fn write(&mut self) -> Result<()> {
        let record = self.payloads.record();
        let result = self.backend.put(record).await;
        self.counters.writes.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(id) => self.pool.append(id),
            Err(cause) => self.fail(Action::Write, cause)?,
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<()> {
        let target = self.pool.sample_uniform(&mut self.rng);
        let result = self.backend.perform_read(target.as_ref()).await;
        self.counters.reads.fetch_add(1, Ordering::Relaxed);

        let counter = match result {
            Ok(ReadOutcome::Found) => return Ok(()),
            Ok(ReadOutcome::Absent) => &self.counters.reads_absent,
            Ok(ReadOutcome::Skipped) => &self.counters.reads_skipped,
            Err(cause) => return self.fail(Action::Read, cause),
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn fail(&self, action: Action, cause: BackendError) -> Result<()> {
        let backend = self.backend.name();
        if !self.tolerant {
            return Err(match action {
                Action::Write => EngineError::WriteFailed { backend, cause },
                Action::Read => EngineError::ReadFailed { backend, cause },
            });
        }

        tracing::warn!(
            error = &cause as &dyn std::error::Error,
            backend,
            %action,
            "operation failed"
        );
        let counter = match action {
            Action::Write => &self.counters.write_failures,
            Action::Read => &self.counters.read_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
