use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use mixbench_engine::Report;
use mixbench_engine::profile::BUILTIN_PROFILES;

use crate::config::{Config, Overrides};
use crate::{observability, storage};

/// Runs a weighted mix of reads and writes against a storage backend and reports throughput.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    /// workload profile: write-heavy, read-heavy, mixed, write or read
    #[argh(option, short = 'w')]
    pub workload: Option<String>,

    /// number of operations to perform
    #[argh(option)]
    pub num_ops: Option<u64>,

    /// size of the random string data in each record
    #[argh(option)]
    pub data_size: Option<usize>,

    /// number of records inserted before measuring
    #[argh(option)]
    pub prepopulate: Option<usize>,

    /// number of workers issuing operations in parallel
    #[argh(option)]
    pub concurrency: Option<usize>,

    /// seed for all random decisions of the run
    #[argh(option)]
    pub seed: Option<u64>,

    /// log and count failed operations instead of aborting the run
    #[argh(switch)]
    pub tolerant: bool,

    #[argh(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            workload: self.workload.clone(),
            num_ops: self.num_ops,
            payload_size: self.data_size,
            prepopulate: self.prepopulate,
            concurrency: self.concurrency,
            seed: self.seed,
            tolerant: self.tolerant.then_some(true),
        }
    }
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Profiles(ProfilesCommand),
    Version(VersionCommand),
}

/// list the built-in workload profiles and their weights
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "profiles")]
struct ProfilesCommand {}

/// print the mixbench version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    match args.command {
        Some(Command::Version(VersionCommand {})) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(Command::Profiles(ProfilesCommand {})) => {
            for (name, writes, reads) in BUILTIN_PROFILES {
                println!("{name}: writes {writes}, reads {reads}");
            }
            return Ok(());
        }
        None => {}
    }

    let config = Config::load(args.config.as_deref(), args.overrides())
        .context("failed to load configuration")?;

    observability::init_tracing(&config);
    tracing::debug!(?config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("bench-rt")
        .enable_all()
        .build()?;

    let report = runtime.block_on(run(config))?;
    println!("{report}");

    Ok(())
}

async fn run(config: Config) -> Result<Report> {
    // Resolve the workload before touching the backend.
    let benchmark = config.benchmark()?;
    let backend = storage::open(&config.backend).await?;

    tracing::info!(
        backend = backend.name(),
        workload = benchmark.profile().name(),
        seed = benchmark.seed(),
        "starting benchmark"
    );

    let report = benchmark.run(backend).await.inspect_err(|err| {
        tracing::error!(
            error = err as &dyn std::error::Error,
            phase = %err.phase(),
            "benchmark aborted"
        );
    })?;

    tracing::info!(
        ops_per_sec = report.ops_per_sec(),
        write_failures = report.write_failures,
        read_failures = report.read_failures,
        reads_skipped = report.reads_skipped,
        reads_absent = report.reads_absent,
        "benchmark complete"
    );
    if report.has_failures() {
        tracing::warn!("some operations failed, throughput includes failed attempts");
    }

    Ok(report)
}
