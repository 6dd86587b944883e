//! Configuration for the benchmark binary.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Command line flags
//! 2. Environment variables (prefixed with `MB__`)
//! 3. YAML configuration file (specified via `-c` or `--config` flag)
//! 4. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `MB__` as a prefix and double underscores (`__`) to denote nested
//! configuration structures. For example:
//!
//! - `MB__WORKLOAD=read-heavy` selects the workload profile
//! - `MB__BACKEND__TYPE=fjall` selects the column-family backend
//! - `MB__BACKEND__PATH=/data` sets its directory
//!
//! # YAML Configuration File
//!
//! The above configuration in YAML format would look like this:
//!
//! ```yaml
//! workload: read-heavy
//!
//! backend:
//!   type: fjall
//!   path: /data
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use figment::providers::{Env, Format, Serialized, Yaml};
use mixbench_engine::engine::{DEFAULT_OPS, DEFAULT_PAYLOAD_SIZE, DEFAULT_PREPOPULATE};
use mixbench_engine::{Benchmark, WorkloadProfile};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "MB__";

/// The storage backend to run the benchmark against.
///
/// Used in: [`Config::backend`]
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Storage {
    /// In-memory key-value store.
    ///
    /// # Example
    ///
    /// ```yaml
    /// backend:
    ///   type: memory
    /// ```
    Memory,

    /// Column-family store backed by an embedded keyspace.
    ///
    /// # Example
    ///
    /// ```yaml
    /// backend:
    ///   type: fjall
    ///   path: data/fjall
    /// ```
    Fjall {
        /// Directory of the keyspace. Created if it does not exist.
        path: PathBuf,
    },

    /// Document store with one JSON document per file.
    ///
    /// # Example
    ///
    /// ```yaml
    /// backend:
    ///   type: documents
    ///   path: data/documents
    ///   clear: true
    /// ```
    Documents {
        /// Directory of the collection. Created if it does not exist.
        path: PathBuf,
        /// Remove documents of previous runs before prepopulating.
        #[serde(default = "default_true")]
        clear: bool,
    },
}

fn default_true() -> bool {
    true
}

/// User-defined read/write weights, replacing the built-in weights of the workload.
///
/// Used in: [`Config::weights`]
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Weights {
    /// Relative weight of writes.
    pub writes: f64,
    /// Relative weight of reads.
    pub reads: f64,
}

/// Log output format.
///
/// Controls how log messages are formatted. The format can be explicitly specified or
/// auto-detected based on whether output is to a TTY.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    Pretty,

    /// Simplified plain text output.
    Simplified,

    /// Dump out JSON lines.
    Json,
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr, so that stdout only carries the report.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// The `RUST_LOG` environment variable takes precedence and provides more granular control
    /// per module if needed.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `MB__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format.
    ///
    /// # Default
    ///
    /// `Auto` (pretty for TTY, simplified otherwise)
    ///
    /// # Environment Variable
    ///
    /// `MB__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for a benchmark run.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Name of the workload profile.
    ///
    /// One of `write-heavy`, `read-heavy`, `mixed`, `write` or `read`. With [`Config::weights`],
    /// this is just the name shown in the report.
    ///
    /// # Default
    ///
    /// `mixed`
    pub workload: String,

    /// Custom read/write weights.
    ///
    /// # Default
    ///
    /// `None` (weights of the named workload)
    pub weights: Option<Weights>,

    /// Number of operations issued after prepopulation. Must be positive.
    ///
    /// # Default
    ///
    /// `1000`
    pub num_ops: u64,

    /// Number of characters in each record's payload. Must be positive.
    ///
    /// # Default
    ///
    /// `10`
    pub payload_size: usize,

    /// Number of records inserted before the timed steady state.
    ///
    /// # Default
    ///
    /// `100`
    pub prepopulate: usize,

    /// Number of workers issuing operations in parallel.
    ///
    /// # Default
    ///
    /// `1` (strictly sequential)
    pub concurrency: usize,

    /// Seed for all random decisions of the run.
    ///
    /// # Default
    ///
    /// `None` (random)
    pub seed: Option<u64>,

    /// Log and count failed operations instead of aborting the run.
    ///
    /// # Default
    ///
    /// `false`
    pub tolerant: bool,

    /// Abort the run if the steady state takes longer than this.
    ///
    /// # Default
    ///
    /// `None` (no timeout)
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// The storage backend to benchmark.
    ///
    /// # Default
    ///
    /// [`Storage::Memory`]
    pub backend: Storage,

    /// Logging configuration.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workload: "mixed".into(),
            weights: None,
            num_ops: DEFAULT_OPS,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            prepopulate: DEFAULT_PREPOPULATE,
            concurrency: 1,
            seed: None,
            tolerant: false,
            timeout: None,
            backend: Storage::Memory,
            logging: Logging::default(),
        }
    }
}

/// Settings given on the command line, which take precedence over all other sources.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    /// See [`Config::workload`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload: Option<String>,
    /// See [`Config::num_ops`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ops: Option<u64>,
    /// See [`Config::payload_size`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<usize>,
    /// See [`Config::prepopulate`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepopulate: Option<usize>,
    /// See [`Config::concurrency`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// See [`Config::seed`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// See [`Config::tolerant`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerant: Option<bool>,
}

impl Config {
    /// Loads configuration from defaults, the optional YAML file, the environment and `overrides`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The YAML configuration file cannot be read or parsed
    /// - Environment variables contain invalid values
    /// - The resulting configuration fails [validation](Self::validate)
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that the types alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.num_ops == 0 {
            bail!("num_ops must be a positive integer");
        }
        if self.payload_size == 0 {
            bail!("payload_size must be a positive integer");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be a positive integer");
        }
        Ok(())
    }

    /// Resolves the workload profile, applying custom weights if configured.
    pub fn profile(&self) -> mixbench_engine::Result<WorkloadProfile> {
        match self.weights {
            Some(Weights { writes, reads }) => {
                WorkloadProfile::custom(self.workload.as_str(), writes, reads)
            }
            None => WorkloadProfile::resolve(&self.workload),
        }
    }

    /// Creates the benchmark described by this configuration.
    pub fn benchmark(&self) -> mixbench_engine::Result<Benchmark> {
        let mut builder = Benchmark::builder(self.profile()?)
            .ops(self.num_ops)
            .payload_size(self.payload_size)
            .prepopulate(self.prepopulate)
            .concurrency(self.concurrency)
            .tolerant(self.tolerant)
            .timeout(self.timeout);
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use mixbench_engine::EngineError;

    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None, Overrides::default()).unwrap();

            assert_eq!(config.workload, "mixed");
            assert_eq!(config.num_ops, 1000);
            assert_eq!(config.payload_size, 10);
            assert_eq!(config.prepopulate, 100);
            assert_eq!(config.concurrency, 1);
            assert!(!config.tolerant);
            assert_eq!(config.timeout, None);
            assert_eq!(config.backend, Storage::Memory);
            assert_eq!(config.logging.level, LevelFilter::INFO);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MB__WORKLOAD", "read-heavy");
            jail.set_env("MB__NUM_OPS", "250");
            jail.set_env("MB__TIMEOUT", "30s");
            jail.set_env("MB__BACKEND__TYPE", "fjall");
            jail.set_env("MB__BACKEND__PATH", "/tmp/keyspace");
            jail.set_env("MB__LOGGING__LEVEL", "debug");
            jail.set_env("MB__LOGGING__FORMAT", "json");

            let config = Config::load(None, Overrides::default()).unwrap();

            assert_eq!(config.workload, "read-heavy");
            assert_eq!(config.num_ops, 250);
            assert_eq!(config.timeout, Some(Duration::from_secs(30)));
            assert_eq!(
                config.backend,
                Storage::Fjall {
                    path: PathBuf::from("/tmp/keyspace")
                }
            );
            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            assert_eq!(config.logging.format, LogFormat::Json);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
                workload: ingest
                weights:
                    writes: 95
                    reads: 5
                payload_size: 64
                prepopulate: 0
                backend:
                    type: documents
                    path: data/documents
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("MB__PAYLOAD_SIZE", "32");

            let config = Config::load(Some(tempfile.path()), Overrides::default()).unwrap();

            // Env should overwrite the yaml config
            assert_eq!(config.payload_size, 32);
            assert_eq!(config.prepopulate, 0);
            assert_eq!(
                config.backend,
                Storage::Documents {
                    path: PathBuf::from("data/documents"),
                    clear: true,
                }
            );

            let profile = config.profile().unwrap();
            assert_eq!(profile.name(), "ingest");
            assert_eq!(profile.weights(), (95.0, 5.0));

            Ok(())
        });
    }

    #[test]
    fn overrides_win() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MB__WORKLOAD", "read-heavy");
            jail.set_env("MB__SEED", "1");

            let overrides = Overrides {
                workload: Some("write-heavy".into()),
                seed: Some(42),
                tolerant: Some(true),
                ..Default::default()
            };
            let config = Config::load(None, overrides).unwrap();

            assert_eq!(config.workload, "write-heavy");
            assert_eq!(config.seed, Some(42));
            assert!(config.tolerant);
            assert_eq!(config.benchmark().unwrap().seed(), 42);

            Ok(())
        });
    }

    #[test]
    fn rejects_zero_ops() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MB__NUM_OPS", "0");

            let err = Config::load(None, Overrides::default()).unwrap_err();
            assert!(err.to_string().contains("num_ops"));

            Ok(())
        });
    }

    #[test]
    fn rejects_unknown_log_format() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MB__LOGGING__FORMAT", "xml");

            assert!(Config::load(None, Overrides::default()).is_err());

            Ok(())
        });
    }

    #[test]
    fn unknown_workload_fails_on_resolve() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MB__WORKLOAD", "bogus");

            let config = Config::load(None, Overrides::default()).unwrap();
            assert!(matches!(
                config.benchmark().unwrap_err(),
                EngineError::InvalidWorkload { .. }
            ));

            Ok(())
        });
    }
}
