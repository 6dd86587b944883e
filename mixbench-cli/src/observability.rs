use std::env;
use std::io::IsTerminal;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

use crate::config::{Config, LogFormat};

pub fn init_tracing(config: &Config) {
    let (level, env_filter) = parse_rust_log(config.logging.level);

    let format = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let format: Box<dyn Layer<Registry> + Send + Sync> = match resolve_format(config.logging.format)
    {
        LogFormat::Json => format.json().boxed(),
        LogFormat::Simplified => format.compact().with_ansi(false).boxed(),
        LogFormat::Pretty | LogFormat::Auto => format.pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(format.with_filter(level))
        .with(env_filter)
        .init();
}

fn resolve_format(format: LogFormat) -> LogFormat {
    match format {
        LogFormat::Auto if std::io::stderr().is_terminal() => LogFormat::Pretty,
        LogFormat::Auto => LogFormat::Simplified,
        other => other,
    }
}

pub fn parse_rust_log(default: LevelFilter) -> (LevelFilter, EnvFilter) {
    // Try to parse RUST_LOG as a simple level filter and apply default levels internally.
    // Otherwise, use it literally if the user knows which overrides they want to run.
    let level = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => match value.parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => return (LevelFilter::TRACE, EnvFilter::new(value)),
        },
        Err(_) => default,
    };

    // This is the maximum verbosity that will be logged, we filter this down to `level`.
    let env_filter = EnvFilter::new(
        "INFO,\
        fjall=WARN,\
        lsm_tree=WARN,\
        mixbench=TRACE,\
        mixbench_cli=TRACE,\
        mixbench_engine=TRACE,\
        ",
    );

    (level, env_filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_formats_are_kept() {
        assert_eq!(resolve_format(LogFormat::Json), LogFormat::Json);
        assert_eq!(resolve_format(LogFormat::Simplified), LogFormat::Simplified);
        assert_ne!(resolve_format(LogFormat::Auto), LogFormat::Auto);
    }
}
