//! Logging setup.
//!
//! [`init_with_verbosity`] installs a stderr logger printing lines such as
//! `    12ms DEBUG inkgrid_grid: 3 strategies tried`. The level comes from
//! `INKGRID_LOG` (`off`, `error`, `warn`, `info`, `debug`, `trace`) when it
//! parses, otherwise from the CLI's `-v` count.
//!
//! With the `tracing` feature, [`init_tracing`] installs a `tracing-subscriber`
//! instead, filtered by `RUST_LOG` or by [`default_filter`].

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable overriding the verbosity count.
pub const LOG_ENV: &str = "INKGRID_LOG";

const CRATES: [&str; 5] = [
    "inkgrid",
    "inkgrid_core",
    "inkgrid_grid",
    "inkgrid_ink",
    "inkgrid_match",
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggerError {
    #[error("a different logger is already installed")]
    Foreign,
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let krate = record.target().split("::").next().unwrap_or("");
        let line = format!(
            "{:>6}ms {:<5} {}: {}\n",
            self.started.elapsed().as_millis(),
            record.level(),
            krate,
            record.args()
        );
        // One write per line so concurrent verifications do not interleave.
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

fn resolve_level(verbose: u8, env: Option<&str>) -> LevelFilter {
    if let Some(level) = env.and_then(|v| v.trim().parse().ok()) {
        return level;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn env_level() -> Option<String> {
    std::env::var(LOG_ENV).ok()
}

/// Install the stderr logger.
///
/// `verbose` is the `-v` count: `0` warn, `1` info, `2` debug, `3+` trace.
/// Returns the level in effect; later calls keep the first level.
pub fn init_with_verbosity(verbose: u8) -> Result<LevelFilter, LoggerError> {
    let mut first = false;
    let logger = LOGGER.get_or_init(|| {
        first = true;
        StderrLogger {
            level: resolve_level(verbose, env_level().as_deref()),
            started: Instant::now(),
        }
    });
    if first {
        log::set_logger(logger).map_err(|_| LoggerError::Foreign)?;
        log::set_max_level(logger.level);
    }
    Ok(logger.level)
}

/// `EnvFilter` directives enabling `level` for every workspace crate.
pub fn default_filter(level: LevelFilter) -> String {
    let level = level.to_string().to_ascii_lowercase();
    CRATES
        .iter()
        .map(|c| format!("{c}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install a `tracing` subscriber with span-close events. `RUST_LOG` wins
/// over the verbosity count.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_filter(resolve_level(
            verbose,
            env_level().as_deref(),
        )))
    });
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
