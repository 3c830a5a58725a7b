// src/logging.rs

//! Logging setup for `rundag` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` on the command line (applies to every target)
//! 2. `RUNDAG_LOG`, in `EnvFilter` syntax (`debug`, `rundag::exec=trace,info`)
//! 3. `info`
//!
//! Output goes to stderr; stdout carries manifests, plans and run summaries.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Environment variable holding the filter when no CLI level is given.
pub const LOG_ENV: &str = "RUNDAG_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env_value.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter '{directives}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Filter directives for the given CLI level and `RUNDAG_LOG` value.
///
/// A blank environment value counts as unset.
pub fn filter_directives(cli_level: Option<LogLevel>, env_value: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level.as_directive().to_string();
    }
    match env_value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_DIRECTIVE.to_string(),
    }
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
