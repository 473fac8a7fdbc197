//! Tracing subscriber setup for front-ends embedding sprig

use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Filter directives used when `RUST_LOG` is not set
pub fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("sprig_core={level},sprig_resolver={level},sprig_config={level}")
}

/// Install a text subscriber; see [`setup_logging_with`]
pub fn setup_logging(verbose: bool) -> bool {
    setup_logging_with(verbose, LogFormat::Text)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity flag. Returns `false` when a
/// subscriber was already installed.
pub fn setup_logging_with(verbose: bool, format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
