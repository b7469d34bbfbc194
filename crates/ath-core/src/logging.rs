//! Logging initialization using the `tracing` ecosystem.
//!
//! Console output is always human-readable. When a log directory is given, a
//! second layer writes to a daily-rotating file via `tracing-appender`, either
//! as plain text or as JSON lines for log shippers. `RUST_LOG` overrides the
//! configured level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Options for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogOptions<'a> {
    /// Default filter if `RUST_LOG` is not set (e.g. `"info"`).
    pub level: &'a str,
    /// Directory for daily-rotating log files. `None` logs to the console only.
    pub dir: Option<&'a str>,
    /// Log file prefix, usually the recipe's module name.
    pub file_prefix: &'a str,
    /// Write the file layer as JSON lines instead of text.
    pub json_file: bool,
}

/// Initialize the global tracing subscriber.
///
/// Must be called at most once per process; a second call panics inside
/// `tracing-subscriber` because the global default is already set.
pub fn init_logging(opts: &LogOptions<'_>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(opts.level));

    let console_layer = fmt::layer().with_target(true).with_ansi(true);
    let registry = tracing_subscriber::registry().with(env_filter).with(console_layer);

    let Some(dir) = opts.dir else {
        registry.init();
        return;
    };

    let file_appender = tracing_appender::rolling::daily(dir, opts.file_prefix);
    if opts.json_file {
        let file_layer = fmt::layer().json().with_writer(file_appender).with_target(true);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false).with_target(true);
        registry.with(file_layer).init();
    }
}
