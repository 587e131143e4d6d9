//! Logging setup for the command line tool; the library itself only emits `tracing` events.

use std::io;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy)]
pub(crate) struct LogConfig {
    pub(crate) level_filter: LevelFilter,
    /// Let `RUST_LOG` decide instead of `level_filter`.
    pub(crate) use_env_filter: bool,
    pub(crate) with_ansi: bool,
}

pub(crate) fn init_logging(config: &LogConfig) {
    let filter = if config.use_env_filter {
        EnvFilter::builder().with_default_directive(config.level_filter.into()).from_env_lossy()
    } else {
        EnvFilter::default().add_directive(config.level_filter.into())
    };

    let layer = fmt::layer().with_writer(io::stderr).with_ansi(config.with_ansi).with_target(false).without_time();
    tracing_subscriber::registry().with(filter).with(layer).init();
}
