//! provides logging helpers

use std::env;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::Registry;
use utils::logging::LOG_PATH_ENV_VAR;

/// initiate the global tracing subscriber
///
/// The returned guard flushes the log file on drop; keep it for the lifetime of
/// the process.
pub fn init() -> Option<WorkerGuard> {
    let log_path = env::var_os(LOG_PATH_ENV_VAR).map(PathBuf::from);
    let (fmt_layer, guard) = utils::logging::get_fmt_layer::<Registry>(log_path.as_deref());

    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    registry().with(fmt_layer.with_filter(env_filter)).init();
    guard
}
