//! provides logging helpers

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Environment variable selecting a log file instead of stderr.
pub const LOG_PATH_ENV_VAR: &str = "PODINFO_LOG_PATH";

const DEFAULT_LOG_FILE_NAME: &str = "podinfo-controller.log";

/// Builds the formatting layer.
///
/// Without a path, events are written to stderr. With a path, events go to a
/// daily rolling file next to it through a non-blocking writer; the returned
/// guard must be kept alive for buffered lines to be flushed.
pub fn get_fmt_layer<S>(
    log_path: Option<&Path>,
) -> (Box<dyn Layer<S> + Send + Sync + 'static>, Option<WorkerGuard>)
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let Some(log_path) = log_path else {
        let stderr_layer = layer().with_writer(std::io::stderr).with_target(true);
        return (stderr_layer.boxed(), None);
    };

    let directory = log_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE_NAME);

    let appender = tracing_appender::rolling::daily(directory, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    (file_layer.boxed(), Some(guard))
}
