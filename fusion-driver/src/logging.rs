//! Logging setup and the per-invocation execution log.

use std::path::Path;

use fusion_driver_shared::errors::{FusionError, FusionResult};
use parking_lot::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::util::Invocation;

/// File name used when logging to a directory.
pub const LOG_FILE_NAME: &str = "fusion-driver.log";

/// Receives a record for every vendor tool invocation.
///
/// The driver reports the command before it runs and the trimmed output
/// after it finishes, whether or not the command succeeded.
pub trait ExecLog: Send + Sync {
    fn executing(&self, invocation: &Invocation);

    fn finished(&self, stdout: &str, stderr: &str);
}

/// Forwards execution records to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingExecLog;

impl ExecLog for TracingExecLog {
    fn executing(&self, invocation: &Invocation) {
        tracing::info!("{}", executing_line(invocation));
    }

    fn finished(&self, stdout: &str, stderr: &str) {
        tracing::info!("stdout: {}", stdout);
        tracing::info!("stderr: {}", stderr);
    }
}

/// Keeps execution records in memory.
///
/// Useful for callers that attach tool output to their own reports.
#[derive(Debug, Default)]
pub struct BufferedExecLog {
    lines: Mutex<Vec<String>>,
}

impl BufferedExecLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl ExecLog for BufferedExecLog {
    fn executing(&self, invocation: &Invocation) {
        self.lines.lock().push(executing_line(invocation));
    }

    fn finished(&self, stdout: &str, stderr: &str) {
        let mut lines = self.lines.lock();
        lines.push(format!("stdout: {}", stdout));
        lines.push(format!("stderr: {}", stderr));
    }
}

fn executing_line(invocation: &Invocation) -> String {
    format!(
        "Executing: {} [{}]",
        invocation.program.display(),
        invocation.args_lossy().join(" ")
    )
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `level` when set. With `log_dir`, records are also
/// written to [`LOG_FILE_NAME`] in that directory through a non-blocking
/// writer; keep the returned guard alive until exit so it gets flushed.
///
/// Calling this twice is harmless: the second subscriber is discarded.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> FusionResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| FusionError::Config(format!("invalid log level {:?}: {}", level, e)))?;

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    if let Err(e) = result {
        tracing::debug!("Logging already initialized: {}", e);
    }

    Ok(guard)
}
