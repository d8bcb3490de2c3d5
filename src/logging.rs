use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogConfig, LogRotation};

const LOG_FILE_PREFIX: &str = "opta-pipeline.log";

/// Installs the tracing subscriber: console layer always, rolling file layer
/// when a writable log directory is configured. The returned guard flushes
/// buffered file output on drop, so the caller must hold it for the life of
/// the run.
pub fn init(cfg: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match cfg.dir.as_deref().and_then(|dir| file_writer(dir, cfg)) {
        Some((writer, guard)) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

fn file_writer(dir: &Path, cfg: &LogConfig) -> Option<(NonBlocking, WorkerGuard)> {
    // The rolling appender aborts the process if it cannot create its first
    // file, so writability has to be checked up front.
    if fs::create_dir_all(dir).is_err() {
        eprintln!(
            "warning: could not create log directory {}, file logging disabled",
            dir.display()
        );
        return None;
    }
    let probe = dir.join(".write_test");
    match fs::OpenOptions::new().create(true).append(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
        }
        Err(err) => {
            eprintln!(
                "warning: log directory {} not writable ({err}), file logging disabled",
                dir.display()
            );
            return None;
        }
    }

    let rotation = match cfg.rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Never => Rotation::NEVER,
    };
    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(cfg.keep_files)
        .build(dir);
    match appender {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(err) => {
            eprintln!("warning: file logging disabled: {err}");
            None
        }
    }
}
