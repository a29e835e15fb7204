use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Local-timezone timestamp formatter
struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(w, "{}", now.to_rfc3339())
    }
}

/// Initialize the logging stack: console output always, plus a daily rolling
/// file when `FEEDBRIDGE_LOG_DIR` points at a writable directory.
pub fn init_logger() {
    // Capture log-macro records from dependencies
    let _ = tracing_log::LogTracer::init();

    let log_dir = std::env::var("FEEDBRIDGE_LOG_DIR").ok().map(PathBuf::from);

    let mut file_guard: Option<tracing_appender::non_blocking::WorkerGuard> = None;
    let mut file_layer = None;

    if let Some(dir) = log_dir {
        if fs::create_dir_all(&dir).is_ok() && is_log_dir_writable(&dir) {
            let file_appender = tracing_appender::rolling::daily(dir, "feedbridge.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            file_guard = Some(guard);
            file_layer = Some(
                fmt::Layer::new()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(LocalTimer),
            );
        } else {
            eprintln!("log directory is not writable, console output only");
        }
    }

    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_timer(LocalTimer);

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Some(guard) = file_guard {
        std::mem::forget(guard);
        info!("logging initialized (console + file)");
    } else {
        info!("logging initialized (console)");
    }
}

fn is_log_dir_writable(dir: &PathBuf) -> bool {
    let probe = dir.join(".write_test");
    let result = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&probe)
        .and_then(|mut f| f.write_all(b"ok"));

    if result.is_ok() {
        let _ = fs::remove_file(probe);
        true
    } else {
        false
    }
}
