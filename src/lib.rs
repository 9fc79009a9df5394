pub mod studyspace;

pub use studyspace::error::{Result, StudyspaceError};
pub use studyspace::{Studyspace, StudyspaceConfig};

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber: env-filtered stderr output plus
/// a daily-rolling log file under `logs_dir`.
///
/// Safe to call multiple times; only the first call has an effect. The
/// non-blocking writer guard is held for the lifetime of the process.
pub(crate) fn init_tracing(logs_dir: &Path) {
    static TRACING_INIT: OnceLock<WorkerGuard> = OnceLock::new();
    TRACING_INIT.get_or_init(|| {
        let file_appender = tracing_appender::rolling::daily(logs_dir, "studyspace.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // try_init: tests may race to install a subscriber; losing is fine.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .try_init();

        guard
    });
}
