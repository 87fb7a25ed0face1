use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LOG_FILE_PREFIX: &str = "classroom-vision";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays free
/// for the JSON-lines record stream.
///
/// Calling it again is a no-op. If the log directory cannot be opened the
/// file layer is dropped and a warning is emitted once stderr logging is up.
pub fn init_tracing(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let registry = Registry::default().with(env_filter).with(stderr_layer);

    if !config.enable_file_logs {
        let _ = registry.try_init();
        return;
    }

    match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(30)
        .build(&config.log_dir)
    {
        Ok(file_appender) => {
            let file_layer = fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .json();
            let _ = registry.with(file_layer).try_init();
        }
        Err(e) => {
            if registry.try_init().is_ok() {
                tracing::warn!(
                    log_dir = %config.log_dir,
                    error = %e,
                    "File logging disabled, rolling appender unavailable"
                );
            }
        }
    }
}
