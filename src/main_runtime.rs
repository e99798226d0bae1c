use folio_gym::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured directives. The returned guard must
/// live until exit so buffered file output is flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    // `tracing_appender::rolling::daily` panics if it can't create the initial
    // log file, so check writability first.
    let (file_layer, guard) = match config.dir.as_deref() {
        Some(log_dir) if std::fs::create_dir_all(log_dir).is_ok() => {
            let test_path = log_dir.join(".folio_write_test");
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&test_path)
            {
                Ok(_) => {
                    let _ = std::fs::remove_file(&test_path);

                    // Daily rotating file appender
                    let file_appender = tracing_appender::rolling::daily(log_dir, "folio-gym.log");
                    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                    let layer = tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false) // No color codes in file
                        .with_target(true);
                    (Some(layer), Some(guard))
                }
                Err(e) => {
                    eprintln!(
                        "Warning: Could not write to log directory {} ({}), file logging disabled",
                        log_dir.display(),
                        e
                    );
                    (None, None)
                }
            }
        }
        Some(log_dir) => {
            eprintln!(
                "Warning: Could not create log directory {}, file logging disabled",
                log_dir.display()
            );
            (None, None)
        }
        None => (None, None),
    };

    // Console layer, plain or JSON
    let (console_layer, json_layer) = if config.json {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            ),
        )
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            ),
            None,
        )
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    if file_logging_enabled {
        if let Some(dir) = config.dir.as_deref() {
            tracing::info!("File logging enabled: {}/folio-gym.log", dir.display());
        }
    }

    guard
}
