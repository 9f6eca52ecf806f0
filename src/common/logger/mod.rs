use std::{fs, path::Path};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;
pub mod writer;

pub use formatter::LineFormatter;
pub use writer::CappedFileWriter;

use crate::configs::Config;

/// Installs the global subscriber: coloured stdout plus an optional capped
/// log file. `RUST_LOG` overrides the configured level and filters.
pub fn init(config: &Config) {
    let logging = &config.logging;
    let filter_str = if logging.filters.is_empty() {
        format!("{},reqwest=warn,hyper=warn", logging.level)
    } else {
        format!("{},reqwest=warn,hyper=warn,{}", logging.level, logging.filters)
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    let stdout_layer = fmt::layer()
        .event_format(LineFormatter::new(true))
        .with_ansi(true);

    let file_layer = logging.file.as_ref().map(|file_config| {
        if let Some(parent) = Path::new(&file_config.path).parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Failed to create log directory: {}", e);
            }
        }

        fmt::layer()
            .with_writer(CappedFileWriter::new(&file_config.path, file_config.max_lines))
            .event_format(LineFormatter::new(false))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}
