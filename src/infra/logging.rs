use std::{fs, path::Path};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::infra::{config::LogConfig, error::AppError};

/// Installs the global subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LogConfig) -> Result<(), AppError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        )
        .with_target(true);

    match config.file.as_deref() {
        Some(path) => {
            let writer = file_writer(path)?;
            builder
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(AppError::LoggingInit)
        }
        None => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(AppError::LoggingInit),
    }
}

fn file_writer(path: &Path) -> Result<RollingFileAppender, AppError> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| AppError::LogFile {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
    })?;

    fs::create_dir_all(directory).map_err(|source| AppError::LogFile {
        path: path.to_path_buf(),
        source,
    })?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .map_err(|error| AppError::LoggingInit(Box::new(error)))
}
