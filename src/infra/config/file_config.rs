use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{
    app_config::{DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_MS, MAX_PAGE_SIZE},
    AppConfig, BackendConfig, DraftConfig, LogConfig,
};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub backend: Option<FileBackendConfig>,
    pub drafts: Option<FileDraftConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(backend) = self.backend {
            backend.merge_into(&mut config.backend);
        }

        if let Some(drafts) = self.drafts {
            drafts.merge_into(&mut config.drafts);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file) = self.file {
            config.file = Some(file);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileBackendConfig {
    pub request_timeout_ms: Option<u64>,
    pub page_size: Option<usize>,
    pub fixture: Option<PathBuf>,
}

impl FileBackendConfig {
    fn merge_into(self, config: &mut BackendConfig) {
        if let Some(timeout_ms) = self.request_timeout_ms {
            config.request_timeout_ms = normalize_request_timeout(timeout_ms);
        }

        if let Some(page_size) = self.page_size {
            config.page_size = normalize_page_size(page_size);
        }

        if let Some(fixture) = self.fixture {
            config.fixture = Some(fixture);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileDraftConfig {
    pub keystroke_interval_ms: Option<u64>,
}

impl FileDraftConfig {
    fn merge_into(self, config: &mut DraftConfig) {
        if let Some(interval_ms) = self.keystroke_interval_ms {
            config.keystroke_interval_ms = interval_ms;
        }
    }
}

/// Zero means the default.
fn normalize_request_timeout(timeout_ms: u64) -> u64 {
    match timeout_ms {
        0 => DEFAULT_REQUEST_TIMEOUT_MS,
        timeout_ms => timeout_ms,
    }
}

fn normalize_page_size(page_size: usize) -> usize {
    match page_size {
        0 => DEFAULT_PAGE_SIZE,
        size => size.min(MAX_PAGE_SIZE),
    }
}
