use std::{path::Path, sync::Arc};

use crate::{
    backend::memory::InMemoryBackend,
    infra::{
        self, config::AppConfig, config::FileConfigAdapter, contracts::ConfigAdapter,
        error::AppError, fixture,
    },
};

/// Loaded configuration plus the backend it describes.
pub struct Bootstrapped {
    pub config: AppConfig,
    pub backend: Arc<InMemoryBackend>,
}

pub fn bootstrap(config_path: Option<&Path>) -> anyhow::Result<Bootstrapped> {
    let config = FileConfigAdapter::new(config_path).load()?;
    infra::logging::init(&config.logging)?;

    let backend = build_backend(&config)?;
    Ok(Bootstrapped { config, backend })
}

fn build_backend(config: &AppConfig) -> Result<Arc<InMemoryBackend>, AppError> {
    let fixture = match config.backend.fixture.as_deref() {
        Some(path) => fixture::load(path)?,
        None => fixture::builtin()?,
    };

    let backend = InMemoryBackend::new(config.backend.page_size);
    fixture.seed(&backend)?;
    tracing::debug!(page_size = config.backend.page_size, "in-memory backend seeded");
    Ok(Arc::new(backend))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn builds_backend_from_builtin_fixture_by_default() {
        let backend = build_backend(&AppConfig::default()).expect("backend should build");

        assert_eq!(backend.messages_in(101).len(), 2);
    }

    #[test]
    fn builds_backend_from_configured_fixture() {
        let temp_dir = tempfile::tempdir().expect("must create temp dir");
        let fixture_path = temp_dir.path().join("seed.toml");
        fs::write(
            &fixture_path,
            r#"[[users]]
id = 1
name = "solo"
display_name = "Solo"

[[channels]]
id = 9
kind = "group"
name = "notes"
members = [1]

[[messages]]
channel = 9
sender = 1
body = "remember the milk"
"#,
        )
        .expect("must write fixture");

        let mut config = AppConfig::default();
        config.backend.fixture = Some(fixture_path);

        let backend = build_backend(&config).expect("backend should build");

        assert_eq!(backend.messages_in(9).len(), 1);
        assert!(backend.messages_in(101).is_empty());
    }

    #[test]
    fn missing_fixture_fails() {
        let mut config = AppConfig::default();
        config.backend.fixture = Some("./missing-seed.toml".into());

        let error = build_backend(&config).err().expect("missing fixture must fail");

        assert!(matches!(error, AppError::FixtureRead { .. }));
    }
}
