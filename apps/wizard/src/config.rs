use std::{fs, io::ErrorKind, path::Path, str::FromStr};

use anyhow::Context;
use ingest_core::IngestConfig;
use tracing::warn;

const DEFAULT_CONFIG_FILE: &str = "wizard.toml";

/// Defaults, then `wizard.toml` (or `path`), then `APP__*` environment
/// overrides. The result is validated before it is returned.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<IngestConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?
            .with_context(|| format!("config file '{}' does not exist", path.display()))?,
        None => read_config_file(Path::new(DEFAULT_CONFIG_FILE))?.unwrap_or_default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    config.validate().context("invalid ingestion settings")?;
    Ok(config)
}

fn read_config_file(path: &Path) -> anyhow::Result<Option<IngestConfig>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(error)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    };
    let config = toml::from_str::<IngestConfig>(&raw)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
    Ok(Some(config))
}

pub fn apply_env_overrides(config: &mut IngestConfig, lookup: impl Fn(&str) -> Option<String>) {
    override_with(&lookup, "APP__PAGE_SIZE", &mut config.page_size);
    override_with(&lookup, "APP__TRANSFER_MIN_MS", &mut config.transfer_min_ms);
    override_with(&lookup, "APP__TRANSFER_MAX_MS", &mut config.transfer_max_ms);
    override_with(&lookup, "APP__CONVERT_MIN_MS", &mut config.convert_min_ms);
    override_with(&lookup, "APP__CONVERT_MAX_MS", &mut config.convert_max_ms);
    override_with(&lookup, "APP__PROGRESS_STEP", &mut config.progress_step);
    override_with(&lookup, "APP__EVENT_CAPACITY", &mut config.event_capacity);
}

fn override_with<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value = %raw, "ignoring unparsable environment override"),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn temp_file(contents: &str) -> std::path::PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("wizard_config_test_{suffix}.toml"));
        fs::write(&path, contents).expect("write temp config");
        path
    }

    #[test]
    fn file_values_override_defaults() {
        let path = temp_file("page_size = 10\ntransfer_max_ms = 4000\n");
        let config = read_config_file(&path)
            .expect("read")
            .expect("file exists");
        fs::remove_file(&path).expect("cleanup");

        assert_eq!(config.page_size, 10);
        assert_eq!(config.transfer_max_ms, 4000);
        assert_eq!(config.transfer_min_ms, 2000);
        assert_eq!(config.progress_step, 10);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = env::temp_dir().join("wizard_config_test_does_not_exist.toml");
        assert!(read_config_file(&path).expect("read").is_none());
    }

    #[test]
    fn malformed_file_is_reported() {
        let path = temp_file("page_size = \"many\"\n");
        let result = read_config_file(&path);
        fs::remove_file(&path).expect("cleanup");
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_win_and_bad_values_are_skipped() {
        let vars: HashMap<&str, &str> = [
            ("APP__PAGE_SIZE", "8"),
            ("APP__CONVERT_MIN_MS", " 500 "),
            ("APP__PROGRESS_STEP", "lots"),
        ]
        .into_iter()
        .collect();

        let mut config = IngestConfig::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.page_size, 8);
        assert_eq!(config.convert_min_ms, 500);
        assert_eq!(config.progress_step, 10);
        assert_eq!(config.transfer_max_ms, 3000);
    }

    #[test]
    fn explicit_path_must_exist() {
        let path = env::temp_dir().join("wizard_config_test_explicit_missing.toml");
        assert!(load_settings(Some(&path)).is_err());
    }
}
