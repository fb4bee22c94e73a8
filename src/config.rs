//! TOML settings shared by the trainer and the predictor.
//!
//! Settings live in `maintpred.toml` inside the application root unless a path
//! is given explicitly. Every field has a default, so a missing file or a
//! partial one is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};
use crate::dataset::LabelSource;
use crate::ml::forest::ForestOptions;

/// File name of the settings file inside the application root.
pub const CONFIG_FILE_NAME: &str = "maintpred.toml";

/// Default artifact location, relative to the working directory.
pub const DEFAULT_MODEL_FILE: &str = "hhmodel.json";

/// Errors that may occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The application directory could not be prepared.
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// A value is outside its allowed range.
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the trainer writes and the predictor reads the model artifact.
    pub model_path: PathBuf,
    pub training: TrainingSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_FILE),
            training: TrainingSettings::default(),
        }
    }
}

/// Dataset synthesis, split and forest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    /// Number of synthetic rows.
    pub rows: usize,
    /// Share of rows held out from fitting.
    pub test_fraction: f64,
    /// Seed for the train/held-out shuffle.
    pub split_seed: u64,
    /// Seed for dataset synthesis; unset draws from OS entropy.
    pub data_seed: Option<u64>,
    pub label_source: LabelSource,
    pub forest: ForestOptions,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            rows: 1000,
            test_fraction: 0.2,
            split_seed: 42,
            data_seed: None,
            label_source: LabelSource::default(),
            forest: ForestOptions::default(),
        }
    }
}

impl Config {
    /// Reject settings the trainer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = &self.training;
        if training.rows == 0 {
            return Err(ConfigError::Invalid("training.rows must be positive".into()));
        }
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "training.test_fraction must be between 0 and 1 (got {})",
                training.test_fraction
            )));
        }
        if training.forest.n_trees == 0 {
            return Err(ConfigError::Invalid(
                "training.forest.n_trees must be positive".into(),
            ));
        }
        if training.forest.min_samples_split < 2 {
            return Err(ConfigError::Invalid(format!(
                "training.forest.min_samples_split must be at least 2 (got {})",
                training.forest.min_samples_split
            )));
        }
        if self.model_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("model_path must not be empty".into()));
        }
        Ok(())
    }
}

/// Resolve the settings file path inside the application root. Nothing is
/// created on disk.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_path()?.join(CONFIG_FILE_NAME))
}

/// Load settings from an explicit file, or from the application root when
/// `explicit` is `None`. Only the application-root file may be absent.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let config = match explicit {
        Some(path) => load_from(path)?,
        None => match config_path() {
            Ok(path) if path.is_file() => load_from(&path)?,
            Ok(path) => {
                tracing::debug!("No config at {}; using defaults", path.display());
                Config::default()
            }
            Err(err) => {
                tracing::debug!("No config directory ({err}); using defaults");
                Config::default()
            }
        },
    };
    config.validate()?;
    Ok(config)
}

/// Parse a settings file.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_dirs::test_support::OverrideGuard;
    use crate::ml::forest::MaxFeatures;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
model_path = "models/fleet.json"

[training]
data_seed = 7
label_source = "row_mileage"

[training.forest]
n_trees = 25
max_features = "all"
max_depth = 12
"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.model_path, PathBuf::from("models/fleet.json"));
        assert_eq!(config.training.rows, 1000);
        assert_eq!(config.training.split_seed, 42);
        assert_eq!(config.training.data_seed, Some(7));
        assert_eq!(config.training.label_source, LabelSource::RowMileage);
        assert_eq!(config.training.forest.n_trees, 25);
        assert_eq!(config.training.forest.max_features, MaxFeatures::All);
        assert_eq!(config.training.forest.max_depth, Some(12));
        assert_eq!(config.training.forest.seed, 42);
    }

    #[test]
    fn missing_app_config_uses_defaults() {
        let base = tempdir().unwrap();
        let _guard = OverrideGuard::set(base.path().to_path_buf());
        let config = load(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_FILE));
    }

    #[test]
    fn app_config_is_read_from_root() {
        let base = tempdir().unwrap();
        let _guard = OverrideGuard::set(base.path().to_path_buf());
        let path = config_path().unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "model_path = \"elsewhere.json\"\n").unwrap();
        let config = load(None).unwrap();
        assert_eq!(config.model_path, PathBuf::from("elsewhere.json"));
    }

    #[test]
    fn unusable_config_home_falls_back_to_defaults() {
        let base = tempdir().unwrap();
        let blocker = base.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let _guard = OverrideGuard::set(blocker.join("config"));
        let config = load(None).unwrap();
        assert_eq!(config, Config::default());
        assert!(blocker.is_file());
    }

    #[test]
    fn default_lookup_creates_no_directories() {
        let base = tempdir().unwrap();
        let _guard = OverrideGuard::set(base.path().join("home"));
        load(None).unwrap();
        assert!(!base.path().join("home").exists());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[training]\ntest_fraction = 1.5\n").unwrap();
        assert!(matches!(load(Some(&path)), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "[training\n").unwrap();
        assert!(matches!(load(Some(&path)), Err(ConfigError::ParseToml { .. })));
    }
}
