//! Configuration management for gator.
//!
//! Configuration is read from `~/.config/gator/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod duration;

pub use duration::{format_duration, parse_duration, DurationError};

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database location. Defaults to `<data_dir>/gator/gator.db`.
    pub database_path: Option<PathBuf>,
    /// User that `addfeed` and `browse` act on behalf of.
    pub current_user: Option<String>,
    pub fetch: FetchConfig,

    /// Where this config was loaded from, so `save` writes it back there.
    #[serde(skip)]
    path: Option<PathBuf>,
}

/// HTTP client settings for feed retrieval.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound on a single feed request, connect through body.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("gator/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self {
                path: Some(config_path.to_path_buf()),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        config.path = Some(config_path.to_path_buf());
        config.validate(config_path)?;

        Ok(config)
    }

    fn validate(&self, config_path: &Path) -> Result<(), ConfigError> {
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                path: config_path.to_path_buf(),
                reason: "fetch.timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Write the current settings back to the file they came from.
    ///
    /// Comments in the file are not preserved.
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let content = toml::to_string(self).map_err(ConfigError::Serialize)?;
        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn set_user(&mut self, name: &str) -> Result<(), ConfigError> {
        self.current_user = Some(name.to_string());
        self.save()
    }

    /// Get the default config file path: `~/.config/gator/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("gator").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# gator configuration

# SQLite database file (default: <data dir>/gator/gator.db)
# database_path = "/home/me/.local/share/gator/gator.db"

# Set by `gator register` / `gator login`
# current_user = "alice"

[fetch]
# Upper bound on a single feed request, in seconds
timeout_secs = 10

# User-Agent header sent with feed requests
user_agent = "gator/0.1.0"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config file at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.fetch.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.fetch.user_agent, "gator/0.1.0");
        assert!(config.current_user.is_none());
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
current_user = "alice"

[fetch]
timeout_secs = 3
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.current_user.as_deref(), Some("alice"));
        assert_eq!(config.fetch.timeout_secs, 3);
        assert!(config.fetch.user_agent.starts_with("gator/"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.fetch.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_set_user_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::load_from(&path).unwrap();
        config.set_user("bob").unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.current_user.as_deref(), Some("bob"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fetch]\ntimeout_secs = \"soon\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fetch]\ntimeout_secs = 0\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
