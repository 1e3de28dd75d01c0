//! Configuration file for ~/.config/gator/config.toml.
//!
//! The file is optional: a missing or empty file yields defaults, with the
//! database placed next to the config file. The only value gator itself
//! writes back is `current_user_name`, through [`Config::set_user`].
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_DB_FILE: &str = "gator.db";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("HOME environment variable not set")]
    NoHome,
}

// ============================================================================
// Configuration
// ============================================================================

/// Application configuration, passed explicitly to every command.
///
/// A config built with [`Config::new`] has no backing file, so
/// [`Config::set_user`] only changes the in-memory value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// sqlx connection URL (`sqlite:/path/to/gator.db`) or a plain path.
    /// Empty means "gator.db next to the config file".
    pub db_url: String,

    /// Name of the logged-in user, set by `login` and `register`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,

    /// tracing filter used when `RUST_LOG` is unset (e.g. "gator=debug").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(skip)]
    path: Option<PathBuf>,

    /// Top-level keys in the loaded file that gator doesn't know about
    #[serde(skip)]
    unknown_keys: Vec<String>,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 3] = ["db_url", "current_user_name", "log_level"];

    /// In-memory configuration with no backing file.
    pub fn new(db_url: impl Into<String>) -> Self {
        Self {
            db_url: db_url.into(),
            ..Self::default()
        }
    }

    /// `~/.config/gator/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("gator")
            .join(CONFIG_FILE))
    }

    /// Load configuration from a TOML file, remembering `path` for later
    /// writes.
    ///
    /// - Missing or empty file → defaults
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, listed by [`Config::unknown_keys`]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(path)?;
        if config.db_url.trim().is_empty() {
            config.db_url = default_db_url(path);
        }
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let mut config: Config = toml::from_str(&content)?;
        if let Ok(raw) = content.parse::<toml::Table>() {
            config.unknown_keys = raw
                .keys()
                .filter(|key| !Self::KNOWN_KEYS.contains(&key.as_str()))
                .cloned()
                .collect();
        }
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Keys ignored while loading. Reported by the caller once logging is
    /// set up, since the log level itself comes from this file.
    pub fn unknown_keys(&self) -> &[String] {
        &self.unknown_keys
    }

    /// The file this config was loaded from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Point the current user at `name` and persist the change.
    pub fn set_user(&mut self, name: &str) -> Result<(), ConfigError> {
        self.current_user_name = Some(name.to_string());
        self.save()
    }

    /// Write the config back to its file. A config without a backing file
    /// is left alone.
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let content = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        atomic_write(path, content.as_bytes())?;
        tracing::debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}

fn default_db_url(config_path: &Path) -> String {
    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    format!("sqlite:{}", dir.join(DEFAULT_DB_FILE).display())
}

/// Replace `dst` with `content` via write-to-temp-then-rename, so readers
/// never see a half-written file.
fn atomic_write(dst: &Path, content: &[u8]) -> Result<(), ConfigError> {
    use std::time::{SystemTime, UNIX_EPOCH};
    // Unpredictable temp name; create_new refuses to follow a planted symlink
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(ConfigError::Io(e));
    }

    // Windows refuses to rename over an existing file
    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(ConfigError::Io(e));
        }
    }

    if let Err(e) = std::fs::rename(&temp_path, dst) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(ConfigError::Io(e));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
