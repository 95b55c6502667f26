//! Configuration management for teamsite.
//!
//! Loads configuration from ${TEAMSITE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use teamsite_types::Lang;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "TEAMSITE_API_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, run `cargo xtask update-default-config`.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments/sections from the template are always present, while the
/// user's customized values are preserved.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for teamsite configuration and data files.
    //!
    //! TEAMSITE_HOME resolution order:
    //! 1. TEAMSITE_HOME environment variable (if set)
    //! 2. ~/.config/teamsite (default)

    use std::path::PathBuf;

    /// Returns the teamsite home directory.
    ///
    /// Falls back to the current directory when no home directory exists.
    pub fn teamsite_home() -> PathBuf {
        if let Ok(home) = std::env::var("TEAMSITE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("teamsite"))
            .unwrap_or_else(|| PathBuf::from(".teamsite"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        teamsite_home().join("config.toml")
    }

    /// Returns the path to the persisted token file.
    pub fn tokens_path() -> PathBuf {
        teamsite_home().join("tokens.json")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        teamsite_home().join("logs")
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Optional base URL (overridden by TEAMSITE_API_URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds (0 uses the transport default)
    pub request_timeout_secs: u32,
}

impl ApiConfig {
    /// Returns the base URL if set and non-empty.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds between silent access-token refreshes
    pub refresh_interval_secs: u64,
}

impl SessionConfig {
    /// 50 minutes, ahead of the backend's 60-minute access-token lifetime.
    pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 50 * 60;

    /// Returns the refresh interval, clamped to at least one second.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: Self::DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (e.g. "info", "teamsite_core=debug")
    pub level: String,
    /// Write to a log file instead of stderr
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content language for localized fields
    pub lang: Lang,

    /// Backend connection settings
    pub api: ApiConfig,

    /// Session lifecycle settings
    pub session: SessionConfig,

    /// Logging settings
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the backend base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL is not a valid URL.
    pub fn api_base_url(&self) -> Result<String> {
        if let Ok(env_url) = std::env::var(API_URL_ENV) {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.to_string());
            }
        }

        if let Some(config_url) = self.api.effective_base_url() {
            validate_url(config_url)?;
            return Ok(config_url.to_string());
        }

        Ok(DEFAULT_API_URL.to_string())
    }

    /// Saves only the lang field to the config file.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or written.
    pub fn save_lang(lang: Lang) -> Result<()> {
        Self::save_lang_to(&paths::config_path(), lang)
    }

    /// Saves only the lang field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or written.
    pub fn save_lang_to(path: &Path, lang: Lang) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["lang"] = value(lang.as_str());

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Used by `xtask update-default-config` to keep `default_config.toml`
    /// in sync with `Config::default()`. The embedded template provides
    /// structure and comments; generated values overwrite its values.
    ///
    /// # Errors
    /// Returns an error if serialization or template parsing fails.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let generated_toml = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;

        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.lang, Lang::En);
        assert_eq!(config.session.refresh_interval_secs, 3000);
        assert_eq!(config.api.request_timeout(), None);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "lang = \"es\"\n[session]\nrefresh_interval_secs = 60\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.lang, Lang::Es);
        assert_eq!(config.session.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("refresh_interval_secs = 3000"));
        assert!(contents.contains("# base_url ="));
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.session.refresh_interval_secs, 3000);
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_save_lang_preserves_user_values_and_comments() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[api]\nbase_url = \"http://example.test/api\"\n").unwrap();

        Config::save_lang_to(&config_path, Lang::Es).unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.lang, Lang::Es);
        assert_eq!(
            config.api.effective_base_url(),
            Some("http://example.test/api")
        );
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Teamsite Configuration"));
    }

    #[test]
    fn test_generate_matches_defaults() {
        let generated = Config::generate().unwrap();
        let config: Config = toml::from_str(&generated).unwrap();
        assert_eq!(config.session.refresh_interval_secs, 3000);
        assert!(generated.contains("# Teamsite Configuration"));
    }

    #[test]
    fn test_blank_base_url_is_unset() {
        let config = Config {
            api: ApiConfig {
                base_url: Some("   ".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.api.effective_base_url(), None);
    }

    #[test]
    fn test_zero_refresh_interval_is_clamped() {
        let session = SessionConfig {
            refresh_interval_secs: 0,
        };
        assert_eq!(session.refresh_interval(), Duration::from_secs(1));
    }
}
