//! Durable token storage.
//!
//! Two string values live under fixed keys (`access_token`, `refresh_token`).
//! The file-backed store keeps them in `<base>/tokens.json` with restricted
//! permissions (0600). Tokens are never logged or displayed in full.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Tokens as read back from storage. Either may be absent.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(rename = "access_token", skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(rename = "refresh_token", skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl StoredTokens {
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

impl fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access", &self.access.as_deref().map(mask_token))
            .field("refresh", &self.refresh.as_deref().map(mask_token))
            .finish()
    }
}

/// Persistent client storage for the token pair.
///
/// Calls are made while the session state lock is held, so implementations
/// must not block for long.
pub trait TokenStore: Send + Sync {
    /// Reads persisted tokens. Missing storage yields empty tokens.
    ///
    /// # Errors
    /// Returns an error if storage exists but cannot be read.
    fn load(&self) -> Result<StoredTokens>;

    /// Persists both tokens, replacing whatever was stored.
    ///
    /// # Errors
    /// Returns an error if storage cannot be written.
    fn save(&self, access: &str, refresh: &str) -> Result<()>;

    /// Removes both tokens.
    ///
    /// # Errors
    /// Returns an error if storage cannot be written.
    fn clear(&self) -> Result<()>;
}

/// File-backed token store (`tokens.json`).
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location under `TEAMSITE_HOME`.
    pub fn default_location() -> Self {
        Self::new(paths::tokens_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read tokens from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse tokens from {}", self.path.display()))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(map).context("Failed to serialize tokens")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<StoredTokens> {
        let mut map = self.read_map()?;
        Ok(StoredTokens {
            access: map.remove(ACCESS_TOKEN_KEY).filter(|s| !s.is_empty()),
            refresh: map.remove(REFRESH_TOKEN_KEY).filter(|s| !s.is_empty()),
        })
    }

    fn save(&self, access: &str, refresh: &str) -> Result<()> {
        // Unknown keys written by other tools are kept.
        let mut map = self.read_map().unwrap_or_default();
        map.insert(ACCESS_TOKEN_KEY.to_string(), access.to_string());
        map.insert(REFRESH_TOKEN_KEY.to_string(), refresh.to_string());
        self.write_map(&map)
    }

    fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut map = self.read_map().unwrap_or_default();
        map.remove(ACCESS_TOKEN_KEY);
        map.remove(REFRESH_TOKEN_KEY);
        self.write_map(&map)
    }
}

/// In-process token store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with tokens, as if left behind by a prior process.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            tokens: Mutex::new(StoredTokens {
                access: access.map(str::to_string),
                refresh: refresh.map(str::to_string),
            }),
        }
    }

    /// Returns a copy of what is currently stored.
    pub fn snapshot(&self) -> StoredTokens {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<StoredTokens> {
        Ok(self.snapshot())
    }

    fn save(&self, access: &str, refresh: &str) -> Result<()> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.access = Some(access.to_string());
        tokens.refresh = Some(refresh.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = StoredTokens::default();
        Ok(())
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_uses_fixed_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");
        let store = FileTokenStore::new(&path);

        store.save("access-1", "refresh-1").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[ACCESS_TOKEN_KEY], "access-1");
        assert_eq!(raw[REFRESH_TOKEN_KEY], "refresh-1");

        let loaded = store.load().unwrap();
        assert_eq!(loaded.access.as_deref(), Some("access-1"));
        assert_eq!(loaded.refresh.as_deref(), Some("refresh-1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        FileTokenStore::new(&path).save("a", "r").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_clear_removes_only_token_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(
            &path,
            r#"{"access_token": "a", "refresh_token": "r", "other": "kept"}"#,
        )
        .unwrap();

        let store = FileTokenStore::new(&path);
        store.clear().unwrap();

        assert!(store.load().unwrap().is_empty());
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("kept"));
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::with_tokens(Some("a"), None);
        assert_eq!(store.load().unwrap().access.as_deref(), Some("a"));
        store.clear().unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "***");
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGciOiJI...");
    }
}
