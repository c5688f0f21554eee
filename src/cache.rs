use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::Config;
use crate::error::StoreError;
use crate::store::{Store, StoreExt};
use crate::types::Team;

const SECRETS_DIR: &str = "secrets";

/// File-backed store: one JSON file per key, secrets in a private subdirectory
#[derive(Debug, Clone)]
pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    /// Create a cache in the default project cache directory
    pub fn new() -> Result<Self> {
        Self::at(Config::cache_dir()?)
    }

    /// Create a cache rooted at `dir`
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = dir.into();
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", cache_dir))?;
        Ok(Self { cache_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory where downloaded icons are kept
    pub fn icon_dir(&self) -> PathBuf {
        self.cache_dir.join("icons")
    }

    /// Get the path for a cache file
    fn file_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    fn secret_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(SECRETS_DIR).join(key)
    }

    /// Clear the per-team list caches and downloaded icons.
    ///
    /// The team registry, the lock mirror and every token are kept.
    pub fn clear(&self) -> Result<()> {
        let teams: Vec<Team> = self.load(TEAMS_KEY)?.unwrap_or_default();
        for team in &teams {
            for list in LIST_KEYS {
                self.delete(&list_key(team.team_id.as_str(), list))?;
            }
        }
        let icons = self.icon_dir();
        if icons.exists() {
            fs::remove_dir_all(&icons)
                .with_context(|| format!("Failed to clear icon directory: {:?}", icons))?;
        }
        Ok(())
    }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl Store for Cache {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.file_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(io_error(key))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Serde {
                key: key.to_string(),
                source,
            })
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serde {
            key: key.to_string(),
            source,
        })?;
        fs::write(self.file_path(key), content).map_err(io_error(key))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.file_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(io_error(key))?;
        }
        Ok(())
    }

    fn set_password(&self, key: &str, secret: &str) -> Result<(), StoreError> {
        let path = self.secret_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(key))?;
        }
        fs::write(&path, secret).map_err(io_error(key))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(io_error(key))?;
        }

        Ok(())
    }

    fn password(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.secret_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path).map(Some).map_err(io_error(key))
    }
}

// Store keys
pub const TEAMS_KEY: &str = "teams";
pub const CACHE_LOCK_KEY: &str = "cache.lock";

/// Lists each team caches locally
pub const LIST_KEYS: [&str; 4] = ["channels", "groups", "ims", "users"];

/// Key under which a team's token is stored
pub fn token_key(team_id: &str) -> String {
    format!("token.{}", team_id)
}

/// Key of one cached list of a team, e.g. `T1.channels`
pub fn list_key(team_id: &str, list: &str) -> String {
    format!("{}.{}", team_id, list)
}
