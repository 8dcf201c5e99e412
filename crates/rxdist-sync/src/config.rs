//! # Sync Configuration
//!
//! Configuration management for the authorization engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RXDIST_CACHE_TTL_SECS=30                                           │
//! │     RXDIST_STORAGE_PATH=/data/rxdist.db                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/rxdist/rxdist.toml (Linux)                               │
//! │     ~/Library/Application Support/com.rxdist.rxdist/rxdist.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     60 s cache TTL, 5 s refresh throttle, rpc → profile_table          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # rxdist.toml
//! [auth]
//! refresh_throttle_secs = 5
//! role_key_prefix = "user_role_"
//! strategies = ["rpc", "profile_table"]
//!
//! [cache]
//! ttl_secs = 60
//!
//! [storage]
//! path = "/custom/rxdist.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

const CONFIG_FILE_NAME: &str = "rxdist.toml";
const DATABASE_FILE_NAME: &str = "rxdist.db";

// =============================================================================
// Sections
// =============================================================================

/// Role refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Minimum spacing between throttled (foreground) refreshes, in seconds.
    #[serde(default = "default_refresh_throttle")]
    pub refresh_throttle_secs: u64,

    /// Key prefix for the persistent role cache.
    #[serde(default = "default_role_key_prefix")]
    pub role_key_prefix: String,

    /// Role strategy names, in the order they are tried.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,
}

fn default_refresh_throttle() -> u64 {
    5
}

fn default_role_key_prefix() -> String {
    rxdist_db::DEFAULT_KEY_PREFIX.to_string()
}

fn default_strategies() -> Vec<String> {
    vec!["rpc".to_string(), "profile_table".to_string()]
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            refresh_throttle_secs: default_refresh_throttle(),
            role_key_prefix: default_role_key_prefix(),
            strategies: default_strategies(),
        }
    }
}

/// Dashboard cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Age after which a cached payload is refetched, in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

fn default_ttl() -> u64 {
    60
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            ttl_secs: default_ttl(),
        }
    }
}

/// Durable storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file for the role cache. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// =============================================================================
// SyncConfig
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (rxdist.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.cache.ttl_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "cache.ttl_secs must be greater than 0".into(),
            ));
        }

        if self.auth.role_key_prefix.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "auth.role_key_prefix must not be empty".into(),
            ));
        }

        if self.auth.strategies.is_empty() {
            return Err(SyncError::NoStrategies);
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from any variable source.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(ttl) = var("RXDIST_CACHE_TTL_SECS") {
            match ttl.parse::<u64>() {
                Ok(secs) => {
                    debug!(ttl_secs = secs, "Overriding cache TTL from environment");
                    self.cache.ttl_secs = secs;
                }
                Err(_) => warn!(value = %ttl, "Ignoring non-numeric RXDIST_CACHE_TTL_SECS"),
            }
        }

        if let Some(throttle) = var("RXDIST_REFRESH_THROTTLE_SECS") {
            match throttle.parse::<u64>() {
                Ok(secs) => self.auth.refresh_throttle_secs = secs,
                Err(_) => {
                    warn!(value = %throttle, "Ignoring non-numeric RXDIST_REFRESH_THROTTLE_SECS")
                }
            }
        }

        if let Some(prefix) = var("RXDIST_ROLE_KEY_PREFIX") {
            self.auth.role_key_prefix = prefix;
        }

        if let Some(path) = var("RXDIST_STORAGE_PATH") {
            debug!(path = %path, "Overriding storage path from environment");
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "rxdist", "rxdist")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// SQLite file backing the role cache.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.storage.path.clone().or_else(|| {
            Self::project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn refresh_throttle(&self) -> Duration {
        Duration::from_secs(self.auth.refresh_throttle_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.refresh_throttle(), Duration::from_secs(5));
        assert_eq!(config.auth.role_key_prefix, "user_role_");
        assert_eq!(config.auth.strategies, vec!["rpc", "profile_table"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.cache.ttl_secs = 0;
        assert!(config.validate().unwrap_err().is_config_error());

        config.cache.ttl_secs = 60;
        config.auth.role_key_prefix = "  ".into();
        assert!(config.validate().is_err());

        config.auth.role_key_prefix = "role:".into();
        config.auth.strategies.clear();
        assert!(matches!(config.validate(), Err(SyncError::NoStrategies)));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str("[cache]\nttl_secs = 30\n").unwrap();
        assert_eq!(config.cache.ttl_secs, 30);
        assert_eq!(config.auth.refresh_throttle_secs, 5);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RXDIST_CACHE_TTL_SECS", "15"),
            ("RXDIST_REFRESH_THROTTLE_SECS", "nope"),
            ("RXDIST_STORAGE_PATH", "/tmp/x.db"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.cache.ttl_secs, 15);
        assert_eq!(config.auth.refresh_throttle_secs, 5);
        assert_eq!(config.database_path(), Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir().join(format!("rxdist-config-{}.toml", std::process::id()));

        let mut config = SyncConfig::default();
        config.cache.ttl_secs = 45;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[auth]"));
        assert!(contents.contains("[cache]"));

        let loaded: SyncConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.cache.ttl_secs, 45);

        let _ = std::fs::remove_file(&path);
    }
}
