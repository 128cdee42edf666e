//! Configuration loading and API key resolution
//!
//! Configuration lives in a single TOML file (`aurex.toml`). A missing file is
//! not an error: every field has a compiled default.
//!
//! **Priority for secrets:** Environment → TOML

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding `lookup.acoustid_api_key`
pub const ACOUSTID_KEY_ENV: &str = "AUREX_ACOUSTID_API_KEY";

/// Configuration file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "aurex.toml";

const DEFAULT_ACOUSTID_URL: &str = "https://api.acoustid.org/v2/lookup";
const DEFAULT_MUSICBRAINZ_URL: &str = "https://musicbrainz.org/ws/2";
const DEFAULT_COVERART_URL: &str = "https://coverartarchive.org";
const DEFAULT_USER_AGENT: &str = concat!("aurex/", env!("CARGO_PKG_VERSION"));

/// Top-level configuration file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AurexConfig {
    pub logging: LoggingConfig,
    pub lookup: LookupConfig,
    pub cache: CacheConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[lookup]` section: external metadata services
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LookupConfig {
    pub acoustid_api_key: Option<String>,
    pub acoustid_url: String,
    pub musicbrainz_url: String,
    pub coverart_url: String,
    pub user_agent: String,
    /// Upper bound for each stage of the lookup chain
    pub stage_timeout_ms: u64,
    pub acoustid_requests_per_second: u32,
    pub musicbrainz_requests_per_second: u32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            acoustid_api_key: None,
            acoustid_url: DEFAULT_ACOUSTID_URL.to_string(),
            musicbrainz_url: DEFAULT_MUSICBRAINZ_URL.to_string(),
            coverart_url: DEFAULT_COVERART_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            stage_timeout_ms: 10_000,
            acoustid_requests_per_second: 3,
            musicbrainz_requests_per_second: 1,
        }
    }
}

impl LookupConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms.max(1))
    }
}

/// `[cache]` section: persistent metadata cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// SQLite file; `None` uses the platform data directory
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl CacheConfig {
    /// Effective database path (configured or platform default)
    pub fn database_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_cache_path)
    }
}

/// Default configuration file path for the platform
///
/// `~/.config/aurex/aurex.toml` on Linux, the platform equivalent elsewhere,
/// `./aurex.toml` when no config directory can be determined.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("aurex").join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Default SQLite cache location
fn default_cache_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("aurex").join("metadata-cache.db"))
        .unwrap_or_else(|| PathBuf::from("./aurex_data/metadata-cache.db"))
}

/// Load configuration from `path` (or the platform default)
///
/// A missing file yields defaults with a warning; a file that exists but does
/// not parse is a configuration error.
pub fn load_config(path: Option<&Path>) -> Result<AurexConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(AurexConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: AurexConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Write configuration atomically (temp file + rename)
pub fn write_toml_config(config: &AurexConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolve the AcoustID API key
///
/// **Priority:** ENV (`AUREX_ACOUSTID_API_KEY`) → TOML
pub fn resolve_acoustid_api_key(config: &AurexConfig) -> Result<String> {
    let env_key = std::env::var(ACOUSTID_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = config
        .lookup
        .acoustid_api_key
        .as_ref()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("AcoustID API key found in environment and TOML. Using environment.");
    }

    if let Some(key) = env_key {
        info!("AcoustID API key loaded from environment variable");
        return Ok(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("AcoustID API key loaded from TOML config");
        return Ok(key.trim().to_string());
    }

    Err(Error::Config(format!(
        "AcoustID API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: {} ([lookup] acoustid_api_key = \"your-key\")\n\
         \n\
         Obtain API key at: https://acoustid.org/new-application",
        ACOUSTID_KEY_ENV,
        default_config_path().display()
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AurexConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.lookup.stage_timeout(), Duration::from_secs(10));
        assert_eq!(config.lookup.musicbrainz_requests_per_second, 1);
        assert!(config.cache.enabled);
        assert!(config.lookup.user_agent.starts_with("aurex/"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AurexConfig = toml::from_str(
            r#"
            [lookup]
            stage_timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.lookup.stage_timeout(), Duration::from_millis(2500));
        assert_eq!(config.lookup.acoustid_url, DEFAULT_ACOUSTID_URL);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let lookup = LookupConfig {
            stage_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(lookup.stage_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   \t"));
    }
}
