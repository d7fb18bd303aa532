//! Engine configuration with defaults, builder and environment overrides

use crate::errors::{CacheError, Result};
use coldstore_core::constants::{
    CACHE_DIR_NAME, COLDSTORE_AUTO_WATCH_VAR, COLDSTORE_CACHE_DIR_VAR,
    COLDSTORE_CACHE_UNLIMITED_VAR, COLDSTORE_MAX_CACHE_BYTES_VAR, DEFAULT_MAX_CACHE_BYTES,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Configuration for one [`CacheEngine`](crate::CacheEngine) instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Root of the persistent namespace
    pub base_dir: PathBuf,
    /// Open a subscription the first time a key is read
    pub auto_watch: bool,
    /// Disable the byte ceiling entirely
    pub cache_size_unlimited: bool,
    /// Byte ceiling for persisted entries
    pub max_cache_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            auto_watch: true,
            cache_size_unlimited: false,
            max_cache_bytes: DEFAULT_MAX_CACHE_BYTES,
        }
    }
}

/// `<data dir>/coldstore_cache`, honouring `XDG_DATA_HOME`
pub fn default_base_dir() -> PathBuf {
    env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join(CACHE_DIR_NAME)
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Defaults overlaid with `COLDSTORE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = env::var_os(COLDSTORE_CACHE_DIR_VAR) {
            config.base_dir = PathBuf::from(dir);
        }
        if let Some(value) = read_var(COLDSTORE_AUTO_WATCH_VAR) {
            config.auto_watch = parse_bool(COLDSTORE_AUTO_WATCH_VAR, &value)?;
        }
        if let Some(value) = read_var(COLDSTORE_CACHE_UNLIMITED_VAR) {
            config.cache_size_unlimited = parse_bool(COLDSTORE_CACHE_UNLIMITED_VAR, &value)?;
        }
        if let Some(value) = read_var(COLDSTORE_MAX_CACHE_BYTES_VAR) {
            config.max_cache_bytes = value.trim().parse().map_err(|e| {
                CacheError::configuration(format!(
                    "{COLDSTORE_MAX_CACHE_BYTES_VAR} must be a byte count, got '{value}': {e}"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.cache_size_unlimited && self.max_cache_bytes == 0 {
            return Err(CacheError::configuration(
                "max_cache_bytes must be greater than zero unless the cache is unlimited",
            ));
        }
        if self.base_dir.as_os_str().is_empty() {
            return Err(CacheError::configuration("base_dir cannot be empty"));
        }
        Ok(())
    }

    /// Ceiling in bytes, `None` when unlimited
    pub fn byte_limit(&self) -> Option<u64> {
        (!self.cache_size_unlimited).then_some(self.max_cache_bytes)
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CacheError::configuration(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

/// Builder for engine configurations
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = base_dir.into();
        self
    }

    pub fn auto_watch(mut self, enabled: bool) -> Self {
        self.config.auto_watch = enabled;
        self
    }

    pub fn unlimited(mut self, unlimited: bool) -> Self {
        self.config.cache_size_unlimited = unlimited;
        self
    }

    pub fn max_cache_bytes(mut self, bytes: u64) -> Self {
        self.config.max_cache_bytes = bytes;
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vars() {
        for var in [
            COLDSTORE_CACHE_DIR_VAR,
            COLDSTORE_AUTO_WATCH_VAR,
            COLDSTORE_CACHE_UNLIMITED_VAR,
            COLDSTORE_MAX_CACHE_BYTES_VAR,
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.auto_watch);
        assert!(!config.cache_size_unlimited);
        assert_eq!(config.max_cache_bytes, 100 * 1024 * 1024);
        assert!(config.base_dir.ends_with(CACHE_DIR_NAME));
        assert_eq!(config.byte_limit(), Some(100 * 1024 * 1024));
    }

    #[test]
    fn test_builder_validates() {
        assert!(EngineConfig::builder().max_cache_bytes(0).build().is_err());
        let config = EngineConfig::builder()
            .max_cache_bytes(0)
            .unlimited(true)
            .build()
            .unwrap();
        assert_eq!(config.byte_limit(), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"autoWatch": false, "maxCacheBytes": 2048}"#).unwrap();
        assert!(!config.auto_watch);
        assert_eq!(config.max_cache_bytes, 2048);
        assert!(!config.cache_size_unlimited);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_vars();
        env::set_var(COLDSTORE_CACHE_DIR_VAR, "/tmp/coldstore-test");
        env::set_var(COLDSTORE_AUTO_WATCH_VAR, "off");
        env::set_var(COLDSTORE_MAX_CACHE_BYTES_VAR, "4096");

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/tmp/coldstore-test"));
        assert!(!config.auto_watch);
        assert_eq!(config.max_cache_bytes, 4096);
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage() {
        clear_vars();
        env::set_var(COLDSTORE_CACHE_UNLIMITED_VAR, "maybe");
        assert!(matches!(
            EngineConfig::from_env(),
            Err(CacheError::Configuration { .. })
        ));
        clear_vars();

        env::set_var(COLDSTORE_MAX_CACHE_BYTES_VAR, "lots");
        assert!(EngineConfig::from_env().is_err());
        clear_vars();
    }
}
