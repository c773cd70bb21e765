//! Launcher configuration file support.

use crate::cache::ConfigCache;
use crate::command::{Accelerator, Platform};
use crate::error::{LaunchError, LaunchResult};
use crate::locale::Lang;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CLI: &str = "swift";
pub const DEFAULT_MAX_LOG_LINES: usize = 50;
pub const DEFAULT_SETTLE_MS: u64 = 1000;

/// Launcher configuration.
///
/// Every field is optional so layers can be merged; accessors apply defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Training CLI executable
    #[serde(default)]
    pub cli: Option<String>,

    /// UI language for messages
    #[serde(default)]
    pub lang: Option<Lang>,

    /// Lines kept by the streaming log tail
    #[serde(default)]
    pub max_log_lines: Option<usize>,

    /// Where per-model form records are stored
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Wait after a detached launch, in milliseconds
    #[serde(default)]
    pub settle_ms: Option<u64>,

    /// Override accelerator detection
    #[serde(default)]
    pub accelerator: Option<Accelerator>,

    /// Override the command dialect
    #[serde(default)]
    pub platform: Option<Platform>,
}

impl LauncherConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> LaunchResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LaunchError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| LaunchError::Config(format!("{}: {e}", path.display())))
    }

    /// `~/.tune/config.toml`
    pub fn default_global_path() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".tune").join("config.toml")
    }

    /// `./.tunerc`
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".tunerc")
    }

    /// Global config, then local config, then environment variables.
    pub fn discover_and_load() -> Self {
        let mut config = Self::default();
        for path in [Self::default_global_path(), Self::default_local_path()] {
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(layer) => config.merge(&layer),
                    Err(e) => tracing::warn!(error = %e, "Ignoring unreadable config file"),
                }
            }
        }
        config.merge(&Self::from_env());
        config
    }

    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        if other.cli.is_some() {
            self.cli.clone_from(&other.cli);
        }
        if other.lang.is_some() {
            self.lang = other.lang;
        }
        if other.max_log_lines.is_some() {
            self.max_log_lines = other.max_log_lines;
        }
        if other.cache_dir.is_some() {
            self.cache_dir.clone_from(&other.cache_dir);
        }
        if other.settle_ms.is_some() {
            self.settle_ms = other.settle_ms;
        }
        if other.accelerator.is_some() {
            self.accelerator = other.accelerator;
        }
        if other.platform.is_some() {
            self.platform = other.platform;
        }
    }

    /// Layer read from `TUNE_*` and `MAX_LOG_LINES`; unparsable values are skipped.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }
        Self {
            cli: var("TUNE_CLI"),
            lang: var("TUNE_LANG").and_then(|v| v.parse().ok()),
            max_log_lines: var("MAX_LOG_LINES").and_then(|v| v.trim().parse().ok()),
            cache_dir: var("TUNE_CACHE_DIR").map(PathBuf::from),
            settle_ms: var("TUNE_SETTLE_MS").and_then(|v| v.trim().parse().ok()),
            accelerator: var("TUNE_ACCELERATOR").and_then(|v| v.parse().ok()),
            platform: var("TUNE_PLATFORM").and_then(|v| v.parse().ok()),
        }
    }

    pub fn cli(&self) -> &str {
        self.cli.as_deref().unwrap_or(DEFAULT_CLI)
    }

    pub fn lang(&self) -> Lang {
        self.lang.unwrap_or_default()
    }

    pub fn max_log_lines(&self) -> usize {
        self.max_log_lines.unwrap_or(DEFAULT_MAX_LOG_LINES).max(1)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms.unwrap_or(DEFAULT_SETTLE_MS))
    }

    pub fn accelerator(&self) -> Accelerator {
        self.accelerator.unwrap_or_else(Accelerator::detect)
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    pub fn cache(&self) -> ConfigCache {
        ConfigCache::new(self.cache_dir.clone().unwrap_or_else(ConfigCache::default_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LauncherConfig::default();
        assert_eq!(config.cli(), "swift");
        assert_eq!(config.max_log_lines(), 50);
        assert_eq!(config.settle_delay(), Duration::from_secs(1));
        assert_eq!(config.lang(), Lang::En);
    }

    #[test]
    fn test_load_and_merge() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "cli = \"my-trainer\"\nmax_log_lines = 5\naccelerator = \"npu\"\nlang = \"zh\"\n").unwrap();

        let mut config = LauncherConfig { settle_ms: Some(10), ..LauncherConfig::default() };
        config.merge(&LauncherConfig::load_from_file(&path).unwrap());
        assert_eq!(config.cli(), "my-trainer");
        assert_eq!(config.max_log_lines(), 5);
        assert_eq!(config.accelerator(), Accelerator::Npu);
        assert_eq!(config.lang(), Lang::Zh);
        assert_eq!(config.settle_ms, Some(10));
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "max_log_lines = \"many\"").unwrap();
        assert!(matches!(LauncherConfig::load_from_file(&path), Err(LaunchError::Config(_))));
    }

    #[test]
    fn test_zero_log_lines_clamps_to_one() {
        let config = LauncherConfig { max_log_lines: Some(0), ..LauncherConfig::default() };
        assert_eq!(config.max_log_lines(), 1);
    }
}
