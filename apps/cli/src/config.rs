//! CLI configuration loading and merging.

use tune_launcher::{Lang, LauncherConfig};

/// Load and merge launcher configuration.
///
/// Configuration precedence:
/// 1. CLI arguments (handled by clap)
/// 2. Environment variables
/// 3. Local config file (./.tunerc)
/// 4. Global config file (~/.tune/config.toml)
/// 5. Defaults
pub fn load_config(lang: Option<Lang>, cli: Option<String>) -> LauncherConfig {
    let mut config = LauncherConfig::discover_and_load();
    config.merge(&LauncherConfig { lang, cli, ..LauncherConfig::default() });
    config
}
