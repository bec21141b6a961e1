//! Configuration loading and discovery for `spv.toml`
//!
//! Provides functions to find, load, and override configuration.

use super::schema::EngineConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name looked up during discovery
pub const CONFIG_FILE: &str = "spv.toml";

/// Environment variable overriding `assets.base_url`
pub const ENV_BASE_URL: &str = "SPV_BASE_URL";

/// Environment variable overriding `cache.enabled`
pub const ENV_CACHE_ENABLED: &str = "SPV_CACHE_ENABLED";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse spv.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override asset location
    pub base_url: Option<String>,
    /// Force the variant cache on or off
    pub cache_enabled: Option<bool>,
    /// Fail renders on missing overlay/icon assets
    pub strict_assets: Option<bool>,
}

/// Locate `spv.toml`: the nearest one at or above the working directory, else
/// `$XDG_CONFIG_HOME/sprite-variants/spv.toml` (`~/.config` when unset).
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from).or_else(find_xdg_config)
}

/// The per-user config file, if present.
pub fn find_xdg_config() -> Option<PathBuf> {
    let base = match env::var_os("XDG_CONFIG_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("sprite-variants").join(CONFIG_FILE)).filter(|path| path.is_file())
}

/// Nearest `spv.toml` in `start` or any of its ancestors.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE)).find(|path| path.is_file())
}

/// Load configuration from a spv.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate one, falling back to defaults when nothing is found. Environment
/// overrides are applied before validation.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("game/spv.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    validated(read_config(path)?)
}

/// Like [`load_config`] without the validation step, for callers that apply
/// more overrides first.
pub fn read_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    let mut config = match &config_path {
        Some(p) => load_config_file(p)?,
        None => EngineConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// `config` unchanged, or every validation problem at once.
pub fn validated(config: EngineConfig) -> Result<EngineConfig, ConfigError> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(config);
    }
    Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
}

/// Parse a config file. Relative local asset paths resolve against the file's
/// directory.
fn load_config_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let mut config: EngineConfig = toml::from_str(&contents)?;

    if let (false, Some(dir)) = (config.assets.base_url.contains("://"), path.parent()) {
        config.assets.base_url = resolve_path(dir, Path::new(&config.assets.base_url)).to_string_lossy().into_owned();
    }
    Ok(config)
}

/// Apply `SPV_*` environment variables.
///
/// Unparseable boolean values are ignored with a warning.
pub fn apply_env_overrides(config: &mut EngineConfig) {
    if let Ok(base_url) = env::var(ENV_BASE_URL) {
        if !base_url.trim().is_empty() {
            config.assets.base_url = base_url;
        }
    }

    if let Ok(value) = env::var(ENV_CACHE_ENABLED) {
        match parse_bool(&value) {
            Some(enabled) => config.cache.enabled = enabled,
            None => log::warn!("ignoring {}={:?}: expected a boolean", ENV_CACHE_ENABLED, value),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file and environment values.
pub fn merge_cli_overrides(config: &mut EngineConfig, overrides: &CliOverrides) {
    if let Some(base_url) = &overrides.base_url {
        config.assets.base_url.clone_from(base_url);
    }
    config.cache.enabled = overrides.cache_enabled.unwrap_or(config.cache.enabled);
    config.compositor.strict_assets = overrides.strict_assets.unwrap_or(config.compositor.strict_assets);
}

/// `path` joined onto `dir` unless it is already absolute.
pub fn resolve_path(dir: &Path, path: &Path) -> PathBuf {
    dir.join(path)
}
