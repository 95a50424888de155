use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{
    Error, Result,
    env_subst::substitute_env,
    error::Context,
    schema::PocmonConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["pocmon.toml", "pocmon.yaml", "pocmon.yml", "pocmon.json"];

/// File name read when nothing else is found.
const LEGACY_CONFIG_FILENAME: &str = "config.json";

/// Prefix for environment overrides (`POCMON_TOKEN`, ...).
pub const ENV_PREFIX: &str = "POCMON_";

/// A loaded config and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PocmonConfig,
    pub path: Option<PathBuf>,
}

/// Load config from an explicit path, or discover it in standard locations.
///
/// Search order when `explicit` is `None`:
/// 1. `./pocmon.{toml,yaml,yml,json}`
/// 2. `~/.config/pocmon/pocmon.{toml,yaml,yml,json}`
/// 3. `./config.json`
///
/// Without a file the defaults are used. Environment overrides apply in
/// every case.
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    let config = match &path {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            load_config(p)?
        },
        None => {
            debug!("no config file found, using defaults");
            let mut config = PocmonConfig::default();
            apply_env_overrides(&mut config);
            config
        },
    };

    let source = path
        .as_ref()
        .map_or_else(|| "<defaults>".to_string(), |p| p.display().to_string());
    info!(path = %source, channels = config.channels.len(), "config loaded");
    Ok(LoadedConfig { config, path })
}

/// Load config from the given path (any supported format), with `${ENV}`
/// substitution and `POCMON_*` overrides applied.
pub fn load_config(path: &Path) -> Result<PocmonConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    let mut config = parse_config(&raw, path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load the config file as a generic JSON value (for unknown-field checks).
pub fn load_config_value(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config_value(&raw, path)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let legacy = PathBuf::from(LEGACY_CONFIG_FILENAME);
    legacy.exists().then_some(legacy)
}

/// Returns the user-global config directory (`~/.config/pocmon/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pocmon").map(|d| d.config_dir().to_path_buf())
}

/// Apply `POCMON_TOKEN`, `POCMON_TIMEZONE` and `POCMON_SLACK_API_BASE`.
pub fn apply_env_overrides(config: &mut PocmonConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut PocmonConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |suffix: &str| {
        lookup(&format!("{ENV_PREFIX}{suffix}")).filter(|v| !v.trim().is_empty())
    };

    if let Some(token) = var("TOKEN") {
        debug!("token overridden from environment");
        config.token = Secret::new(token);
    }
    if let Some(tz) = var("TIMEZONE") {
        config.timezone = tz;
    }
    if let Some(base) = var("SLACK_API_BASE") {
        config.slack.api_base = base;
    }
}

fn format_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

pub(crate) fn parse_config(raw: &str, path: &Path) -> Result<PocmonConfig> {
    match format_of(path) {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse("toml", e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse("yaml", e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse("json", e)),
        ext => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}

pub(crate) fn parse_config_value(raw: &str, path: &Path) -> Result<serde_json::Value> {
    match format_of(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(raw).map_err(|e| Error::parse("toml", e))?;
            serde_json::to_value(v).map_err(|e| Error::parse("toml", e))
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| Error::parse("yaml", e))?;
            serde_json::to_value(v).map_err(|e| Error::parse("yaml", e))
        },
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse("json", e)),
        ext => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}
