//! Configuration loading, env substitution and overrides, and validation.
//!
//! Config files: `pocmon.toml`, `pocmon.yaml`, `pocmon.yml` or `pocmon.json`,
//! searched in `./` then `~/.config/pocmon/`, falling back to `./config.json`.
//!
//! Supports `${ENV_VAR}` substitution in all string values and `POCMON_*`
//! environment overrides.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        LoadedConfig, apply_env_overrides, config_dir, find_config_file, load, load_config,
    },
    schema::{ChannelConfig, NameSet, PocmonConfig, SlackConfig},
    template::default_config_template,
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_file},
};
