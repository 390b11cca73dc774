use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment overrides.
const ENV_PREFIX: &str = "CALCIFER_";

/// Load configuration from file with environment variable overrides
///
/// Variables are prefixed with `CALCIFER_` and nested keys are separated by
/// `__`, e.g. `CALCIFER_JOBS__OUTCOME_BUFFER=16`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_layered(Some(path))
}

/// Load configuration from defaults, an optional file and the environment.
///
/// Later layers win. Without a file, environment overrides still apply on
/// top of the built-in defaults.
pub fn load_config_layered(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
