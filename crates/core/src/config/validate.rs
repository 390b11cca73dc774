use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Engine program is set
/// - Outcome buffer is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.engine.program.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.program cannot be empty".to_string(),
        ));
    }

    if config.jobs.outcome_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "jobs.outcome_buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}
