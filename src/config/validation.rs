//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (debounce > 0, body limit > 0)
//! - Reject commands that cannot be spawned (empty argv)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HostConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::HostConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("http.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("static_files.index must not be empty")]
    EmptyIndex,

    #[error("reload.debounce_ms must be greater than zero when reload is enabled")]
    ZeroDebounce,

    #[error("reload.build_command must name a program")]
    EmptyBuildCommand,

    #[error("reload.dev_command must name a program when set")]
    EmptyDevCommand,

    #[error("reload.extensions must list at least one extension")]
    NoExtensions,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &HostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.http.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.static_files.enabled && config.static_files.index.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyIndex);
    }

    let reload = &config.reload;
    if reload.enabled {
        if reload.debounce_ms == 0 {
            errors.push(ValidationError::ZeroDebounce);
        }
        if reload.build_command.first().map_or(true, |p| p.trim().is_empty()) {
            errors.push(ValidationError::EmptyBuildCommand);
        }
        if reload.extensions.is_empty() {
            errors.push(ValidationError::NoExtensions);
        }
    }
    if let Some(dev) = &reload.dev_command {
        if dev.first().map_or(true, |p| p.trim().is_empty()) {
            errors.push(ValidationError::EmptyDevCommand);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&HostConfig::default()).is_ok());
    }

    #[test]
    fn disabled_reload_skips_reload_checks() {
        let mut config = HostConfig::default();
        config.reload.enabled = false;
        config.reload.debounce_ms = 0;
        config.reload.build_command.clear();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = HostConfig::default();
        config.listener.host = " ".into();
        config.reload.enabled = true;
        config.reload.debounce_ms = 0;
        config.reload.build_command.clear();
        config.reload.dev_command = Some(vec![]);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyHost,
                ValidationError::ZeroDebounce,
                ValidationError::EmptyBuildCommand,
                ValidationError::EmptyDevCommand,
            ]
        );
    }
}
