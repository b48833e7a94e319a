//! Configuration validation
//!
//! Rules:
//! - connection string present
//! - topic name present
//! - topic size > 0
//! - retry base delay > 0
//! - backoff multiplier cap > 0

use contracts::{ContractError, ServiceConfig};

/// Validate a ServiceConfig
///
/// Returns the first error found, or Ok(()).
pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
    validate_service_bus(config)?;
    validate_topic(config)?;
    validate_retry(config)?;
    Ok(())
}

fn validate_service_bus(config: &ServiceConfig) -> Result<(), ContractError> {
    if config.service_bus.connection_string.trim().is_empty() {
        return Err(ContractError::config_validation(
            "service_bus.connection_string",
            "connection string cannot be empty",
        ));
    }
    Ok(())
}

fn validate_topic(config: &ServiceConfig) -> Result<(), ContractError> {
    let settings = &config.dispatcher;
    if settings.topic.trim().is_empty() {
        return Err(ContractError::config_validation(
            "dispatcher.topic",
            "topic name cannot be empty",
        ));
    }
    if settings.topic_size_mb == 0 {
        return Err(ContractError::config_validation(
            "dispatcher.topic_size_mb",
            "topic_size_mb must be > 0",
        ));
    }
    Ok(())
}

fn validate_retry(config: &ServiceConfig) -> Result<(), ContractError> {
    if config.dispatcher.retry_base_delay_ms == 0 {
        return Err(ContractError::config_validation(
            "dispatcher.retry_base_delay_ms",
            "retry_base_delay_ms must be > 0",
        ));
    }
    if config.dispatcher.max_backoff_multiplier == 0 {
        return Err(ContractError::config_validation(
            "dispatcher.max_backoff_multiplier",
            "max_backoff_multiplier must be > 0",
        ));
    }
    Ok(())
}
