//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Apply environment overrides
//! - Validate configuration legality
//! - Produce `ServiceConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("Topic: {}", config.dispatcher.topic);
//! ```

mod parser;
mod validator;

pub use contracts::ServiceConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use tracing::debug;

/// Environment variable overriding `service_bus.connection_string`
pub const CONNECTION_STRING_ENV: &str = "SERVICE_BUS_CONNECTION_STRING";

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    /// Environment overrides are applied before validation.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ServiceConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let mut config = parser::parse(&content, format)?;
        Self::apply_env_overrides(&mut config);
        validator::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<ServiceConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(config: &mut ServiceConfig) {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from<F>(config: &mut ServiceConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(CONNECTION_STRING_ENV).filter(|v| !v.trim().is_empty()) {
            debug!(env = CONNECTION_STRING_ENV, "Overriding connection string from environment");
            config.service_bus.connection_string = value;
        }
    }

    /// Serialize ServiceConfig to TOML string
    pub fn to_toml(config: &ServiceConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ServiceConfig to JSON string
    pub fn to_json(config: &ServiceConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[service_bus]
connection_string = "Endpoint=sb://geekburger.servicebus.windows.net/;SharedAccessKeyName=root"

[dispatcher]
topic = "ProductionAreaChanged"
retry_base_delay_ms = 2000
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.dispatcher.retry_base_delay_ms, 2000);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config, config2);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config, config2);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[service_bus]
connection_string = ""
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("connection string"));
    }

    #[test]
    fn test_env_override_replaces_connection_string() {
        let mut config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        ConfigLoader::apply_overrides_from(&mut config, |key| {
            (key == CONNECTION_STRING_ENV).then(|| "sb://override".to_string())
        });
        assert_eq!(config.service_bus.connection_string, "sb://override");
    }

    #[test]
    fn test_blank_env_override_is_ignored() {
        let mut config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let before = config.service_bus.connection_string.clone();
        ConfigLoader::apply_overrides_from(&mut config, |_| Some("   ".to_string()));
        assert_eq!(config.service_bus.connection_string, before);
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.dispatcher.topic, "ProductionAreaChanged");
    }

    #[test]
    fn test_load_from_path_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
