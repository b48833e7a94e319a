//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{ServiceConfig, DEFAULT_TOPIC};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    broker_host: String,
    topic: String,
    topic_size_mb: u32,
    retry_base_delay_ms: u64,
    max_backoff_multiplier: u32,
    max_backoff_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let settings = &config.dispatcher;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    broker_host: broker_host(&config.service_bus.connection_string),
                    topic: settings.topic.clone(),
                    topic_size_mb: settings.topic_size_mb,
                    retry_base_delay_ms: settings.retry_base_delay_ms,
                    max_backoff_multiplier: settings.max_backoff_multiplier,
                    max_backoff_ms: settings
                        .retry_base_delay_ms
                        .saturating_mul(u64::from(settings.max_backoff_multiplier)),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ServiceConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let settings = &config.dispatcher;

    if settings.topic != DEFAULT_TOPIC {
        warnings.push(format!(
            "Topic '{}' differs from '{}' - subscribers must be configured for it",
            settings.topic, DEFAULT_TOPIC
        ));
    }

    if !config.service_bus.connection_string.contains("://") {
        warnings.push("service_bus.connection_string has no scheme".to_string());
    }

    warnings
}

/// Host part of a connection string, never the credentials
fn broker_host(connection_string: &str) -> String {
    let without_scheme = connection_string
        .split_once("://")
        .map_or(connection_string, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', ';'])
        .next()
        .unwrap_or_default();
    host.rsplit('@').next().unwrap_or_default().to_string()
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Broker: {}", summary.broker_host);
            println!("  Topic: {} ({} MB)", summary.topic, summary.topic_size_mb);
            println!("  Retry base delay: {} ms", summary.retry_base_delay_ms);
            println!(
                "  Max backoff: {} ms (x{})",
                summary.max_backoff_ms, summary.max_backoff_multiplier
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_broker_host_strips_scheme_and_credentials() {
        assert_eq!(
            broker_host("sb://key:secret@bus.example.net/;EntityPath=x"),
            "bus.example.net"
        );
        assert_eq!(broker_host("localhost;SharedAccessKey=abc"), "localhost");
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "does/not/exist.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_valid_config_has_summary() {
        let file = write_config(
            r#"
[service_bus]
connection_string = "sb://bus.example.net/"

[dispatcher]
retry_base_delay_ms = 500
max_backoff_multiplier = 4
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid, "{:?}", result.error);
        let summary = result.summary.unwrap();
        assert_eq!(summary.topic, DEFAULT_TOPIC);
        assert_eq!(summary.max_backoff_ms, 2000);
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_custom_topic_warns() {
        let file = write_config(
            r#"
[service_bus]
connection_string = "sb://bus.example.net/"

[dispatcher]
topic = "Other"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        assert_eq!(result.warnings.unwrap().len(), 1);
    }
}
