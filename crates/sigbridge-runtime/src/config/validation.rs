//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    AdapterSelection, ExecutiveConfig, LoggingConfig, PipelineConfig, SigbridgeConfig,
};

/// Validates the entire configuration.
pub fn validate_config(config: &SigbridgeConfig) -> ConfigResult<()> {
    if config.catalog.path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("catalog.path"));
    }

    validate_selection(&config.external_system, "external_system.type")?;
    validate_selection(&config.process_model, "process_model.type")?;
    validate_pipeline(&config.pipeline)?;
    validate_executive(&config.executive)?;
    validate_logging(&config.logging)?;

    if config.management.host.trim().is_empty() {
        return Err(ConfigError::missing_field("management.host"));
    }

    Ok(())
}

fn validate_selection(selection: &AdapterSelection, field: &str) -> ConfigResult<()> {
    if selection.type_name.trim().is_empty() {
        return Err(ConfigError::missing_field(field));
    }
    if selection.type_name.contains(char::is_whitespace) {
        return Err(ConfigError::invalid(
            field,
            format!("'{}' contains whitespace", selection.type_name),
        ));
    }
    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> ConfigResult<()> {
    if pipeline.batch_size == 0 {
        return Err(ConfigError::invalid(
            "pipeline.batch_size",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_executive(executive: &ExecutiveConfig) -> ConfigResult<()> {
    if executive.cycle_interval_ms == 0 {
        return Err(ConfigError::invalid(
            "executive.cycle_interval_ms",
            "must be greater than 0",
        ));
    }
    if executive.retry.max_attempts > 0 && executive.retry.delay_ms == 0 {
        return Err(ConfigError::invalid(
            "executive.retry.delay_ms",
            "must be greater than 0 when retries are enabled",
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    let name = logging.file_name.trim();
    if name.is_empty() {
        return Err(ConfigError::missing_field("logging.file_name"));
    }
    if name.contains(['/', '\\']) {
        return Err(ConfigError::invalid(
            "logging.file_name",
            "must be a bare file name",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SigbridgeConfig {
        SigbridgeConfig {
            external_system: AdapterSelection::new("memory"),
            process_model: AdapterSelection::new("memory"),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_minimal_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_missing_adapter_type() {
        let mut config = valid();
        config.process_model = AdapterSelection::default();

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(ConfigError::MissingField(field)) if field == "process_model.type"
        ));
    }

    #[test]
    fn test_zero_cycle_interval() {
        let mut config = valid();
        config.executive.cycle_interval_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(err.field(), Some("executive.cycle_interval_ms"));
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = valid();
        config.pipeline.batch_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.field(), Some("pipeline.batch_size"));
    }

    #[test]
    fn test_retry_needs_delay() {
        let mut config = valid();
        config.executive.retry.max_attempts = 3;
        config.executive.retry.delay_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.field(), Some("executive.retry.delay_ms"));
    }

    #[test]
    fn test_log_file_name_with_separator() {
        let mut config = valid();
        config.logging.file_name = "../escape.log".to_string();
        assert!(validate_config(&config).is_err());
    }
}
