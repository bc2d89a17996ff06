use crate::config::types::{
    BatchConfig, Config, PollingConfig, RetryConfig, ScrapeConfig, ServiceConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_service_config(&config.service)?;
    validate_polling_config(&config.polling)?;
    validate_retry_config(&config.retry)?;
    validate_scrape_config(&config.scrape)?;
    validate_batch_config(&config.batch)?;
    Ok(())
}

/// Validates endpoint and credentials
fn validate_service_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint '{}': {}", config.endpoint, e)))?;

    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    match config.api_key.as_deref() {
        None => {
            return Err(ConfigError::Missing(
                "api-key (set FIRECRAWL_API_KEY or [service] api-key)".to_string(),
            ))
        }
        Some(key) if key.trim().is_empty() => {
            return Err(ConfigError::Validation("api-key cannot be empty".to_string()))
        }
        Some(_) => {}
    }

    if config.request_timeout_ms == 0 || config.connect_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_polling_config(config: &PollingConfig) -> Result<(), ConfigError> {
    if config.interval_ms == 0 {
        return Err(ConfigError::Validation(
            "polling interval-ms must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates retry delays
///
/// The rate-limit cool-down may never be shorter than the transient delay.
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.transient_delay_ms == 0 {
        return Err(ConfigError::Validation(
            "transient-delay-ms must be > 0".to_string(),
        ));
    }

    if config.rate_limit_delay_ms < config.transient_delay_ms {
        return Err(ConfigError::Validation(format!(
            "rate-limit-delay-ms ({}) must be >= transient-delay-ms ({})",
            config.rate_limit_delay_ms, config.transient_delay_ms
        )));
    }

    Ok(())
}

fn validate_scrape_config(config: &ScrapeConfig) -> Result<(), ConfigError> {
    if config.formats.is_empty() {
        return Err(ConfigError::Validation(
            "scrape formats must list at least one format".to_string(),
        ));
    }

    for (i, format) in config.formats.iter().enumerate() {
        if config.formats[..i].contains(format) {
            return Err(ConfigError::Validation(format!(
                "scrape format '{}' listed twice",
                format
            )));
        }
    }

    if config.limit == Some(0) {
        return Err(ConfigError::Validation("scrape limit must be >= 1".to_string()));
    }

    Ok(())
}

fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if let Some(max) = config.max_concurrent_jobs {
        if !(1..=100).contains(&max) {
            return Err(ConfigError::Validation(format!(
                "max-concurrent-jobs must be between 1 and 100, got {}",
                max
            )));
        }
    }
    Ok(())
}
