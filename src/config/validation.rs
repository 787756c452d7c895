use crate::config::types::{
    BootstrapConfig, Config, CrawlerConfig, FilterConfig, HarvestConfig, SiteConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_filter_config(&config.filter)?;
    validate_crawler_config(&config.crawler)?;
    validate_harvest_config(&config.harvest)?;
    validate_bootstrap_config(&config.bootstrap)?;
    validate_output_config(config)?;
    Ok(())
}

/// Validates site endpoints and signals
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("api_url", &config.api_url),
        ("page_url", &config.page_url),
        ("base_url", &config.base_url),
    ] {
        let url = Url::parse(value)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", name, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "{} must use http or https, got '{}'",
                name, value
            )));
        }
    }

    if config.success_markers.iter().all(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "success_markers must contain at least one non-empty marker".to_string(),
        ));
    }

    if !(100..=599).contains(&config.challenge_status) {
        return Err(ConfigError::Validation(format!(
            "challenge_status must be a valid HTTP status, got {}",
            config.challenge_status
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates search filter configuration
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    Ok(())
}

/// Validates detail engine configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent < 1 || config.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent must be between 1 and 100, got {}",
            config.max_concurrent
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "harvest max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates bootstrap polling configuration
fn validate_bootstrap_config(config: &BootstrapConfig) -> Result<(), ConfigError> {
    if config.poll_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "poll_attempts must be >= 1, got {}",
            config.poll_attempts
        )));
    }

    if config.capture_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "capture_timeout_secs must be >= 1, got {}",
            config.capture_timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &Config) -> Result<(), ConfigError> {
    if config.output.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
