use crate::config::types::{ApiConfig, Config, CrawlConfig, OutputConfig, UserAgentConfig};
use crate::harvest::ShardDefinition;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawl_config(&config.crawl, config.shards.len())?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_shards(&config.shards)?;
    Ok(())
}

/// Validates the upstream API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base_url must use HTTPS scheme, got '{}'",
            config.base_url
        )));
    }

    if config.query.is_empty() {
        return Err(ConfigError::Validation("query cannot be empty".to_string()));
    }

    if config.facet_param.is_empty() {
        return Err(ConfigError::Validation(
            "facet_param cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > 500 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 500, got {}",
            config.page_size
        )));
    }

    if config.max_offset < config.page_size as u64 {
        return Err(ConfigError::Validation(format!(
            "max_offset ({}) must be at least one page ({})",
            config.max_offset, config.page_size
        )));
    }

    if !config.id_pointer.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "id_pointer must be a JSON pointer starting with '/', got '{}'",
            config.id_pointer
        )));
    }

    Ok(())
}

/// Validates crawl behavior configuration
fn validate_crawl_config(config: &CrawlConfig, shard_count: usize) -> Result<(), ConfigError> {
    if config.politeness_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "politeness_delay_ms must be >= 100ms, got {}ms",
            config.politeness_delay_ms
        )));
    }

    if config.retry_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_limit must be >= 1, got {}",
            config.retry_limit
        )));
    }

    if config.checkpoint_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_pages must be >= 1, got {}",
            config.checkpoint_pages
        )));
    }

    if config.rate_limit_base_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "rate_limit_base_secs must be >= 1, got {}",
            config.rate_limit_base_secs
        )));
    }

    if config.rate_limit_max_secs < config.rate_limit_base_secs {
        return Err(ConfigError::Validation(format!(
            "rate_limit_max_secs ({}) must be >= rate_limit_base_secs ({})",
            config.rate_limit_max_secs, config.rate_limit_base_secs
        )));
    }

    if shard_count > 0 && config.start_shard >= shard_count {
        return Err(ConfigError::Validation(format!(
            "start_shard ({}) is out of range for {} shards",
            config.start_shard, shard_count
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the shard plan entries
fn validate_shards(shards: &[ShardDefinition]) -> Result<(), ConfigError> {
    if shards.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[shard]] entry is required".to_string(),
        ));
    }

    let mut labels = HashSet::new();
    for shard in shards {
        if shard.label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Shard label cannot be empty".to_string(),
            ));
        }

        if shard.facet.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Shard '{}' has an empty facet expression",
                shard.label
            )));
        }

        if !labels.insert(shard.label.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate shard label '{}'",
                shard.label
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
