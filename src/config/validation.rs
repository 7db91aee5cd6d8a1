use crate::config::types::{
    Config, CrawlConfig, ExtractConfig, OutputConfig, SourceConfig, UserAgentConfig,
};
use crate::crawler::RunParams;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Largest pool size accepted for either worker pool
const MAX_WORKERS: u32 = 256;

/// Largest page range accepted for a single run
const MAX_PAGE_COUNT: u32 = 10_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_crawl_config(&config.crawl)?;
    validate_extract_config(&config.extract)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the run parameters handed to the task source and worker pools
///
/// Out-of-range values are rejected, never clamped.
pub fn validate_run_params(params: &RunParams) -> Result<(), ConfigError> {
    if params.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "start_page must be >= 1, got {}",
            params.start_page
        )));
    }

    if params.page_count < 1 || params.page_count > MAX_PAGE_COUNT {
        return Err(ConfigError::Validation(format!(
            "page_count must be between 1 and {}, got {}",
            MAX_PAGE_COUNT, params.page_count
        )));
    }

    if params.start_page.checked_add(params.page_count - 1).is_none() {
        return Err(ConfigError::Validation(format!(
            "page range starting at {} with {} pages overflows",
            params.start_page, params.page_count
        )));
    }

    validate_pool_size("fetch_workers", params.fetch_workers)?;
    validate_pool_size("parse_workers", params.parse_workers)?;

    Ok(())
}

fn validate_pool_size(name: &str, size: u32) -> Result<(), ConfigError> {
    if size < 1 || size > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_WORKERS, size
        )));
    }
    Ok(())
}

/// Validates the listing source
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    if config.page_size_param.is_empty() {
        return Err(ConfigError::Validation(
            "page_size_param cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    for name in config.headers.keys() {
        if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid header name: '{}'",
                name
            )));
        }
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

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates pool sizes and timing
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_run_params(&RunParams::from(config))?;

    for (name, value) in [
        ("dequeue_timeout_ms", config.dequeue_timeout_ms),
        ("drain_check_ms", config.drain_check_ms),
        ("aggregation_grace_ms", config.aggregation_grace_ms),
        ("shutdown_timeout_secs", config.shutdown_timeout_secs),
        ("request_timeout_secs", config.request_timeout_secs),
        ("connect_timeout_secs", config.connect_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    Ok(())
}

/// Validates that every selector parses
fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.article_selector,
        &config.title_selector,
        &config.body_selector,
        &config.timestamp_selector,
    ] {
        validate_selector(selector)?;
    }
    Ok(())
}

/// Validates a single CSS selector
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(
            "Selector cannot be empty".to_string(),
        ));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}
