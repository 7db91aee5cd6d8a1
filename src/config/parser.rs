use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use archive_pager::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Start page: {}", config.crawl.start_page);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub(crate) fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is stamped into the run report so output files can be traced
/// back to the configuration that produced them.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputFormat, SessionMode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_CONFIG: &str = r#"
[source]
base-url = "https://cn.reuters.com/news/archive/topic-cn-top-news"

[source.query]
view = "page"

[user-agent]
crawler-name = "TestPager"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[crawl]
start-page = 1
page-count = 3
fetch-workers = 2
parse-workers = 2

[output]
directory = "./out"
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.start_page, 1);
        assert_eq!(config.crawl.page_count, 3);
        assert_eq!(config.crawl.fetch_workers, 2);
        assert_eq!(config.user_agent.crawler_name, "TestPager");
        assert_eq!(config.source.query.get("view").map(String::as_str), Some("page"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(VALID_CONFIG).unwrap();

        assert_eq!(config.source.page_param, "page");
        assert_eq!(config.source.page_size_param, "pageSize");
        assert_eq!(config.source.page_size, 10);
        assert_eq!(config.crawl.session, SessionMode::Shared);
        assert_eq!(config.crawl.dequeue_timeout_ms, 250);
        assert_eq!(config.extract.article_selector, "div.news-headline-list article");
        assert_eq!(config.extract.title_selector, "h3.story-title");
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_session_and_format_parse() {
        let content = VALID_CONFIG
            .replace("parse-workers = 2", "parse-workers = 2\nsession = \"per-worker\"")
            .replace("directory = \"./out\"", "directory = \"./out\"\nformat = \"markdown\"");
        let config = parse_config(&content).unwrap();

        assert_eq!(config.crawl.session, SessionMode::PerWorker);
        assert_eq!(config.output.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_page_count_rejected() {
        let content = VALID_CONFIG.replace("page-count = 3", "page-count = 0");
        let result = parse_config(&content);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_start_page_rejected() {
        let content = VALID_CONFIG.replace("start-page = 1", "start-page = 0");
        let result = parse_config(&content);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_negative_page_count_rejected() {
        let content = VALID_CONFIG.replace("page-count = 3", "page-count = -3");
        let result = parse_config(&content);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let content = format!("{}\n[extract]\narticle-selector = \"div[\"\n", VALID_CONFIG);
        let result = parse_config(&content);
        assert!(matches!(result, Err(ConfigError::InvalidSelector(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
