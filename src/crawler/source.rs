//! Task source: turns a page range into ordered fetch tasks
//!
//! Page numbering is derived from the explicit `start_page` of each run; there
//! is no counter that outlives a call, so two runs over the same range always
//! produce identical indices.

use crate::config::{Config, CrawlConfig, SourceConfig, UserAgentConfig};
use crate::config::validate_run_params;
use crate::state::PageSlot;
use crate::ConfigError;
use std::collections::BTreeMap;
use url::Url;

/// Parameters validated before the pipeline starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    /// First page number (1-based)
    pub start_page: u32,
    /// Number of consecutive pages
    pub page_count: u32,
    /// Fetch pool size
    pub fetch_workers: u32,
    /// Parse pool size
    pub parse_workers: u32,
}

impl RunParams {
    /// Last page number in the range, inclusive
    pub fn end_page(&self) -> u32 {
        self.start_page + self.page_count.saturating_sub(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_run_params(self)
    }
}

impl From<&CrawlConfig> for RunParams {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            start_page: config.start_page,
            page_count: config.page_count,
            fetch_workers: config.fetch_workers,
            parse_workers: config.parse_workers,
        }
    }
}

/// Immutable request descriptor handed to the retrieval interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: String,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
}

/// One page's retrieval work: the request plus the slot it resolves
#[derive(Debug)]
pub struct FetchTask {
    pub request: FetchRequest,
    pub slot: PageSlot,
}

impl FetchTask {
    /// Page number this task resolves
    pub fn page(&self) -> u32 {
        self.slot.index()
    }
}

/// Builds the request for any page number
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    base_url: Url,
    page_param: String,
    page_size_param: String,
    page_size: u32,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
}

impl RequestTemplate {
    /// Creates a template from the source and user-agent sections
    pub fn new(source: &SourceConfig, user_agent: &UserAgentConfig) -> Result<Self, ConfigError> {
        let mut base_url = Url::parse(&source.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
        base_url.set_query(None);

        let mut headers = source.headers.clone();
        headers
            .entry("user-agent".to_string())
            .or_insert_with(|| user_agent.header_value());

        Ok(Self {
            base_url,
            page_param: source.page_param.clone(),
            page_size_param: source.page_size_param.clone(),
            page_size: source.page_size,
            query: source.query.clone(),
            headers,
        })
    }

    /// Builds the GET request for one page
    ///
    /// Fixed query parameters come first, followed by page number and page size.
    pub fn request_for(&self, page: u32) -> FetchRequest {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair(&self.page_param, &page.to_string());
            pairs.append_pair(&self.page_size_param, &self.page_size.to_string());
        }

        FetchRequest {
            method: "GET".to_string(),
            url,
            headers: self.headers.clone(),
        }
    }
}

/// Produces the ordered fetch tasks for a page range
#[derive(Debug, Clone)]
pub struct TaskSource {
    template: RequestTemplate,
}

impl TaskSource {
    pub fn new(template: RequestTemplate) -> Self {
        Self { template }
    }

    /// Builds a task source from a loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(RequestTemplate::new(
            &config.source,
            &config.user_agent,
        )?))
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    /// Produces `count` tasks with slot indices `start..start + count`, in order
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if `start < 1`, `count < 1`, or the
    /// range overflows.
    pub fn tasks(&self, start: u32, count: u32) -> Result<Vec<FetchTask>, ConfigError> {
        if start < 1 {
            return Err(ConfigError::Validation(format!(
                "start_page must be >= 1, got {}",
                start
            )));
        }
        if count < 1 {
            return Err(ConfigError::Validation(format!(
                "page_count must be >= 1, got {}",
                count
            )));
        }
        let end = start.checked_add(count - 1).ok_or_else(|| {
            ConfigError::Validation(format!(
                "page range starting at {} with {} pages overflows",
                start, count
            ))
        })?;

        Ok((start..=end)
            .map(|page| FetchTask {
                request: self.template.request_for(page),
                slot: PageSlot::new(page),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SlotState;

    fn source_config() -> SourceConfig {
        let mut query = BTreeMap::new();
        query.insert("view".to_string(), "page".to_string());
        SourceConfig {
            base_url: "https://cn.reuters.com/news/archive/topic-cn-top-news".to_string(),
            page_param: "page".to_string(),
            page_size_param: "pageSize".to_string(),
            page_size: 10,
            query,
            headers: BTreeMap::new(),
        }
    }

    fn user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestPager".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
        }
    }

    fn task_source() -> TaskSource {
        TaskSource::new(RequestTemplate::new(&source_config(), &user_agent()).unwrap())
    }

    #[test]
    fn test_indices_are_contiguous_and_ordered() {
        let tasks = task_source().tasks(4, 5).unwrap();
        let indices: Vec<u32> = tasks.iter().map(FetchTask::page).collect();
        assert_eq!(indices, vec![4, 5, 6, 7, 8]);
        assert!(tasks.iter().all(|t| t.slot.state() == SlotState::Pending));
    }

    #[test]
    fn test_numbering_restarts_each_run() {
        let source = task_source();
        let first: Vec<u32> = source.tasks(1, 3).unwrap().iter().map(FetchTask::page).collect();
        let second: Vec<u32> = source.tasks(1, 3).unwrap().iter().map(FetchTask::page).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let source = task_source();
        assert!(matches!(source.tasks(0, 3), Err(ConfigError::Validation(_))));
        assert!(matches!(source.tasks(1, 0), Err(ConfigError::Validation(_))));
        assert!(matches!(
            source.tasks(u32::MAX, 2),
            Err(ConfigError::Validation(_))
        ));
        assert_eq!(source.tasks(u32::MAX, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_request_url_encoding() {
        let request = task_source().template().request_for(3);
        assert_eq!(request.method, "GET");
        assert_eq!(
            request.url.as_str(),
            "https://cn.reuters.com/news/archive/topic-cn-top-news?view=page&page=3&pageSize=10"
        );
    }

    #[test]
    fn test_request_carries_user_agent() {
        let request = task_source().template().request_for(1);
        assert_eq!(
            request.headers.get("user-agent").map(String::as_str),
            Some("TestPager/1.0 (+https://example.com/about)")
        );
    }

    #[test]
    fn test_configured_user_agent_header_wins() {
        let mut source = source_config();
        source
            .headers
            .insert("user-agent".to_string(), "Mozilla/5.0".to_string());
        let template = RequestTemplate::new(&source, &user_agent()).unwrap();
        let request = template.request_for(1);
        assert_eq!(
            request.headers.get("user-agent").map(String::as_str),
            Some("Mozilla/5.0")
        );
    }

    #[test]
    fn test_run_params_end_page() {
        let params = RunParams {
            start_page: 5,
            page_count: 3,
            fetch_workers: 1,
            parse_workers: 1,
        };
        assert_eq!(params.end_page(), 7);
        assert!(params.validate().is_ok());
    }
}
