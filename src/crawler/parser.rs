//! HTML extraction of content units
//!
//! This module locates the repeated content units (articles) in a listing
//! page and pulls out their title, body excerpt and timestamp:
//! - Units are returned in document order
//! - Title and body are required; the timestamp is optional in the markup
//! - A unit missing a required field stops extraction, and the units found
//!   before it are handed back with the error

use crate::config::ExtractConfig;
use crate::{ConfigError, ExtractionError};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Raw fields of one content unit, before whitespace normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedUnit {
    pub title: String,
    pub body: String,
    pub timestamp: String,
}

impl ExtractedUnit {
    pub fn new(title: impl Into<String>, body: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Extraction that stopped partway, with the units recovered before the failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("extraction stopped after {} unit(s): {source}", .recovered.len())]
pub struct PartialExtraction {
    pub recovered: Vec<ExtractedUnit>,
    #[source]
    pub source: ExtractionError,
}

/// Extraction interface consumed by the parse pool
///
/// Implementations are pure functions of the payload and hold no shared
/// mutable state; every parse worker calls the same instance.
pub trait Extractor: Send + Sync {
    fn extract_units(&self, payload: &str) -> Result<Vec<ExtractedUnit>, PartialExtraction>;
}

/// `Extractor` driven by CSS selectors
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    article: Selector,
    title: Selector,
    body: Selector,
    timestamp: Selector,
}

impl SelectorExtractor {
    /// Compiles the configured selectors
    ///
    /// # Example
    ///
    /// ```
    /// use archive_pager::config::ExtractConfig;
    /// use archive_pager::crawler::{Extractor, SelectorExtractor};
    ///
    /// let extractor = SelectorExtractor::new(&ExtractConfig::default()).unwrap();
    /// let html = r#"<div class="news-headline-list"><article>
    ///     <h3 class="story-title">Title</h3>
    ///     <div class="story-content"><p>Body</p></div>
    /// </article></div>"#;
    /// let units = extractor.extract_units(html).unwrap();
    /// assert_eq!(units.len(), 1);
    /// ```
    pub fn new(config: &ExtractConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            article: compile(&config.article_selector)?,
            title: compile(&config.title_selector)?,
            body: compile(&config.body_selector)?,
            timestamp: compile(&config.timestamp_selector)?,
        })
    }
}

impl Extractor for SelectorExtractor {
    fn extract_units(&self, payload: &str) -> Result<Vec<ExtractedUnit>, PartialExtraction> {
        let document = Html::parse_document(payload);
        let mut units = Vec::new();

        for (position, article) in document.select(&self.article).enumerate() {
            let title = match first_text(&article, &self.title) {
                Some(title) => title,
                None => return Err(stopped(units, position, "title")),
            };
            let body = match first_text(&article, &self.body) {
                Some(body) => body,
                None => return Err(stopped(units, position, "body")),
            };
            let timestamp = first_text(&article, &self.timestamp).unwrap_or_default();

            units.push(ExtractedUnit {
                title,
                body,
                timestamp,
            });
        }

        Ok(units)
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Text of the first match of `selector` inside `element`
fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|found| found.text().collect::<String>())
}

fn stopped(recovered: Vec<ExtractedUnit>, position: usize, field: &'static str) -> PartialExtraction {
    PartialExtraction {
        recovered,
        source: ExtractionError::MissingField {
            unit: position + 1,
            field,
        },
    }
}
