//! Archive-Pager: an ordered, concurrent archive page crawler
//!
//! This crate fetches a contiguous range of paginated listing pages, extracts
//! structured records (title, body excerpt, timestamp) from each page, and
//! hands them to a sink in original page order, even though pages are fetched
//! and parsed concurrently by independent worker pools.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Archive-Pager operations
#[derive(Debug, Error)]
pub enum PagerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
///
/// Raised before the pipeline starts; a run never begins with an invalid
/// configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Retrieval failures
///
/// These never cross a queue boundary. A fetch worker turns them into a
/// degraded page slot and keeps going.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

/// Failures while locating fields inside a page payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Unit {unit} is missing its {field}")]
    MissingField { unit: usize, field: &'static str },
}

/// Run-level pipeline failures
///
/// Only coordinator-level invariant violations end up here. Per-page
/// failures are recorded on the page slot instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Result queue did not drain: expected {expected} pages, received {received} within {grace_ms}ms")]
    AggregationTimeout {
        expected: usize,
        received: usize,
        grace_ms: u64,
    },

    #[error("Parse workers did not observe termination within {timeout_secs}s")]
    ShutdownStalled { timeout_secs: u64 },

    #[error("{stage} worker panicked: {message}")]
    WorkerPanicked { stage: &'static str, message: String },

    #[error("Page {0} was delivered more than once")]
    DuplicateIndex(u32),

    #[error("Page {0} is outside the requested range")]
    UnexpectedIndex(u32),

    #[error("The {0} queue closed unexpectedly")]
    QueueClosed(&'static str),
}

/// Result type alias for Archive-Pager operations
pub type Result<T> = std::result::Result<T, PagerError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, RunParams};
pub use state::{PageSlot, Record, SlotState};
