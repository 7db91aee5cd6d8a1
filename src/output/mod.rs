//! Output module for writing run results and reports
//!
//! This module handles:
//! - Writing the ordered pages as JSON or markdown documents
//! - Recording and printing run statistics

mod json;
mod markdown;
pub mod stats;
mod traits;

pub use json::JsonSink;
pub use markdown::{format_markdown_digest, MarkdownSink};
pub use stats::{print_report, RunReport};
pub use traits::{output_file_name, OutputError, OutputResult, Sink};

use crate::config::OutputFormat;

/// Returns the sink for a configured output format
pub fn sink_for(format: OutputFormat) -> Box<dyn Sink + Send + Sync> {
    match format {
        OutputFormat::Json => Box::new(JsonSink),
        OutputFormat::Markdown => Box::new(MarkdownSink),
    }
}
