//! Output sink traits and types
//!
//! This module defines the trait interface for output sinks, which receive
//! the ordered pages of a finished run.

use crate::output::stats::RunReport;
use crate::state::PageSlot;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for output sinks
///
/// A sink receives the complete, ordered page sequence exactly once per run.
pub trait Sink {
    /// File extension used by this sink
    fn extension(&self) -> &'static str;

    /// Renders the pages and report into the sink's document format
    fn render(&self, pages: &[PageSlot], report: &RunReport) -> OutputResult<String>;

    /// Writes the run into `directory`, creating it if missing
    ///
    /// # Returns
    ///
    /// The path of the file that was written
    fn write(&self, pages: &[PageSlot], report: &RunReport, directory: &Path) -> OutputResult<PathBuf> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(output_file_name(report, self.extension()));
        let document = self.render(pages, report)?;
        std::fs::write(&path, document)?;
        Ok(path)
    }
}

/// Output file name for a run: `pages_<start>-<end>.<ext>`
pub fn output_file_name(report: &RunReport, extension: &str) -> String {
    format!(
        "pages_{}-{}.{}",
        report.start_page, report.end_page, extension
    )
}
