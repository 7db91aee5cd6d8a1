//! Markdown digest generation
//!
//! This module renders a human-readable markdown digest of a run: run
//! metadata, a state breakdown table, then every page's records in order.

use crate::output::stats::RunReport;
use crate::output::traits::{OutputResult, Sink};
use crate::state::PageSlot;

/// Sink producing `pages_<start>-<end>.md`
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownSink;

impl Sink for MarkdownSink {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, pages: &[PageSlot], report: &RunReport) -> OutputResult<String> {
        Ok(format_markdown_digest(pages, report))
    }
}

/// Formats a run as markdown
///
/// # Arguments
///
/// * `pages` - The ordered pages of the run
/// * `report` - The run report
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_digest(pages: &[PageSlot], report: &RunReport) -> String {
    let mut md = String::new();

    // Title
    md.push_str(&format!(
        "# Archive Pages {}-{}\n\n",
        report.start_page, report.end_page
    ));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.3} seconds\n",
        report.elapsed_ms as f64 / 1000.0
    ));
    md.push_str(&format!(
        "- **Workers**: {} fetch / {} parse\n",
        report.fetch_workers, report.parse_workers
    ));
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push_str(&format!("- **Records**: {}\n", report.total_records));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    // State breakdown
    md.push_str("## Page State Breakdown\n\n");
    md.push_str("| State | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Parsed | {} |\n", report.parsed_pages));
    md.push_str(&format!("| Fetch Failed | {} |\n", report.fetch_failed_pages));
    md.push_str(&format!("| Parse Failed | {} |\n\n", report.parse_failed_pages));

    // Pages
    for page in pages {
        md.push_str(&format!("## Page {}\n\n", page.index()));
        if page.is_degraded() {
            md.push_str(&format!("_{}_\n\n", page.state()));
        }
        for record in page.records() {
            md.push_str(&format!("### {}\n\n", record.title));
            if !record.timestamp.is_empty() {
                md.push_str(&format!("*{}*\n\n", record.timestamp));
            }
            if !record.body.is_empty() {
                md.push_str(&format!("{}\n\n", record.body));
            }
        }
    }

    md
}
