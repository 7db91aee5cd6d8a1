//! JSON document output
//!
//! Writes the run metadata and the ordered page array as one pretty-printed
//! JSON document.

use crate::output::stats::RunReport;
use crate::output::traits::{OutputResult, Sink};
use crate::state::PageSlot;
use serde::Serialize;

#[derive(Serialize)]
struct Document<'a> {
    run: &'a RunReport,
    pages: &'a [PageSlot],
}

/// Sink producing `pages_<start>-<end>.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl Sink for JsonSink {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, pages: &[PageSlot], report: &RunReport) -> OutputResult<String> {
        Ok(serde_json::to_string_pretty(&Document { run: report, pages })?)
    }
}
