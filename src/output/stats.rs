//! Run statistics
//!
//! This module summarises a finished run from its ordered pages and the fetch
//! workers' counters, and prints that summary to stdout.

use crate::crawler::{FetchWorkerReport, RunParams};
use crate::state::{PageSlot, SlotState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// First page of the range
    pub start_page: u32,

    /// Last page of the range (inclusive)
    pub end_page: u32,

    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,

    /// Total run duration in milliseconds
    pub elapsed_ms: u64,

    /// Number of pages delivered
    pub total_pages: u64,

    /// Pages that parsed cleanly
    pub parsed_pages: u64,

    /// Pages whose retrieval failed
    pub fetch_failed_pages: u64,

    /// Pages whose payload was empty or only partially extracted
    pub parse_failed_pages: u64,

    /// Records extracted across all pages, including partial pages
    pub total_records: u64,

    /// Mean latency of fetch attempts in milliseconds
    pub mean_fetch_latency_ms: f64,

    pub fetch_workers: u32,
    pub parse_workers: u32,

    /// Hash of the configuration file the run was started from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

impl RunReport {
    /// Builds a report from the ordered pages and fetch worker counters
    pub fn from_run(
        params: &RunParams,
        pages: &[PageSlot],
        fetch_reports: &[FetchWorkerReport],
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let count = |state: SlotState| pages.iter().filter(|p| p.state() == state).count() as u64;

        let attempts: u64 = fetch_reports.iter().map(FetchWorkerReport::attempts).sum();
        let total_latency: Duration = fetch_reports.iter().map(|r| r.total_latency).sum();
        let mean_fetch_latency_ms = if attempts > 0 {
            total_latency.as_secs_f64() * 1000.0 / attempts as f64
        } else {
            0.0
        };

        Self {
            start_page: params.start_page,
            end_page: params.end_page(),
            started_at,
            elapsed_ms: elapsed.as_millis() as u64,
            total_pages: pages.len() as u64,
            parsed_pages: count(SlotState::Parsed),
            fetch_failed_pages: count(SlotState::FetchFailed),
            parse_failed_pages: count(SlotState::ParseFailed),
            total_records: pages.iter().map(|p| p.records().len() as u64).sum(),
            mean_fetch_latency_ms,
            fetch_workers: params.fetch_workers,
            parse_workers: params.parse_workers,
            config_hash: None,
        }
    }

    /// Attaches the configuration hash
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Pages that reached the end of the pipeline degraded
    pub fn degraded_pages(&self) -> u64 {
        self.fetch_failed_pages + self.parse_failed_pages
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        (self.parsed_pages as f64 / self.total_pages as f64) * 100.0
    }
}

/// Prints a run report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &RunReport) {
    println!("=== Run Statistics ===\n");

    println!("Overview:");
    println!(
        "  Pages: {}..={} ({} delivered)",
        report.start_page, report.end_page, report.total_pages
    );
    println!(
        "  Workers: {} fetch / {} parse",
        report.fetch_workers, report.parse_workers
    );
    println!("  Started: {}", report.started_at.to_rfc3339());
    println!("  Elapsed: {:.3}s", report.elapsed_ms as f64 / 1000.0);
    if let Some(hash) = &report.config_hash {
        println!("  Config hash: {}", hash);
    }
    println!();

    println!("Pages by State:");
    for (state, count) in [
        (SlotState::Parsed, report.parsed_pages),
        (SlotState::FetchFailed, report.fetch_failed_pages),
        (SlotState::ParseFailed, report.parse_failed_pages),
    ] {
        let percentage = if report.total_pages > 0 {
            (count as f64 / report.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    println!("Records extracted: {}", report.total_records);
    println!("Mean fetch latency: {:.1}ms", report.mean_fetch_latency_ms);
    println!(
        "Success Rate: {:.1}% ({} / {} pages parsed)",
        report.success_rate(),
        report.parsed_pages,
        report.total_pages
    );
}
