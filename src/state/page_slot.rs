//! Page slot definitions for tracking a page through the pipeline
//!
//! A `PageSlot` is created by the task source before any fetch happens and is
//! moved, never shared, from queue to queue. Whoever holds the slot is its only
//! writer, which is what lets the pipeline run without locks on page data.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;

/// Represents how far a page got through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    // ===== Active States =====
    /// Slot has been created and not yet resolved by a fetch worker
    Pending,

    // ===== Terminal Success States =====
    /// Payload was parsed and all content units were extracted
    Parsed,

    // ===== Terminal Error States =====
    /// Retrieval failed; the slot travels on without a payload
    FetchFailed,

    /// Payload was empty or extraction stopped partway
    ParseFailed,
}

impl SlotState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Parsed)
    }

    /// Returns true if the page reached the end of the pipeline degraded
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::ParseFailed)
    }

    /// Stable string representation used in logs and output files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Parsed => "parsed",
            Self::FetchFailed => "fetch_failed",
            Self::ParseFailed => "parse_failed",
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One structured item extracted from a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Headline text
    pub title: String,

    /// Body excerpt
    pub body: String,

    /// Timestamp exactly as it appeared in the markup (may be empty)
    pub timestamp: String,

    /// Timestamp parsed as RFC 3339, when the markup carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<FixedOffset>>,
}

impl Record {
    /// Builds a record, trimming incidental whitespace from every field
    pub fn new(title: &str, body: &str, timestamp: &str) -> Self {
        let timestamp = timestamp.trim().to_string();
        let published_at = DateTime::parse_from_rfc3339(&timestamp).ok();

        Self {
            title: title.trim().to_string(),
            body: body.trim().to_string(),
            timestamp,
            published_at,
        }
    }
}

/// Placeholder for one page's eventual content
///
/// `index` is fixed at creation and is the only ordering key for the final
/// output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSlot {
    index: u32,
    records: Vec<Record>,
    state: SlotState,
}

impl PageSlot {
    /// Creates an empty, pending slot for the given page number
    pub fn new(index: u32) -> Self {
        Self {
            index,
            records: Vec::new(),
            state: SlotState::Pending,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Returns true if the slot reached aggregation with no usable content
    pub fn is_degraded(&self) -> bool {
        self.state.is_degraded()
    }

    /// Records a failed retrieval
    pub fn mark_fetch_failed(&mut self) {
        self.state = SlotState::FetchFailed;
    }

    /// Attaches a complete extraction result
    pub fn mark_parsed(&mut self, records: Vec<Record>) {
        self.records = records;
        self.state = SlotState::Parsed;
    }

    /// Attaches whatever was recovered before extraction failed
    ///
    /// A slot whose fetch already failed keeps `FetchFailed`, since that is
    /// the more specific cause.
    pub fn mark_parse_failed(&mut self, recovered: Vec<Record>) {
        self.records = recovered;
        if self.state != SlotState::FetchFailed {
            self.state = SlotState::ParseFailed;
        }
    }
}
