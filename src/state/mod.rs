//! State module for tracking pages through the pipeline
//!
//! # Components
//!
//! - `PageSlot`: ordered placeholder for one page's extracted content
//! - `SlotState`: how far a page got (pending, parsed, fetch/parse failed)
//! - `Record`: one extracted title/body/timestamp unit

mod page_slot;

// Re-export main types
pub use page_slot::{PageSlot, Record, SlotState};
