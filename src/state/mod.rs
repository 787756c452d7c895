//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `LinkRecord`: a listing entry produced by the link harvester
//! - `DetailRecord`: a link merged with the fields extracted from its detail page
//! - `ProgressState`: the persisted checkpoint of the detail fetch
//! - `ProgressLedger`: the single-writer view of the checkpoint used while fetching

mod progress;
mod records;

// Re-export main types
pub use progress::{pending_items, ProgressLedger, ProgressState};
pub use records::{
    DetailRecord, LinkRecord, PendingItem, BASE_COLUMNS, FIELD_CATEGORY, FIELD_DETAIL_URL,
    FIELD_ERROR, FIELD_FULL_TEXT, FIELD_PUBLISH_DATE, FIELD_RECORD_ID, FIELD_REGION,
    FIELD_SEQUENCE, FIELD_TITLE,
};
