//! Output module for exports and reports
//!
//! This module handles:
//! - Exporting detail records as JSON and CSV
//! - Computing the category distribution and run statistics

mod csv;
mod json;
pub mod stats;

pub use self::csv::{csv_columns, export_details_csv, render_csv};
pub use self::json::{collect_export_records, export_details_json};
pub use stats::{
    category_distribution, load_statistics, log_category_distribution, print_statistics,
    RunStatistics, UNKNOWN_CATEGORY,
};
