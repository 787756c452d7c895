//! Run statistics and category distribution
//!
//! Figures are derived from the links file and the progress state, never
//! from counters kept during the run, so they are identical after a resume.

use crate::state::{LinkRecord, ProgressState};
use std::collections::{HashMap, HashSet};

/// Label used for records without a category
pub const UNKNOWN_CATEGORY: &str = "未知";

/// Harvest and detail progress summary
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    /// Links in the harvested list
    pub total_links: usize,

    /// Links with a merged detail record
    pub completed: usize,

    /// Links whose last attempt failed
    pub failed: usize,

    /// Links not attempted yet
    pub pending: usize,

    /// Detail records per category, largest first
    pub categories: Vec<(String, usize)>,
}

/// Counts occurrences of each category, largest first, ties by name
///
/// Empty categories are counted under [`UNKNOWN_CATEGORY`].
pub fn category_distribution<'a, I>(categories: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for category in categories {
        let category = category.trim();
        let key = if category.is_empty() {
            UNKNOWN_CATEGORY
        } else {
            category
        };
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(category, count)| (category.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

/// Builds statistics for `links` against the current progress
pub fn load_statistics(links: &[LinkRecord], state: &ProgressState) -> RunStatistics {
    let done: HashSet<&str> = state.completed.iter().map(String::as_str).collect();
    let mut completed = 0;
    let mut failed = 0;
    for link in links {
        if done.contains(link.id.as_str()) {
            completed += 1;
        } else if state.failed.contains_key(&link.id) {
            failed += 1;
        }
    }

    RunStatistics {
        total_links: links.len(),
        completed,
        failed,
        pending: links.len() - completed - failed,
        categories: category_distribution(
            state.details.iter().map(|detail| detail.category.as_str()),
        ),
    }
}

/// Logs a category distribution, one line per category
pub fn log_category_distribution(heading: &str, categories: &[(String, usize)]) {
    tracing::info!("{} ({} categories)", heading, categories.len());
    for (category, count) in categories {
        tracing::info!("  {}: {}", category, count);
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Links harvested: {}", stats.total_links);
    println!("  Details completed: {}", stats.completed);
    println!("  Details failed: {}", stats.failed);
    println!("  Details pending: {}", stats.pending);
    println!();

    if !stats.categories.is_empty() {
        println!("Categories:");
        for (category, count) in &stats.categories {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    let success_rate = if stats.total_links > 0 {
        (stats.completed as f64 / stats.total_links as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} records fetched)",
        success_rate, stats.completed, stats.total_links
    );
}
