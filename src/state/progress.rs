//! Fetch progress tracking
//!
//! [`ProgressState`] is the persisted checkpoint. [`ProgressLedger`] wraps it
//! with the in-memory indexes the engine needs while merging results; it is
//! the single point of mutation and is always used behind one lock.

use crate::state::records::{DetailRecord, LinkRecord, PendingItem};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Durable checkpoint of the detail fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Completed record ids, in completion order, without duplicates
    #[serde(default)]
    pub completed: Vec<String>,

    /// Last error per record id that is not completed
    #[serde(default)]
    pub failed: BTreeMap<String, String>,

    /// Merged detail records, in sequence order once normalized
    #[serde(default)]
    pub details: Vec<DetailRecord>,
}

impl ProgressState {
    /// Restores the checkpoint invariants
    ///
    /// - `completed` keeps the first occurrence of every id
    /// - completed ids are dropped from `failed`
    /// - one detail per URL, the last written one wins
    /// - details are ordered by sequence number
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.completed.retain(|id| seen.insert(id.clone()));

        self.failed.retain(|id, _| !seen.contains(id));

        let mut urls = HashSet::new();
        let mut deduped: Vec<DetailRecord> = self
            .details
            .drain(..)
            .rev()
            .filter(|d| urls.insert(d.detail_url.clone()))
            .collect();
        deduped.reverse();
        deduped.sort_by_key(|d| d.sequence);
        self.details = deduped;
    }
}

/// Computes the pending set: every harvested link whose id is not completed
///
/// Positions refer to the link list, so sequence numbers stay stable however
/// many runs it takes to finish.
pub fn pending_items(links: &[LinkRecord], state: &ProgressState) -> Vec<PendingItem> {
    let completed: HashSet<&str> = state.completed.iter().map(String::as_str).collect();

    links
        .iter()
        .enumerate()
        .filter(|(_, link)| !completed.contains(link.id.as_str()))
        .map(|(position, link)| PendingItem {
            position,
            link: link.clone(),
        })
        .collect()
}

/// Progress state plus the lookup indexes used while merging
#[derive(Debug)]
pub struct ProgressLedger {
    state: ProgressState,
    completed: HashSet<String>,
    detail_index: HashMap<String, usize>,
}

impl ProgressLedger {
    /// Creates a ledger from a loaded checkpoint
    pub fn new(mut state: ProgressState) -> Self {
        state.normalize();
        let completed = state.completed.iter().cloned().collect();
        let mut ledger = Self {
            state,
            completed,
            detail_index: HashMap::new(),
        };
        ledger.rebuild_index();
        ledger
    }

    fn rebuild_index(&mut self) {
        self.detail_index = self
            .state
            .details
            .iter()
            .enumerate()
            .map(|(i, d)| (d.detail_url.clone(), i))
            .collect();
    }

    /// Returns true if the id has been fetched successfully
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    /// Merges the outcome of one item
    ///
    /// # Returns
    ///
    /// `true` if the outcome was an error
    pub fn apply(
        &mut self,
        item: &PendingItem,
        outcome: Result<BTreeMap<String, String>, String>,
    ) -> bool {
        match outcome {
            Ok(fields) => {
                self.record_success(item, fields);
                false
            }
            Err(error) => {
                self.record_failure(&item.link, error);
                true
            }
        }
    }

    /// Records a failed fetch; the id stays pending for the next run
    pub fn record_failure(&mut self, link: &LinkRecord, error: String) {
        if self.completed.contains(&link.id) {
            // An earlier success is kept; failures only describe pending ids
            tracing::debug!(id = %link.id, "Ignoring failure for already completed record");
            return;
        }
        self.state.failed.insert(link.id.clone(), error);
    }

    /// Records a successful fetch, replacing any stale detail for the same URL
    pub fn record_success(&mut self, item: &PendingItem, fields: BTreeMap<String, String>) {
        let record = DetailRecord::merge(item.position, &item.link, fields);

        match self.detail_index.get(&item.link.detail_url) {
            Some(&index) => self.state.details[index] = record,
            None => {
                self.detail_index
                    .insert(item.link.detail_url.clone(), self.state.details.len());
                self.state.details.push(record);
            }
        }

        if self.completed.insert(item.link.id.clone()) {
            self.state.completed.push(item.link.id.clone());
        }
        self.state.failed.remove(&item.link.id);
    }

    /// Orders the details for persistence and returns the checkpoint
    pub fn snapshot(&mut self) -> &ProgressState {
        self.state.details.sort_by_key(|d| d.sequence);
        self.rebuild_index();
        &self.state
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}
