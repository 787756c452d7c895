//! Shared work queue drained by the fetch workers

use crate::state::PendingItem;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// FIFO queue of pending items shared by every worker
///
/// Popping never waits: an empty queue means the worker is done.
#[derive(Debug, Clone, Default)]
pub struct WorkQueue {
    items: Arc<Mutex<VecDeque<PendingItem>>>,
}

impl WorkQueue {
    /// Seeds the queue in harvest order
    pub fn new(items: Vec<PendingItem>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items.into())),
        }
    }

    /// Takes the next item, `None` once drained
    pub fn pop(&self) -> Option<PendingItem> {
        match self.items.lock() {
            Ok(mut items) => items.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }

    pub fn len(&self) -> usize {
        match self.items.lock() {
            Ok(items) => items.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
