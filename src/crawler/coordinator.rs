//! Resumable concurrent fetch engine
//!
//! A fixed pool of workers drains one shared queue. Each worker fetches and
//! parses its item without holding any lock, then merges the outcome into the
//! progress ledger under a single mutex. Checkpoints are copied inside that
//! critical section and written afterwards on the blocking pool, one at a
//! time and never older than what is already on disk.

use crate::crawler::fetcher::{DetailSource, FetchError};
use crate::crawler::scheduler::WorkQueue;
use crate::parser::parse_detail_body;
use crate::state::{PendingItem, ProgressLedger, ProgressState, FIELD_FULL_TEXT};
use crate::storage::{ProgressStore, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;

/// Summary of one engine run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineReport {
    /// Items taken from the queue, successes and failures alike
    pub processed: usize,

    /// Items that ended in a failure
    pub error_count: usize,

    /// Failures caused by a rejected credential
    pub credential_invalid: usize,

    /// Checkpoint as persisted at the end of the run
    pub state: ProgressState,
}

struct EngineState {
    ledger: ProgressLedger,
    processed: usize,
    error_count: usize,
    credential_invalid: usize,
    generation: u64,
}

/// A consistent copy of the ledger taken under the lock, written outside it
struct Checkpoint {
    generation: u64,
    state: ProgressState,
    processed: usize,
    error_count: usize,
}

/// Everything the workers share
struct Shared {
    state: Mutex<EngineState>,
    store: ProgressStore,
    /// Generation of the newest checkpoint on disk; held for the whole write
    saved_generation: AsyncMutex<u64>,
    checkpoint_interval: usize,
    total: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Single point of mutation for the progress ledger
    ///
    /// Returns a checkpoint to persist every `checkpoint_interval` items.
    fn merge(
        &self,
        item: &PendingItem,
        outcome: Result<BTreeMap<String, String>, FetchError>,
    ) -> Option<Checkpoint> {
        let mut guard = self.lock();

        let outcome = match outcome {
            Ok(fields) => {
                log_success(item, &fields);
                Ok(fields)
            }
            Err(error) => {
                tracing::warn!(
                    id = %item.link.id,
                    title = %short_title(&item.link.title),
                    error = %error,
                    "Detail fetch failed"
                );
                if error.is_credential_invalid() {
                    guard.credential_invalid += 1;
                }
                Err(error.to_string())
            }
        };
        if guard.ledger.apply(item, outcome) {
            guard.error_count += 1;
        }

        guard.processed += 1;
        if guard.processed % self.checkpoint_interval == 0 {
            Some(Self::capture(&mut guard))
        } else {
            None
        }
    }

    fn capture(guard: &mut EngineState) -> Checkpoint {
        guard.generation += 1;
        Checkpoint {
            generation: guard.generation,
            state: guard.ledger.snapshot().clone(),
            processed: guard.processed,
            error_count: guard.error_count,
        }
    }

    /// Writes a checkpoint on the blocking pool; older generations are skipped
    async fn persist(&self, checkpoint: Checkpoint) -> StorageResult<()> {
        let mut saved = self.saved_generation.lock().await;
        if checkpoint.generation <= *saved {
            tracing::debug!(
                generation = checkpoint.generation,
                "Newer checkpoint already written, skipping"
            );
            return Ok(());
        }

        let store = self.store.clone();
        let state = checkpoint.state;
        let completed = state.completed.len();
        tokio::task::spawn_blocking(move || store.save(&state))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;
        *saved = checkpoint.generation;

        let percentage = if self.total > 0 {
            checkpoint.processed as f64 / self.total as f64 * 100.0
        } else {
            100.0
        };
        tracing::info!(
            "Checkpoint saved: {}/{} processed ({:.1}%), {} completed overall, {} errors",
            checkpoint.processed,
            self.total,
            percentage,
            completed,
            checkpoint.error_count
        );
        Ok(())
    }
}

fn short_title(title: &str) -> String {
    title.chars().take(40).collect()
}

fn log_success(item: &PendingItem, fields: &BTreeMap<String, String>) {
    let names: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|key| *key != FIELD_FULL_TEXT)
        .collect();
    tracing::info!(
        id = %item.link.id,
        "[{}] {} fields: {}",
        item.position + 1,
        names.len(),
        names.iter().take(5).copied().collect::<Vec<_>>().join(", ")
    );
}

/// Bounded-concurrency detail fetcher with periodic atomic checkpoints
pub struct Coordinator {
    source: Arc<dyn DetailSource>,
    store: ProgressStore,
    concurrency: usize,
    checkpoint_interval: usize,
}

impl Coordinator {
    /// Creates an engine with `concurrency` workers checkpointing every
    /// `checkpoint_interval` processed items
    pub fn new(
        source: Arc<dyn DetailSource>,
        store: ProgressStore,
        concurrency: usize,
        checkpoint_interval: usize,
    ) -> Self {
        Self {
            source,
            store,
            concurrency: concurrency.max(1),
            checkpoint_interval: checkpoint_interval.max(1),
        }
    }

    /// Fetches every pending item and merges the results into `state`
    ///
    /// Item failures never abort the run; they are counted and stored in the
    /// checkpoint. Only the final checkpoint write can fail the run.
    pub async fn run(
        &self,
        pending: Vec<PendingItem>,
        state: ProgressState,
    ) -> StorageResult<EngineReport> {
        let total = pending.len();
        let workers = self.concurrency.min(total).max(1);
        tracing::info!(
            "Fetching {} detail pages with {} workers (checkpoint every {})",
            total,
            workers,
            self.checkpoint_interval
        );

        let queue = WorkQueue::new(pending);
        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState {
                ledger: ProgressLedger::new(state),
                processed: 0,
                error_count: 0,
                credential_invalid: 0,
                generation: 0,
            }),
            store: self.store.clone(),
            saved_generation: AsyncMutex::new(0),
            checkpoint_interval: self.checkpoint_interval,
            total,
        });

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            let queue = queue.clone();
            let source = Arc::clone(&self.source);
            let shared = Arc::clone(&shared);
            set.spawn(async move {
                while let Some(item) = queue.pop() {
                    let outcome = source
                        .fetch(&item.link.detail_url)
                        .await
                        .map(|body| parse_detail_body(&body));
                    if let Some(checkpoint) = shared.merge(&item, outcome) {
                        if let Err(e) = shared.persist(checkpoint).await {
                            tracing::warn!("Checkpoint failed, will retry at the next one: {}", e);
                        }
                    }
                }
                tracing::debug!(worker_id, "Worker finished");
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Fetch worker aborted: {}", e);
            }
        }

        let (checkpoint, credential_invalid) = {
            let mut guard = shared.lock();
            (Shared::capture(&mut guard), guard.credential_invalid)
        };
        let report = EngineReport {
            processed: checkpoint.processed,
            error_count: checkpoint.error_count,
            credential_invalid,
            state: checkpoint.state.clone(),
        };
        shared.persist(checkpoint).await?;

        Ok(report)
    }
}
