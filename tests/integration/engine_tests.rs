//! Fetch engine properties: idempotence, crash resume, failure accounting

use crate::common::{detail_page, links};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tender_harvest::crawler::{Coordinator, DetailSource, FetchError};
use tender_harvest::state::{pending_items, ProgressState};
use tender_harvest::storage::ProgressStore;

const BASE: &str = "https://www.example.com";

/// Always succeeds, with a per-URL delay so completion order varies
struct JitterSource;

#[async_trait]
impl DetailSource for JitterSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let jitter = url.bytes().map(u64::from).sum::<u64>() % 7;
        tokio::time::sleep(Duration::from_millis(jitter)).await;
        Ok(detail_page(url))
    }
}

/// Succeeds for the first `limit` calls, then never answers
struct StallingSource {
    calls: AtomicUsize,
    limit: usize,
}

#[async_trait]
impl DetailSource for StallingSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.limit {
            std::future::pending::<()>().await;
        }
        Ok(detail_page(url))
    }
}

/// Fails every URL containing `needle`
struct FailingSource {
    needle: &'static str,
}

#[async_trait]
impl DetailSource for FailingSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if url.contains(self.needle) {
            Err(FetchError::HttpStatus {
                status: 500,
                attempts: 3,
            })
        } else {
            Ok(detail_page(url))
        }
    }
}

/// Every page lists the same value under the detail link label
struct SharedLinkLabelSource;

#[async_trait]
impl DetailSource for SharedLinkLabelSource {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        Ok("<table><tr><td>详情链接：</td><td>见附件</td></tr></table>".to_string())
    }
}

fn store(dir: &TempDir) -> ProgressStore {
    ProgressStore::new(dir.path().join("progress.json"))
}

#[tokio::test]
async fn test_idempotent_across_concurrency_levels() {
    let links = links(BASE, 30);
    let mut outcomes = Vec::new();

    for concurrency in [1, 4, 16] {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let pending = pending_items(&links, &ProgressState::default());
        let engine = Coordinator::new(Arc::new(JitterSource), store.clone(), concurrency, 7);

        let first = engine
            .run(pending.clone(), ProgressState::default())
            .await
            .unwrap();
        let second = engine.run(pending, first.state.clone()).await.unwrap();

        assert_eq!(first.state.details, second.state.details);
        assert_eq!(second.state.completed.len(), 30);
        assert_eq!(store.load().details, second.state.details);
        outcomes.push(second.state.details);
    }

    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[1], outcomes[2]);

    let sequences: Vec<usize> = outcomes[0].iter().map(|d| d.sequence).collect();
    assert_eq!(sequences, (1..=30).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_resume_after_crash_between_checkpoints() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let links = links(BASE, 20);

    // One worker, checkpoint every 5: items 0..12 succeed, item 12 hangs.
    // The last checkpoint before the hang covers items 0..10.
    let stalling = Arc::new(StallingSource {
        calls: AtomicUsize::new(0),
        limit: 12,
    });
    let engine = Coordinator::new(stalling, store.clone(), 1, 5);
    let pending = pending_items(&links, &ProgressState::default());
    let crashed =
        tokio::time::timeout(Duration::from_millis(300), engine.run(pending, ProgressState::default()))
            .await;
    assert!(crashed.is_err(), "engine should still be waiting on the stalled fetch");

    let persisted = store.load();
    assert_eq!(persisted.completed.len(), 10);

    let resumed_pending = pending_items(&links, &persisted);
    let resumed_ids: Vec<&str> = resumed_pending.iter().map(|i| i.link.id.as_str()).collect();
    let expected: Vec<String> = (10..20).map(|i| format!("id-{}", i)).collect();
    assert_eq!(resumed_ids, expected.iter().map(String::as_str).collect::<Vec<_>>());

    let engine = Coordinator::new(Arc::new(JitterSource), store.clone(), 4, 5);
    let report = engine.run(resumed_pending, persisted).await.unwrap();
    assert_eq!(report.processed, 10);

    let final_state = store.load();
    assert_eq!(final_state.completed.len(), 20);
    assert_eq!(final_state.details.len(), 20);
    let unique: HashSet<&str> = final_state
        .details
        .iter()
        .map(|d| d.detail_url.as_str())
        .collect();
    assert_eq!(unique.len(), 20);
}

#[tokio::test]
async fn test_failure_accounting() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let links = links(BASE, 2);
    let (a, b) = (&links[0], &links[1]);

    let engine = Coordinator::new(Arc::new(FailingSource { needle: "/0.html" }), store.clone(), 2, 10);
    let report = engine
        .run(pending_items(&links, &ProgressState::default()), ProgressState::default())
        .await
        .unwrap();

    assert_eq!(report.error_count, 1);
    let state = store.load();
    assert!(state.failed.contains_key(&a.id));
    assert!(!state.completed.contains(&a.id));
    assert!(state.completed.contains(&b.id));
    assert!(!state.failed.contains_key(&b.id));
    assert_eq!(state.details.len(), 1);
    assert_eq!(state.details[0].detail_url, b.detail_url);
    assert_eq!(state.details[0].sequence, 2);

    // The failed item is pending again and clears its failure once it succeeds
    let pending = pending_items(&links, &state);
    assert_eq!(pending.len(), 1);
    let engine = Coordinator::new(Arc::new(JitterSource), store.clone(), 2, 10);
    engine.run(pending, state).await.unwrap();

    let state = store.load();
    assert!(state.failed.is_empty());
    assert_eq!(state.completed.len(), 2);
    assert_eq!(
        state.details.iter().map(|d| d.sequence).collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[tokio::test]
async fn test_corrupt_progress_file_restarts_from_scratch() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    std::fs::write(store.path(), r#"{"completed": ["id-0"], "details": [{"#).unwrap();

    let state = store.load();
    assert_eq!(state, ProgressState::default());

    let links = links(BASE, 3);
    let engine = Coordinator::new(Arc::new(JitterSource), store.clone(), 2, 1);
    let report = engine.run(pending_items(&links, &state), state).await.unwrap();
    assert_eq!(report.processed, 3);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw["completed"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_parsed_fields_are_merged() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let links = links(BASE, 1);

    let engine = Coordinator::new(Arc::new(JitterSource), store, 1, 1);
    let report = engine
        .run(pending_items(&links, &ProgressState::default()), ProgressState::default())
        .await
        .unwrap();

    let detail = &report.state.details[0];
    assert_eq!(detail.sequence, 1);
    assert_eq!(detail.title, "项目0");
    assert_eq!(detail.fields.get("采购人").map(String::as_str), Some("重庆某单位"));
    assert_eq!(detail.fields.get("成交金额").map(String::as_str), Some("100万元"));
    assert_eq!(detail.fields.get("信息时间").map(String::as_str), Some("2026-03-01"));
    assert_eq!(
        detail.fields.get("项目编号").map(String::as_str),
        Some(links[0].detail_url.as_str())
    );
}

#[tokio::test]
async fn test_page_supplied_link_value_does_not_collapse_details() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let links = links(BASE, 3);

    let engine = Coordinator::new(Arc::new(SharedLinkLabelSource), store.clone(), 1, 1);
    engine
        .run(pending_items(&links, &ProgressState::default()), ProgressState::default())
        .await
        .unwrap();

    let state = store.load();
    assert_eq!(state.completed.len(), 3);
    assert_eq!(state.details.len(), state.completed.len());
    let urls: Vec<&str> = state.details.iter().map(|d| d.detail_url.as_str()).collect();
    let expected: Vec<&str> = links.iter().map(|l| l.detail_url.as_str()).collect();
    assert_eq!(urls, expected);
}
