//! Run orchestration
//!
//! # Stages
//!
//! 1. **Links**: reuse or bootstrap a session, replay the search, write the links file
//! 2. **Details**: fetch every pending link, renewing the session a bounded
//!    number of times when the credential gets rejected
//! 3. **Export**: write JSON and CSV exports and report the category distribution
//!
//! Only session bootstrap failures before any fetching abort a run. Later
//! failures are recorded in the progress file and retried on the next run.

use crate::config::Config;
use crate::crawler::{Coordinator, EngineReport, HttpDetailSource};
use crate::harvest::{build_http_client, Harvester};
use crate::output::{
    category_distribution, collect_export_records, export_details_csv, export_details_json,
    load_statistics, log_category_distribution, RunStatistics,
};
use crate::session::{
    acquire_session, validate_session, SessionError, SessionSnapshot, SolverLauncher,
};
use crate::state::{pending_items, LinkRecord, PendingItem, ProgressState};
use crate::storage::{load_links, save_links, ProgressStore};
use crate::{HarvestError, Result};
use reqwest::Client;
use std::sync::Arc;

/// Which stages a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    All,
    LinksOnly,
    DetailsOnly,
    ExportOnly,
}

/// Drives the stages with one configuration, HTTP client and browser launcher
pub struct Pipeline {
    config: Config,
    client: Client,
    launcher: Box<dyn SolverLauncher>,
}

impl Pipeline {
    pub fn new(config: Config, launcher: Box<dyn SolverLauncher>) -> Result<Self> {
        let client = build_http_client(&config.site, config.crawler.request_timeout())?;
        Ok(Self {
            config,
            client,
            launcher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn progress_store(&self) -> ProgressStore {
        ProgressStore::new(self.config.output.progress_path())
    }

    /// Runs `stage`; `fresh` discards the progress file before fetching details
    pub async fn run(&self, stage: Stage, fresh: bool) -> Result<()> {
        match stage {
            Stage::LinksOnly => {
                self.links_stage().await?;
            }
            Stage::DetailsOnly => {
                self.details_stage(fresh).await?;
            }
            Stage::ExportOnly => {
                self.export_stage()?;
            }
            Stage::All => {
                self.links_stage().await?;
                self.details_stage(fresh).await?;
                self.export_stage()?;
            }
        }
        Ok(())
    }

    /// Returns a usable session, reusing the stored one when the site accepts it
    ///
    /// `need_template` requires the session to carry a captured query.
    pub async fn obtain_session(&self, need_template: bool) -> Result<SessionSnapshot> {
        let path = self.config.output.session_path();

        if let Some(snapshot) = SessionSnapshot::load(&path) {
            let usable = !need_template || snapshot.template.is_some();
            if usable && validate_session(&self.client, &self.config.site, &snapshot.cookies).await {
                tracing::info!(
                    "Reusing session obtained at {}",
                    snapshot.obtained_at.format("%Y-%m-%d %H:%M:%S")
                );
                return Ok(snapshot);
            }
            tracing::info!("Stored session is no longer usable");
        }

        self.bootstrap().await
    }

    /// Passes the challenge in a fresh browser and stores the new session
    pub async fn bootstrap(&self) -> Result<SessionSnapshot> {
        let mut solver = self.launcher.launch().await?;
        let outcome = acquire_session(
            solver.as_mut(),
            &self.config.site,
            &self.config.filter,
            &self.config.bootstrap,
        )
        .await?;

        let snapshot = SessionSnapshot::new(outcome.credential, Some(outcome.template));
        let path = self.config.output.session_path();
        if let Err(e) = snapshot.save(&path) {
            tracing::warn!("Failed to store session at {}: {}", path.display(), e);
        }
        Ok(snapshot)
    }

    /// Harvests the links and writes the links file
    ///
    /// An empty harvest leaves an existing links file untouched.
    pub async fn links_stage(&self) -> Result<Vec<LinkRecord>> {
        let mut session = self.obtain_session(true).await?;
        let harvester = Harvester::new(
            self.client.clone(),
            self.config.site.clone(),
            self.config.filter.page_size,
            self.config.harvest.clone(),
        );

        let mut renewals = 0;
        let report = loop {
            let template = session.template.clone().ok_or_else(|| {
                SessionError::TemplateCaptureFailed("session carries no query template".to_string())
            })?;
            let report = harvester.harvest(&template, &session.cookies).await;

            if !report.credential_invalidated
                || renewals >= self.config.crawler.max_session_renewals
            {
                break report;
            }
            renewals += 1;
            tracing::warn!(
                "Credential rejected during harvest, renewing session ({}/{})",
                renewals,
                self.config.crawler.max_session_renewals
            );
            session = self.bootstrap().await?;
        };

        if !report.skipped_pages.is_empty() {
            tracing::warn!(
                "{} pages skipped: {:?}",
                report.skipped_pages.len(),
                report
                    .skipped_pages
                    .iter()
                    .map(|page| page.cursor)
                    .collect::<Vec<_>>()
            );
        }

        if report.links.is_empty() {
            tracing::warn!("No links harvested, keeping any existing links file");
            return Ok(report.links);
        }

        let path = self.config.output.links_path();
        save_links(&path, &report.links)?;
        tracing::info!(
            "Saved {} links (server reported {}) to {}",
            report.links.len(),
            report.total,
            path.display()
        );
        log_category_distribution("Harvested categories", &report.categories());

        Ok(report.links)
    }

    fn load_links_file(&self) -> Result<Vec<LinkRecord>> {
        let path = self.config.output.links_path();
        load_links(&path)?.ok_or_else(|| HarvestError::MissingLinks {
            path: path.display().to_string(),
        })
    }

    /// Fetches every pending detail page
    pub async fn details_stage(&self, fresh: bool) -> Result<ProgressState> {
        let links = self.load_links_file()?;
        let store = self.progress_store();
        if fresh {
            tracing::info!("Discarding previous progress");
            store.clear()?;
        }

        let mut state = store.load();
        let mut pending = pending_items(&links, &state);
        tracing::info!(
            "{} links, {} completed, {} pending",
            links.len(),
            state.completed.len(),
            pending.len()
        );
        if pending.is_empty() {
            tracing::info!("All details already fetched");
            return Ok(state);
        }

        let mut session = self.obtain_session(false).await?;
        let mut renewals = 0;

        loop {
            let report = self.run_engine(&store, &session, pending, state).await?;
            state = report.state;

            if report.credential_invalid == 0 {
                break;
            }
            if renewals >= self.config.crawler.max_session_renewals {
                tracing::warn!(
                    "{} items rejected for credential, rerun to retry them",
                    report.credential_invalid
                );
                break;
            }

            renewals += 1;
            tracing::warn!(
                "{} credential rejections, renewing session ({}/{})",
                report.credential_invalid,
                renewals,
                self.config.crawler.max_session_renewals
            );
            session = match self.bootstrap().await {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!("Session renewal failed, progress is saved: {}", e);
                    break;
                }
            };

            pending = pending_items(&links, &state);
            if pending.is_empty() {
                break;
            }
        }

        Ok(state)
    }

    async fn run_engine(
        &self,
        store: &ProgressStore,
        session: &SessionSnapshot,
        pending: Vec<PendingItem>,
        state: ProgressState,
    ) -> Result<EngineReport> {
        let crawler = &self.config.crawler;
        let source = HttpDetailSource::new(
            self.client.clone(),
            &session.cookies,
            self.config.site.challenge_status,
            crawler.max_retries,
            crawler.retry_delay(),
        );
        let engine = Coordinator::new(
            Arc::new(source),
            store.clone(),
            crawler.max_concurrent as usize,
            crawler.checkpoint_interval as usize,
        );

        let report = engine.run(pending, state).await?;
        tracing::info!(
            "Detail run finished: {} processed, {} errors",
            report.processed,
            report.error_count
        );
        Ok(report)
    }

    /// Writes the JSON and CSV exports, returning the number of records
    pub fn export_stage(&self) -> Result<usize> {
        let links = match load_links(&self.config.output.links_path()) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!("Links file unreadable, exporting fetched details only: {}", e);
                None
            }
        };
        let state = self.progress_store().load();
        let records = collect_export_records(links.as_deref(), &state);

        export_details_json(&self.config.output.details_json_path(), &records)?;
        export_details_csv(&self.config.output.details_csv_path(), &records)?;

        let distribution = category_distribution(records.iter().map(|r| r.category.as_str()));
        log_category_distribution("Exported categories", &distribution);

        Ok(records.len())
    }

    /// Current statistics from the links and progress files
    pub fn statistics(&self) -> Result<RunStatistics> {
        let links = self.load_links_file()?;
        Ok(load_statistics(&links, &self.progress_store().load()))
    }
}
