//! Browser automation capability used by the session bootstrap
//!
//! The bootstrap never talks to a browser directly. It drives an implementation
//! of [`ChallengeSolver`], one per automation backend, and only keeps the
//! credential and query template it hands back.

use crate::session::{Credential, SessionError};
use async_trait::async_trait;
use tokio::sync::oneshot;

/// An automated browser surface able to pass the site challenge
#[async_trait]
pub trait ChallengeSolver: Send {
    /// Navigates to the challenge page
    async fn open(&mut self, url: &str) -> Result<(), SessionError>;

    /// Current document title, `None` while the page has none
    async fn title(&mut self) -> Result<Option<String>, SessionError>;

    /// Starts watching outgoing traffic for the first request whose URL
    /// contains `url_fragment`
    ///
    /// The returned channel yields that request's body once it is observed.
    /// Must be called before the UI actions that trigger the request.
    async fn capture_request(
        &mut self,
        url_fragment: &str,
    ) -> Result<oneshot::Receiver<String>, SessionError>;

    /// Clicks the filter facet labelled `label`
    ///
    /// Returns `false` if no such facet exists on the page.
    async fn select_facet(&mut self, label: &str) -> Result<bool, SessionError>;

    /// Types `keyword` into the search box and submits it
    async fn submit_keyword(&mut self, keyword: &str) -> Result<(), SessionError>;

    /// Cookies of the current browsing context
    async fn credential(&mut self) -> Result<Credential, SessionError>;

    /// Tears the automation surface down
    async fn shutdown(&mut self) -> Result<(), SessionError>;
}

/// Creates a fresh [`ChallengeSolver`] for each bootstrap
#[async_trait]
pub trait SolverLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn ChallengeSolver>, SessionError>;
}

/// Launcher for builds without a browser backend; every launch fails
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackendLauncher;

#[async_trait]
impl SolverLauncher for NoBackendLauncher {
    async fn launch(&self) -> Result<Box<dyn ChallengeSolver>, SessionError> {
        Err(SessionError::NoBackend)
    }
}
