//! Session bootstrap
//!
//! Passes the site's browser challenge once through an automation backend,
//! captures the cookies and the search request body, and validates a stored
//! session before reuse.

mod bootstrap;
#[cfg(feature = "chromium")]
mod chromium;
mod credential;
mod solver;

pub use bootstrap::{acquire_session, validate_session, BootstrapOutcome};
#[cfg(feature = "chromium")]
pub use chromium::ChromiumLauncher;
pub use credential::{Credential, QueryTemplate, SessionSnapshot};
pub use solver::{ChallengeSolver, NoBackendLauncher, SolverLauncher};

use thiserror::Error;

/// Errors raised while obtaining a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Challenge not passed after {attempts} title checks")]
    ChallengeTimeout { attempts: u32 },

    #[error("Failed to capture search request: {0}")]
    TemplateCaptureFailed(String),

    #[error("Browser automation failed: {0}")]
    Browser(String),

    #[error("No browser backend compiled in, rebuild with the `chromium` feature")]
    NoBackend,
}
