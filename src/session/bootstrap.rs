//! Session bootstrap and validation
//!
//! # Bootstrap Flow
//!
//! 1. Open the challenge page and poll the title until a success marker shows
//! 2. Start watching traffic for the search request
//! 3. Click the configured facets and submit the keyword
//! 4. Wait (bounded) for the watched request and keep its body as template
//! 5. Read the cookies and shut the browser down
//!
//! The browser is always shut down before returning, whatever the outcome.

use crate::config::{BootstrapConfig, FilterConfig, SiteConfig};
use crate::session::{ChallengeSolver, Credential, QueryTemplate, SessionError};
use reqwest::header::COOKIE;
use reqwest::Client;

/// Credential and template obtained by one bootstrap
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapOutcome {
    pub credential: Credential,
    pub template: QueryTemplate,
}

/// Drives `solver` through the challenge and captures a session
///
/// # Errors
///
/// * `SessionError::ChallengeTimeout` - no success marker within the poll budget
/// * `SessionError::TemplateCaptureFailed` - the search request was not observed in time
/// * `SessionError::Browser` - the automation surface failed
pub async fn acquire_session(
    solver: &mut dyn ChallengeSolver,
    site: &SiteConfig,
    filter: &FilterConfig,
    bootstrap: &BootstrapConfig,
) -> Result<BootstrapOutcome, SessionError> {
    let result = drive_bootstrap(solver, site, filter, bootstrap).await;

    if let Err(e) = solver.shutdown().await {
        tracing::warn!("Failed to shut down challenge solver: {}", e);
    }

    result
}

async fn drive_bootstrap(
    solver: &mut dyn ChallengeSolver,
    site: &SiteConfig,
    filter: &FilterConfig,
    bootstrap: &BootstrapConfig,
) -> Result<BootstrapOutcome, SessionError> {
    tracing::info!("Passing browser challenge at {}", site.page_url);
    solver.open(&site.page_url).await?;
    wait_for_challenge(solver, site, bootstrap).await?;

    // Watch before acting, the very first query is the one we want
    let captured = solver.capture_request(&site.api_url).await?;

    for facet in filter.facets() {
        match solver.select_facet(facet).await {
            Ok(true) => {
                tracing::info!("Selected facet: {}", facet);
                tokio::time::sleep(bootstrap.action_delay()).await;
            }
            Ok(false) => tracing::warn!("Facet not found on page: {}", facet),
            Err(e) => tracing::warn!("Failed to select facet {}: {}", facet, e),
        }
    }

    match solver.submit_keyword(&filter.keyword).await {
        Ok(()) => tracing::info!("Submitted keyword: {:?}", filter.keyword),
        Err(e) => tracing::warn!("Search box unavailable: {}", e),
    }

    let body = match tokio::time::timeout(bootstrap.capture_timeout(), captured).await {
        Ok(Ok(body)) => body,
        Ok(Err(_)) => {
            return Err(SessionError::TemplateCaptureFailed(
                "request watcher stopped before a search request was seen".to_string(),
            ))
        }
        Err(_) => {
            return Err(SessionError::TemplateCaptureFailed(format!(
                "no request to {} within {:?}",
                site.api_url,
                bootstrap.capture_timeout()
            )))
        }
    };

    let template = QueryTemplate::from_request_body(&body).ok_or_else(|| {
        SessionError::TemplateCaptureFailed("captured request body is not a JSON object".to_string())
    })?;

    let credential = solver.credential().await?;
    tracing::info!(
        "Session acquired: {} cookies, template with {} fields",
        credential.len(),
        template.page_body(0, filter.page_size).as_object().map_or(0, |b| b.len())
    );

    Ok(BootstrapOutcome {
        credential,
        template,
    })
}

async fn wait_for_challenge(
    solver: &mut dyn ChallengeSolver,
    site: &SiteConfig,
    bootstrap: &BootstrapConfig,
) -> Result<(), SessionError> {
    for attempt in 1..=bootstrap.poll_attempts {
        tokio::time::sleep(bootstrap.poll_interval()).await;

        match solver.title().await {
            Ok(Some(title)) if has_marker(&title, &site.success_markers) => {
                tracing::info!(attempt, "Challenge passed: {}", title);
                return Ok(());
            }
            Ok(title) => tracing::debug!(attempt, ?title, "Challenge still pending"),
            Err(e) => tracing::debug!(attempt, "Title unavailable: {}", e),
        }
    }

    Err(SessionError::ChallengeTimeout {
        attempts: bootstrap.poll_attempts,
    })
}

fn has_marker(text: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
}

/// Checks a credential with one lightweight authenticated GET
///
/// The credential is valid when the page answers with a success status that
/// is not the challenge status and its body carries a success marker. Any
/// failure reads as invalid; callers rebootstrap instead of retrying.
pub async fn validate_session(client: &Client, site: &SiteConfig, credential: &Credential) -> bool {
    if credential.is_empty() {
        return false;
    }

    let response = match client
        .get(&site.page_url)
        .header(COOKIE, credential.cookie_header())
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Session probe failed: {}", e);
            return false;
        }
    };

    let status = response.status();
    if status.as_u16() == site.challenge_status || !status.is_success() {
        tracing::info!("Session probe rejected with HTTP {}", status.as_u16());
        return false;
    }

    match response.text().await {
        Ok(body) => {
            let valid = has_marker(&body, &site.success_markers);
            if !valid {
                tracing::info!("Session probe page lacks success marker");
            }
            valid
        }
        Err(e) => {
            tracing::warn!("Failed to read session probe body: {}", e);
            false
        }
    }
}
