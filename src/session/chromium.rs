//! Chromium backend for the challenge solver

use crate::session::{ChallengeSolver, Credential, SessionError, SolverLauncher};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, GetRequestPostDataParams,
};
use chromiumoxide::page::Page;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const SEARCH_INPUT_SELECTOR: &str = "input#search, input.input-box";

fn browser_error(context: &str, e: impl std::fmt::Display) -> SessionError {
    SessionError::Browser(format!("{}: {}", context, e))
}

/// Launches a local Chromium per bootstrap
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    headless: bool,
    user_agent: String,
}

impl ChromiumLauncher {
    pub fn new(headless: bool, user_agent: impl Into<String>) -> Self {
        Self {
            headless,
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl SolverLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn ChallengeSolver>, SessionError> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .window_size(1280, 800);
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(|e| browser_error("invalid browser config", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_error("failed to launch chromium", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!(headless = self.headless, "Chromium launched");

        Ok(Box::new(ChromiumSolver {
            browser,
            handler,
            page: None,
            capture: None,
            user_agent: self.user_agent.clone(),
        }))
    }
}

struct ChromiumSolver {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    capture: Option<JoinHandle<()>>,
    user_agent: String,
}

impl ChromiumSolver {
    fn page(&self) -> Result<&Page, SessionError> {
        self.page
            .as_ref()
            .ok_or_else(|| SessionError::Browser("no page open".to_string()))
    }
}

#[async_trait]
impl ChallengeSolver for ChromiumSolver {
    async fn open(&mut self, url: &str) -> Result<(), SessionError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| browser_error("failed to open page", e))?;

        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(|e| browser_error("failed to set user agent", e))?;
        page.execute(EnableParams::default())
            .await
            .map_err(|e| browser_error("failed to enable network tracking", e))?;

        // The challenge page answers with an error status first, navigation
        // errors are expected while the script runs
        if let Err(e) = page.goto(url).await {
            tracing::debug!("Navigation reported: {}", e);
        }

        self.page = Some(page);
        Ok(())
    }

    async fn title(&mut self) -> Result<Option<String>, SessionError> {
        self.page()?
            .get_title()
            .await
            .map_err(|e| browser_error("failed to read title", e))
    }

    async fn capture_request(
        &mut self,
        url_fragment: &str,
    ) -> Result<oneshot::Receiver<String>, SessionError> {
        let page = self.page()?.clone();
        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| browser_error("failed to subscribe to requests", e))?;

        let (tx, rx) = oneshot::channel();
        let fragment = url_fragment.to_string();

        self.capture = Some(tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                if !event.request.url.contains(&fragment) {
                    continue;
                }

                match page
                    .execute(GetRequestPostDataParams::new(event.request_id.clone()))
                    .await
                {
                    Ok(data) => {
                        tracing::debug!("Captured search request to {}", event.request.url);
                        let _ = tx.send(data.result.post_data.clone());
                        return;
                    }
                    Err(e) => tracing::debug!("Request body unavailable: {}", e),
                }
            }
        }));

        Ok(rx)
    }

    async fn select_facet(&mut self, label: &str) -> Result<bool, SessionError> {
        let label = serde_json::to_string(label).map_err(|e| browser_error("bad label", e))?;
        let script = format!(
            r#"(() => {{
                const label = {label};
                const links = Array.from(document.querySelectorAll('a.label-item'))
                    .concat(Array.from(document.querySelectorAll('a')));
                const link = links.find(a => a.textContent.trim() === label)
                    || links.find(a => a.textContent.includes(label));
                if (!link) return false;
                if (!link.classList.contains('active')) link.click();
                return true;
            }})()"#
        );

        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| browser_error("facet script failed", e))?
            .into_value::<bool>()
            .map_err(|e| browser_error("unexpected facet script result", e))
    }

    async fn submit_keyword(&mut self, keyword: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        let element = page
            .find_element(SEARCH_INPUT_SELECTOR)
            .await
            .map_err(|e| browser_error("search box not found", e))?;

        element
            .click()
            .await
            .map_err(|e| browser_error("failed to focus search box", e))?;
        page.evaluate(format!(
            "document.querySelector({}).value = ''",
            serde_json::to_string(SEARCH_INPUT_SELECTOR).unwrap_or_default()
        ))
        .await
        .map_err(|e| browser_error("failed to clear search box", e))?;

        element
            .type_str(keyword)
            .await
            .map_err(|e| browser_error("failed to type keyword", e))?
            .press_key("Enter")
            .await
            .map_err(|e| browser_error("failed to submit search", e))?;

        Ok(())
    }

    async fn credential(&mut self) -> Result<Credential, SessionError> {
        let cookies = self
            .page()?
            .get_cookies()
            .await
            .map_err(|e| browser_error("failed to read cookies", e))?;

        Ok(cookies
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect())
    }

    async fn shutdown(&mut self) -> Result<(), SessionError> {
        if let Some(capture) = self.capture.take() {
            capture.abort();
        }
        self.page = None;

        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| browser_error("failed to close browser", e));
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Browser process wait failed: {}", e);
        }
        self.handler.abort();

        closed.map(|_| ())
    }
}
