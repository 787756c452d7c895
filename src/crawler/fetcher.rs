//! Detail page fetching
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Challenge status | Immediate → `CredentialInvalid` |
//! | Other non-success status | Retry with fixed delay → `HttpStatus` |
//! | Timeout / connection error | Retry with fixed delay → `TransientFetchError` |
//! | Any other request error | Immediate → `Request` |

use crate::session::Credential;
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Why a detail page could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Credential rejected (HTTP {status}), session must be renewed")]
    CredentialInvalid { status: u16 },

    #[error("Transient failure after {attempts} attempts: {message}")]
    TransientFetchError { attempts: u32, message: String },

    #[error("HTTP {status} after {attempts} attempts")]
    HttpStatus { status: u16, attempts: u32 },

    #[error("Request failed: {0}")]
    Request(String),
}

impl FetchError {
    pub fn is_credential_invalid(&self) -> bool {
        matches!(self, FetchError::CredentialInvalid { .. })
    }
}

/// Source of detail page bodies
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Fetches the body at `url`, retries included
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches detail pages over HTTP with the shared credential
#[derive(Debug, Clone)]
pub struct HttpDetailSource {
    client: Client,
    cookie_header: String,
    challenge_status: u16,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpDetailSource {
    pub fn new(
        client: Client,
        credential: &Credential,
        challenge_status: u16,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            cookie_header: credential.cookie_header(),
            challenge_status,
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    async fn attempt(&self, url: &str) -> Result<String, Attempt> {
        let response = self
            .client
            .get(url)
            .header(COOKIE, self.cookie_header.as_str())
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status().as_u16();
        if status == self.challenge_status {
            return Err(Attempt::Fatal(FetchError::CredentialInvalid { status }));
        }
        if !response.status().is_success() {
            return Err(Attempt::Status(status));
        }

        response.text().await.map_err(classify_request_error)
    }
}

/// Outcome of a single failed attempt
enum Attempt {
    Status(u16),
    Transient(String),
    Fatal(FetchError),
}

fn classify_request_error(e: reqwest::Error) -> Attempt {
    if e.is_timeout() || e.is_connect() {
        Attempt::Transient(e.to_string())
    } else {
        Attempt::Fatal(FetchError::Request(e.to_string()))
    }
}

#[async_trait]
impl DetailSource for HttpDetailSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;

        loop {
            let failure = match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(failure) => failure,
            };

            if attempt >= self.max_retries {
                return Err(match failure {
                    Attempt::Status(status) => FetchError::HttpStatus {
                        status,
                        attempts: attempt,
                    },
                    Attempt::Transient(message) => FetchError::TransientFetchError {
                        attempts: attempt,
                        message,
                    },
                    Attempt::Fatal(e) => e,
                });
            }

            tracing::debug!(url, attempt, "Detail fetch failed, retrying");
            tokio::time::sleep(self.retry_delay).await;
            attempt += 1;
        }
    }
}
