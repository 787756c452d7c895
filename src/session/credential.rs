//! Credential, captured query template and their on-disk snapshot

use crate::storage::{read_json, write_json_atomic, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Token set obtained after passing the browser challenge
///
/// There is no known expiry; validity is only ever learned from the server,
/// either through [`validate_session`](crate::session::validate_session) or a
/// challenge status during use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential {
    tokens: BTreeMap<String, String>,
}

impl Credential {
    pub fn new(tokens: BTreeMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }

    /// Renders the tokens as a `Cookie` request header value
    pub fn cookie_header(&self) -> String {
        self.tokens
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl FromIterator<(String, String)> for Credential {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

/// Captured search request body, replayed page by page
///
/// Only the pagination fields `pn` and `rn` ever change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryTemplate {
    body: Map<String, Value>,
}

impl QueryTemplate {
    pub const CURSOR_FIELD: &'static str = "pn";
    pub const PAGE_SIZE_FIELD: &'static str = "rn";

    pub fn new(body: Map<String, Value>) -> Self {
        Self { body }
    }

    /// Parses an intercepted request body; only JSON objects are templates
    pub fn from_request_body(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(raw).ok()? {
            Value::Object(body) => Some(Self { body }),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Request body for the zero-based page `cursor`
    pub fn page_body(&self, cursor: u32, page_size: u32) -> Value {
        let mut body = self.body.clone();
        body.insert(Self::CURSOR_FIELD.to_string(), Value::from(cursor));
        body.insert(Self::PAGE_SIZE_FIELD.to_string(), Value::from(page_size));
        Value::Object(body)
    }
}

/// Everything a bootstrap produced, persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub cookies: Credential,

    #[serde(default)]
    pub template: Option<QueryTemplate>,

    pub obtained_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn new(cookies: Credential, template: Option<QueryTemplate>) -> Self {
        Self {
            cookies,
            template,
            obtained_at: Utc::now(),
        }
    }

    /// Loads the snapshot; a missing or unreadable file means no session
    pub fn load(path: &Path) -> Option<Self> {
        match read_json::<Self>(path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Ignoring unusable session file {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> StorageResult<()> {
        write_json_atomic(path, self)
    }
}
