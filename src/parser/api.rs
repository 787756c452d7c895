//! Search API response parsing and record cleaning

use crate::state::LinkRecord;
use serde_json::Value;
use thiserror::Error;

/// The search endpoint answered with a non-200 `code`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API error: code={code:?} msg={msg}")]
pub struct ApiCodeError {
    pub code: Option<i64>,
    pub msg: String,
}

/// Records and server-reported total of one search page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiPage {
    pub records: Vec<Value>,
    pub total: u64,
}

/// Parses a search API envelope
///
/// `content` may be a JSON object or a JSON document encoded as a string. An
/// undecodable `content` yields an empty page rather than an error, the same as
/// a page without results.
pub fn parse_api_response(envelope: &Value) -> Result<ApiPage, ApiCodeError> {
    let code = envelope.get("code").and_then(Value::as_i64);
    if code != Some(200) {
        return Err(ApiCodeError {
            code,
            msg: envelope
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    let content = match envelope.get("content") {
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Undecodable API content, treating page as empty: {}", e);
                return Ok(ApiPage::default());
            }
        },
        Some(value @ Value::Object(_)) => value.clone(),
        _ => return Ok(ApiPage::default()),
    };

    let Some(result) = content.get("result") else {
        return Ok(ApiPage::default());
    };

    let records = result
        .get("records")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(ApiPage {
        records,
        total: result.get("totalcount").map(parse_count).unwrap_or(0),
    })
}

/// Reads a count that may be a number or a numeric string
fn parse_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn text_field(record: &Value, name: &str) -> String {
    match record.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Resolves a detail path against the site base, keeping absolute links as-is
///
/// An empty path stays empty so records without a link are never pointed at
/// the site root.
pub fn resolve_detail_url(base_url: &str, link: &str) -> String {
    let link = link.trim();
    if link.is_empty() {
        return String::new();
    }
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }

    let base = base_url.trim_end_matches('/');
    if link.starts_with('/') {
        format!("{}{}", base, link)
    } else {
        format!("{}/{}", base, link)
    }
}

/// Normalizes one raw search record into a [`LinkRecord`]
///
/// Missing fields become empty strings; the title is trimmed.
pub fn clean_api_record(raw: &Value, base_url: &str) -> LinkRecord {
    LinkRecord {
        title: text_field(raw, "title").trim().to_string(),
        publish_date: text_field(raw, "pubinwebdate"),
        category: text_field(raw, "categorytype"),
        region: text_field(raw, "infoc"),
        id: text_field(raw, "newid"),
        detail_url: resolve_detail_url(base_url, &text_field(raw, "linkurl")),
    }
}
