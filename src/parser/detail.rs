//! Detail page field extraction
//!
//! Extraction runs in a fixed order and a key, once set, is never overwritten:
//!
//! 1. page heading
//! 2. project code, label stripped
//! 3. information date following the `【信息时间` label
//! 4. two-column and even-column table rows
//! 5. numbered `一、label：value` lines inside the main content
//! 6. main content text, truncated, under [`FIELD_FULL_TEXT`]

use crate::state::FIELD_FULL_TEXT;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const FIELD_PAGE_TITLE: &str = "页面标题";
pub const FIELD_PROJECT_CODE: &str = "项目编号";
pub const FIELD_INFO_DATE: &str = "信息时间";

/// Longest key accepted from tables and numbered lines
pub const MAX_KEY_CHARS: usize = 30;

/// Longest value accepted from numbered lines
pub const MAX_LIST_VALUE_CHARS: usize = 500;

/// Length of the stored main-content text
pub const MAX_FULL_TEXT_CHARS: usize = 3000;

const TITLE_SELECTOR: &str = ".detail-title, .article-title, h2, h3";
const PROJECT_CODE_SELECTOR: &str = ".detail-code, .project-code";
const CONTENT_SELECTOR: &str = ".ewb-article-info, .article-content, .detail-content, .content-box";
const MAIN_FALLBACK_SELECTOR: &str = ".ewb-article, .article, .main-content, main";

fn project_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^项目编号[：:]\s*").expect("valid regex"))
}

fn info_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"【信息时间[：:]?\s*(\d{4}[-/]\d{2}[-/]\d{2})").expect("valid regex")
    })
}

fn numbered_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[一二三四五六七八九十\d]+[、.．]\s*([^：:]+)[：:]\s*([^\n]+)")
            .expect("valid regex")
    })
}

/// Extracted fields, first writer wins
#[derive(Default)]
struct Fields(BTreeMap<String, String>);

impl Fields {
    fn set_once(&mut self, key: &str, value: String) {
        if !self.0.contains_key(key) {
            self.0.insert(key.to_string(), value);
        }
    }
}

/// Text of all descendants with each text node trimmed and empty ones dropped
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn raw_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn first_match<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

fn table_key(cell: ElementRef<'_>) -> String {
    stripped_text(cell).replace(|c: char| c == '：' || c == ':', "")
}

fn key_fits(key: &str) -> bool {
    !key.is_empty() && key.chars().count() <= MAX_KEY_CHARS
}

/// Parses a detail page into a flat field mapping
///
/// The function is pure: the same markup always yields the same mapping.
///
/// # Example
///
/// ```
/// use tender_harvest::parser::parse_detail_body;
///
/// let fields = parse_detail_body("<table><tr><td>采购人：</td><td>X</td></tr></table>");
/// assert_eq!(fields.get("采购人").map(String::as_str), Some("X"));
/// ```
pub fn parse_detail_body(markup: &str) -> BTreeMap<String, String> {
    let document = Html::parse_document(markup);
    let mut fields = Fields::default();

    if let Some(heading) = first_match(&document, TITLE_SELECTOR) {
        fields.set_once(FIELD_PAGE_TITLE, stripped_text(heading));
    }

    if let Some(code) = first_match(&document, PROJECT_CODE_SELECTOR) {
        let text = stripped_text(code);
        fields.set_once(
            FIELD_PROJECT_CODE,
            project_label_re().replace(&text, "").into_owned(),
        );
    }

    let body_text = raw_text(document.root_element());
    if let Some(captures) = info_date_re().captures(&body_text) {
        fields.set_once(FIELD_INFO_DATE, captures[1].to_string());
    }

    extract_table_pairs(&document, &mut fields);

    let content = first_match(&document, CONTENT_SELECTOR);
    if let Some(content) = content {
        extract_numbered_pairs(&raw_text(content), &mut fields);
    }

    if let Some(main) = content.or_else(|| first_match(&document, MAIN_FALLBACK_SELECTOR)) {
        let text: String = stripped_text(main).chars().take(MAX_FULL_TEXT_CHARS).collect();
        fields.set_once(FIELD_FULL_TEXT, text);
    }

    fields.0
}

fn extract_table_pairs(document: &Html, fields: &mut Fields) {
    let (Ok(row_selector), Ok(cell_selector)) =
        (Selector::parse("table tr"), Selector::parse("td, th"))
    else {
        return;
    };

    for row in document.select(&row_selector) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_selector).collect();

        if cells.len() == 2 {
            let key = table_key(cells[0]);
            if key_fits(&key) {
                fields.set_once(&key, stripped_text(cells[1]));
            }
        } else if cells.len() >= 4 && cells.len() % 2 == 0 {
            for pair in cells.chunks(2) {
                let key = table_key(pair[0]);
                let value = stripped_text(pair[1]);
                if key_fits(&key) && !value.is_empty() {
                    fields.set_once(&key, value);
                }
            }
        }
    }
}

fn extract_numbered_pairs(text: &str, fields: &mut Fields) {
    for captures in numbered_pair_re().captures_iter(text) {
        let key = captures[1].trim();
        let value = captures[2].trim();
        if key_fits(key) && value.chars().count() <= MAX_LIST_VALUE_CHARS {
            fields.set_once(key, value.to_string());
        }
    }
}
