//! Harvested link and merged detail records
//!
//! Both records serialize with the column names used by the exported files, so
//! the links file, the progress file and the final exports share one shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FIELD_SEQUENCE: &str = "序号";
pub const FIELD_TITLE: &str = "标题";
pub const FIELD_PUBLISH_DATE: &str = "发布日期";
pub const FIELD_CATEGORY: &str = "业务类型";
pub const FIELD_REGION: &str = "区域";
pub const FIELD_RECORD_ID: &str = "记录ID";
pub const FIELD_DETAIL_URL: &str = "详情链接";

/// Reserved field holding the truncated main-content text
pub const FIELD_FULL_TEXT: &str = "正文内容";

/// Reserved field marking a record whose extraction failed
pub const FIELD_ERROR: &str = "错误";

/// Fixed leading columns of the tabular export
pub const BASE_COLUMNS: [&str; 6] = [
    FIELD_SEQUENCE,
    FIELD_TITLE,
    FIELD_PUBLISH_DATE,
    FIELD_CATEGORY,
    FIELD_REGION,
    FIELD_DETAIL_URL,
];

/// A listing entry produced by the link harvester
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    #[serde(rename = "标题", default)]
    pub title: String,

    #[serde(rename = "发布日期", default)]
    pub publish_date: String,

    #[serde(rename = "业务类型", default)]
    pub category: String,

    #[serde(rename = "区域", default)]
    pub region: String,

    /// Stable external identifier
    #[serde(rename = "记录ID", default)]
    pub id: String,

    #[serde(rename = "详情链接", default)]
    pub detail_url: String,
}

/// A harvested link together with its position in the links file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    /// Zero-based index in the harvested link list
    pub position: usize,
    pub link: LinkRecord,
}

/// Link fields merged with everything extracted from the detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    /// One-based position in the harvested link list
    #[serde(rename = "序号", default)]
    pub sequence: usize,

    #[serde(rename = "标题", default)]
    pub title: String,

    #[serde(rename = "发布日期", default)]
    pub publish_date: String,

    #[serde(rename = "业务类型", default)]
    pub category: String,

    #[serde(rename = "区域", default)]
    pub region: String,

    #[serde(rename = "详情链接", default)]
    pub detail_url: String,

    /// Dynamically discovered fields
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl DetailRecord {
    /// Builds the merged record for the link at `position`
    ///
    /// Extracted fields named like a descriptive base column replace the
    /// listing value. The sequence number and detail URL identify the record
    /// and always come from the link; page-supplied values for them are dropped.
    pub fn merge(position: usize, link: &LinkRecord, extracted: BTreeMap<String, String>) -> Self {
        let mut record = Self {
            sequence: position + 1,
            title: link.title.clone(),
            publish_date: link.publish_date.clone(),
            category: link.category.clone(),
            region: link.region.clone(),
            detail_url: link.detail_url.clone(),
            fields: BTreeMap::new(),
        };

        for (key, value) in extracted {
            match key.as_str() {
                FIELD_SEQUENCE | FIELD_DETAIL_URL => {}
                FIELD_TITLE => record.title = value,
                FIELD_PUBLISH_DATE => record.publish_date = value,
                FIELD_CATEGORY => record.category = value,
                FIELD_REGION => record.region = value,
                _ => {
                    record.fields.insert(key, value);
                }
            }
        }

        record
    }

    /// Returns true if the record carries an error marker instead of content
    pub fn has_error(&self) -> bool {
        self.fields.contains_key(FIELD_ERROR)
    }

    /// Looks up any column by its exported name
    pub fn column(&self, name: &str) -> Option<String> {
        match name {
            FIELD_SEQUENCE => Some(self.sequence.to_string()),
            FIELD_TITLE => Some(self.title.clone()),
            FIELD_PUBLISH_DATE => Some(self.publish_date.clone()),
            FIELD_CATEGORY => Some(self.category.clone()),
            FIELD_REGION => Some(self.region.clone()),
            FIELD_DETAIL_URL => Some(self.detail_url.clone()),
            other => self.fields.get(other).cloned(),
        }
    }
}
