//! Shared fixtures

use serde_json::{json, Value};
use std::path::Path;
use tender_harvest::config::{Config, HarvestConfig, SiteConfig};
use tender_harvest::state::LinkRecord;

pub const MARKER_PAGE: &str = "<html><head><title>重庆市公共资源交易网</title></head></html>";

/// Site configuration pointing at a mock server
pub fn site_for(base: &str) -> SiteConfig {
    SiteConfig {
        api_url: format!("{}/search/api", base),
        page_url: format!("{}/jyxx/transaction_detail.html", base),
        base_url: base.to_string(),
        ..SiteConfig::default()
    }
}

pub fn fast_harvest() -> HarvestConfig {
    HarvestConfig {
        max_retries: 3,
        backoff_unit_ms: 1,
        page_delay_ms: 0,
    }
}

/// Full configuration for a mock server, writing under `dir`
pub fn config_for(base: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.site = site_for(base);
    config.harvest = fast_harvest();
    config.crawler.retry_delay_ms = 1;
    config.crawler.request_timeout_secs = 5;
    config.crawler.max_concurrent = 4;
    config.crawler.checkpoint_interval = 2;
    config.output.dir = dir.to_path_buf();
    config
}

/// Raw search records `start..end` as the API returns them
pub fn raw_records(start: usize, end: usize) -> Vec<Value> {
    (start..end)
        .map(|i| {
            json!({
                "title": format!(" 项目{} ", i),
                "pubinwebdate": "2026-03-01",
                "categorytype": if i % 3 == 0 { "工程建设" } else { "政府采购" },
                "infoc": "渝中区",
                "newid": format!("id-{}", i),
                "linkurl": format!("/jyxx/{}.html", i),
            })
        })
        .collect()
}

/// A successful search envelope with `content` encoded as a JSON string
pub fn envelope(records: Vec<Value>, total: u64) -> Value {
    let content = json!({"result": {"records": records, "totalcount": total.to_string()}});
    json!({"code": 200, "content": content.to_string()})
}

/// `count` links whose detail pages live under `base`
pub fn links(base: &str, count: usize) -> Vec<LinkRecord> {
    (0..count)
        .map(|i| LinkRecord {
            title: format!("项目{}", i),
            publish_date: "2026-03-01".to_string(),
            category: "工程建设".to_string(),
            region: "渝中区".to_string(),
            id: format!("id-{}", i),
            detail_url: format!("{}/detail/{}.html", base, i),
        })
        .collect()
}

/// Detail page markup carrying the given project code
pub fn detail_page(code: &str) -> String {
    format!(
        r#"<html><body>
            <h2 class="detail-title">成交结果公示</h2>
            <div class="project-code">项目编号：{code}</div>
            <table><tr><td>采购人：</td><td>重庆某单位</td></tr></table>
            <div class="ewb-article-info">【信息时间：2026-03-01】
一、成交金额：100万元
            </div>
        </body></html>"#
    )
}
