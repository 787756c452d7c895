//! Details and export stages end to end against a mock site

use crate::common::{config_for, detail_page, links, MARKER_PAGE};
use tempfile::TempDir;
use tender_harvest::config::Config;
use tender_harvest::pipeline::{Pipeline, Stage};
use tender_harvest::session::{Credential, NoBackendLauncher, SessionError, SessionSnapshot};
use tender_harvest::state::FIELD_ERROR;
use tender_harvest::storage::{save_links, ProgressStore};
use tender_harvest::HarvestError;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves a detail page whose project code is the request path
struct DetailResponder;

impl Respond for DetailResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_string(detail_page(request.url.path()))
    }
}

fn store_session(config: &Config) {
    let cookies: Credential = vec![("__jsl_clearance_s".to_string(), "token".to_string())]
        .into_iter()
        .collect();
    SessionSnapshot::new(cookies, None)
        .save(&config.output.session_path())
        .unwrap();
}

async fn mount_marker_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/jyxx/transaction_detail.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MARKER_PAGE))
        .mount(server)
        .await;
}

fn pipeline(config: Config) -> Pipeline {
    Pipeline::new(config, Box::new(NoBackendLauncher)).unwrap()
}

#[tokio::test]
async fn test_details_and_export_with_stored_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_marker_page(&server).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/detail/\d+\.html$"))
        .respond_with(DetailResponder)
        .expect(5)
        .mount(&server)
        .await;

    let config = config_for(&server.uri(), dir.path());
    store_session(&config);
    save_links(&config.output.links_path(), &links(&server.uri(), 5)).unwrap();

    let pipeline = pipeline(config.clone());
    let state = pipeline.details_stage(false).await.unwrap();
    assert_eq!(state.completed.len(), 5);
    assert!(state.failed.is_empty());
    assert_eq!(
        state.details[3].fields.get("项目编号").map(String::as_str),
        Some("/detail/3.html")
    );

    let exported = pipeline.export_stage().unwrap();
    assert_eq!(exported, 5);

    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(config.output.details_json_path()).unwrap(),
    )
    .unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["序号"], 1);
    assert_eq!(rows[0]["采购人"], "重庆某单位");

    let csv = std::fs::read_to_string(config.output.details_csv_path()).unwrap();
    let header = csv.trim_start_matches('\u{feff}').lines().next().unwrap();
    assert!(header.starts_with("序号,标题,发布日期,业务类型,区域,详情链接,"));
    assert!(header.ends_with(",正文内容"));
    assert_eq!(csv.matches("重庆某单位").count(), 5);

    // A second run finds nothing pending and makes no further requests
    let state = pipeline.details_stage(false).await.unwrap();
    assert_eq!(state.completed.len(), 5);
}

#[tokio::test]
async fn test_missing_session_without_backend_fails() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let config = config_for(&server.uri(), dir.path());
    save_links(&config.output.links_path(), &links(&server.uri(), 2)).unwrap();

    let err = pipeline(config).details_stage(false).await.unwrap_err();
    assert!(matches!(err, HarvestError::Session(SessionError::NoBackend)));
}

#[tokio::test]
async fn test_rejected_credential_keeps_progress_when_renewal_fails() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_marker_page(&server).await;
    Mock::given(method("GET"))
        .and(path("/detail/0.html"))
        .respond_with(DetailResponder)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/detail/[12]\.html$"))
        .respond_with(ResponseTemplate::new(521))
        .mount(&server)
        .await;

    let config = config_for(&server.uri(), dir.path());
    store_session(&config);
    let link_list = links(&server.uri(), 3);
    save_links(&config.output.links_path(), &link_list).unwrap();

    let pipeline = pipeline(config.clone());
    let state = pipeline.details_stage(false).await.unwrap();

    assert_eq!(state.completed, vec!["id-0".to_string()]);
    assert_eq!(state.failed.len(), 2);
    assert_eq!(ProgressStore::new(config.output.progress_path()).load(), state);

    let exported = pipeline.export_stage().unwrap();
    assert_eq!(exported, 3);
    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(config.output.details_json_path()).unwrap(),
    )
    .unwrap();
    assert!(json[0].get(FIELD_ERROR).is_none());
    assert!(json[1][FIELD_ERROR].as_str().is_some());
    assert_eq!(json[2]["详情链接"], link_list[2].detail_url.as_str());
}

#[tokio::test]
async fn test_details_without_links_file() {
    let dir = TempDir::new().unwrap();
    let config = config_for("http://127.0.0.1:9", dir.path());

    let err = pipeline(config).details_stage(false).await.unwrap_err();
    assert!(matches!(err, HarvestError::MissingLinks { .. }));
}

#[tokio::test]
async fn test_export_only_without_progress_writes_empty_json() {
    let dir = TempDir::new().unwrap();
    let config = config_for("http://127.0.0.1:9", dir.path());

    pipeline(config.clone()).run(Stage::ExportOnly, false).await.unwrap();

    let json = std::fs::read_to_string(config.output.details_json_path()).unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&json).unwrap(), serde_json::json!([]));
    assert!(!config.output.details_csv_path().exists());
}

#[tokio::test]
async fn test_fresh_discards_previous_progress() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_marker_page(&server).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/detail/\d+\.html$"))
        .respond_with(DetailResponder)
        .expect(4)
        .mount(&server)
        .await;

    let config = config_for(&server.uri(), dir.path());
    store_session(&config);
    save_links(&config.output.links_path(), &links(&server.uri(), 2)).unwrap();

    let pipeline = pipeline(config);
    pipeline.details_stage(false).await.unwrap();
    let state = pipeline.details_stage(true).await.unwrap();
    assert_eq!(state.completed.len(), 2);
}
