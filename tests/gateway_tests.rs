use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use loggw::config::parse::parse_config;
use loggw::upstream::{LogFetcher, UpstreamError};
use loggw::web::{create_router, AppState};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "client-secret";

/// Serves fixed log text per upstream path and records every request.
#[derive(Default)]
struct FakeSupervisor {
    logs: HashMap<String, Vec<String>>,
    down: bool,
    requests: Mutex<Vec<(String, usize)>>,
}

impl FakeSupervisor {
    fn with_log(mut self, path: &str, lines: Vec<String>) -> Self {
        self.logs.insert(path.to_string(), lines);
        self
    }

    fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl LogFetcher for FakeSupervisor {
    async fn fetch_lines(&self, path: &str, count: usize) -> Result<String, UpstreamError> {
        self.requests.lock().unwrap().push((path.to_string(), count));
        if self.down {
            return Err(UpstreamError::Unavailable {
                kind: "ConnectError",
                detail: "connection refused".to_string(),
            });
        }
        match self.logs.get(path) {
            Some(lines) => {
                let start = lines.len().saturating_sub(count);
                Ok(lines[start..].join("\n"))
            }
            None => Err(UpstreamError::BadStatus {
                status: 404,
                snippet: "not found".to_string(),
            }),
        }
    }
}

fn test_config(dir: &Path) -> loggw::config::Config {
    let yaml = format!(
        r#"
auth:
  token: {TOKEN}
upstream:
  token: supervisor-token
lines:
  default: 3
  max: 50
paths:
  config_dir: {config}
  all_addon_configs_dir: {addons}
"#,
        config = dir.join("config").display(),
        addons = dir.join("addons").display(),
    );
    parse_config(&yaml).unwrap()
}

fn app(dir: &TempDir, supervisor: Arc<FakeSupervisor>) -> axum::Router {
    create_router(AppState::new(test_config(dir.path()), supervisor))
}

fn write_file(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
}

async fn get(app: axum::Router, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn error_message(response: Response) -> String {
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    json["error"].as_str().unwrap().to_string()
}

fn numbered(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix} {i}")).collect()
}

#[tokio::test]
async fn test_healthz_needs_no_token() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir, Arc::new(FakeSupervisor::default()))
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, r#"{"status":"ok"}"#);
}

#[tokio::test]
async fn test_missing_and_wrong_token_rejected() {
    let dir = TempDir::new().unwrap();
    let supervisor = Arc::new(FakeSupervisor::default().with_log("/host/logs", numbered("host", 5)));

    let response = app(&dir, supervisor.clone())
        .oneshot(Request::builder().uri("/logs/system").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(response).await, "Missing or invalid Authorization header.");

    let response = app(&dir, supervisor.clone())
        .oneshot(
            Request::builder()
                .uri("/logs/system")
                .header("Authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(response).await, "Invalid token.");

    assert!(supervisor.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_system_logs_use_default_line_count() {
    let dir = TempDir::new().unwrap();
    let supervisor = Arc::new(FakeSupervisor::default().with_log("/host/logs", numbered("host", 10)));

    let response = get(app(&dir, supervisor.clone()), "/logs/system").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "host 7\nhost 8\nhost 9");
    assert_eq!(
        *supervisor.requests.lock().unwrap(),
        vec![("/host/logs".to_string(), 3)]
    );
}

#[tokio::test]
async fn test_supervisor_logs_pass_line_count() {
    let dir = TempDir::new().unwrap();
    let supervisor =
        Arc::new(FakeSupervisor::default().with_log("/supervisor/logs", numbered("sup", 10)));

    let response = get(app(&dir, supervisor.clone()), "/logs/supervisor?lines=2").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "sup 8\nsup 9");
}

#[tokio::test]
async fn test_invalid_line_counts() {
    let dir = TempDir::new().unwrap();
    let supervisor = Arc::new(FakeSupervisor::default().with_log("/host/logs", numbered("host", 10)));

    let response = get(app(&dir, supervisor.clone()), "/logs/system?lines=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "lines must be positive.");

    let response = get(app(&dir, supervisor.clone()), "/logs/system?lines=51").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "lines must be <= 50.");

    let response = get(app(&dir, supervisor.clone()), "/logs/system?lines=abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(supervisor.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let dir = TempDir::new().unwrap();

    let response = get(app(&dir, Arc::new(FakeSupervisor::down())), "/logs/system").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(error_message(response).await, "Supervisor request failed: ConnectError");

    let response = get(app(&dir, Arc::new(FakeSupervisor::default())), "/logs/supervisor").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(error_message(response).await, "Supervisor returned 404: not found");
}

#[tokio::test]
async fn test_core_logs_merge_remote_and_local() {
    let dir = TempDir::new().unwrap();
    let remote = vec![
        "2024-01-01 10:00:01.000 INFO remote one".to_string(),
        "2024-01-01 10:00:04.000 INFO remote two".to_string(),
    ];
    let supervisor = Arc::new(FakeSupervisor::default().with_log("/core/logs", remote));

    write_file(
        &dir.path().join("config/home-assistant.log.1"),
        "2024-01-01 10:00:00.000 INFO rotated\n",
    );
    write_file(
        &dir.path().join("config/home-assistant.log"),
        "2024-01-01 10:00:02.000 INFO local one\n2024-01-01 10:00:03.000 INFO local two\n",
    );

    let response = get(app(&dir, supervisor.clone()), "/logs/core?lines=10").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "2024-01-01 10:00:00.000 INFO rotated\n\
         2024-01-01 10:00:01.000 INFO remote one\n\
         2024-01-01 10:00:02.000 INFO local one\n\
         2024-01-01 10:00:03.000 INFO local two\n\
         2024-01-01 10:00:04.000 INFO remote two"
    );
    assert_eq!(
        *supervisor.requests.lock().unwrap(),
        vec![("/core/logs".to_string(), 10)]
    );
}

#[tokio::test]
async fn test_core_logs_without_local_files() {
    let dir = TempDir::new().unwrap();
    let supervisor = Arc::new(
        FakeSupervisor::default().with_log("/core/logs", numbered("2024-01-01 10:00:00 core", 5)),
    );

    let response = get(app(&dir, supervisor), "/logs/core?lines=2").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "2024-01-01 10:00:00 core 3\n2024-01-01 10:00:00 core 4"
    );
}

#[tokio::test]
async fn test_z2m_logs_filter_debug_lines() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..20)
        .map(|i| {
            if i % 2 == 0 {
                format!("[2024-01-01 10:00:{i:02}] debug: noise {i}")
            } else {
                format!("[2024-01-01 10:00:{i:02}] info: event {i}")
            }
        })
        .collect();
    let supervisor = Arc::new(
        FakeSupervisor::default().with_log("/addons/45df7312_zigbee2mqtt/logs", lines),
    );

    let response = get(app(&dir, supervisor.clone()), "/logs/z2m?lines=2").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-loggateway-warning").is_none());
    assert_eq!(
        body_text(response).await,
        "[2024-01-01 10:00:17] info: event 17\n[2024-01-01 10:00:19] info: event 19"
    );
    assert_eq!(
        *supervisor.requests.lock().unwrap(),
        vec![("/addons/45df7312_zigbee2mqtt/logs".to_string(), 5000)]
    );
}

#[tokio::test]
async fn test_z2m_logs_include_debug() {
    let dir = TempDir::new().unwrap();
    let lines = vec![
        "[2024-01-01 10:00:00] info: event".to_string(),
        "[2024-01-01 10:00:01] debug: noise".to_string(),
    ];
    let supervisor = Arc::new(
        FakeSupervisor::default().with_log("/addons/45df7312_zigbee2mqtt/logs", lines),
    );

    let response = get(app(&dir, supervisor.clone()), "/logs/z2m?lines=2&include_debug=true").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "[2024-01-01 10:00:00] info: event\n[2024-01-01 10:00:01] debug: noise"
    );
    assert_eq!(
        *supervisor.requests.lock().unwrap(),
        vec![("/addons/45df7312_zigbee2mqtt/logs".to_string(), 2)]
    );
}

#[tokio::test]
async fn test_z2m_logs_warning_header() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..10)
        .map(|i| format!("[2024-01-01 10:00:{i:02}] debug: noise {i}"))
        .collect();
    let supervisor = Arc::new(
        FakeSupervisor::default().with_log("/addons/45df7312_zigbee2mqtt/logs", lines),
    );

    let response = get(app(&dir, supervisor), "/logs/z2m?lines=3").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["x-loggateway-warning"],
        "Insufficient non-debug lines; returning mixed lines to satisfy target count."
    );
    assert_eq!(body_text(response).await.lines().count(), 3);
}

#[tokio::test]
async fn test_list_z2m_files() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("config/zigbee2mqtt/configuration.yaml"), "mqtt: {}\n");
    write_file(&dir.path().join("config/zigbee2mqtt/secret.yaml"), "password: x\n");
    write_file(&dir.path().join("addons/45df7312_zigbee2mqtt/database.db"), "{}\n");

    let response = get(app(&dir, Arc::new(FakeSupervisor::default())), "/files/z2m").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    let locations = json["locations"].as_array().unwrap();
    assert_eq!(locations.len(), 2);

    let first = &locations[0];
    assert!(first["base"].as_str().unwrap().ends_with("config/zigbee2mqtt"));
    let names: Vec<&str> = first["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["configuration.yaml"]);
    assert_eq!(first["files"][0]["size"], 9);
    assert_eq!(first["files"][0]["content_type"], "text/yaml; charset=utf-8");

    assert_eq!(locations[1]["files"][0]["name"], "database.db");
    assert_eq!(
        locations[1]["files"][0]["content_type"],
        "application/json; charset=utf-8"
    );
}

#[tokio::test]
async fn test_get_z2m_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config/zigbee2mqtt/devices.yaml");
    write_file(&path, "'0x00': {}\n");

    let response = get(app(&dir, Arc::new(FakeSupervisor::default())), "/files/z2m/devices.yaml").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/yaml; charset=utf-8");
    assert_eq!(
        response.headers()["x-loggateway-path"],
        path.display().to_string().as_str()
    );
    assert!(response.headers().get("x-loggateway-truncated").is_none());
    assert_eq!(body_text(response).await, "'0x00': {}\n");
}

#[tokio::test]
async fn test_get_z2m_file_falls_back_to_addon_config() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("addons/45df7312_zigbee2mqtt/groups.yml"), "{}\n");

    let response = get(app(&dir, Arc::new(FakeSupervisor::default())), "/files/z2m/groups.yml").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "{}\n");
}

#[tokio::test]
async fn test_get_z2m_file_download() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("config/zigbee2mqtt/coordinator_backup.json"), "{\"a\":1}");

    let response = get(
        app(&dir, Arc::new(FakeSupervisor::default())),
        "/files/z2m/coordinator_backup.json?download=true",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"coordinator_backup.json\""
    );
    assert_eq!(body_text(response).await, "{\"a\":1}");
}

#[tokio::test]
async fn test_get_z2m_file_truncated() {
    let dir = TempDir::new().unwrap();
    let big = "x".repeat(loggw::web::files::MAX_INLINE_BYTES as usize + 10);
    write_file(&dir.path().join("config/zigbee2mqtt/database.db"), &big);

    let response = get(app(&dir, Arc::new(FakeSupervisor::default())), "/files/z2m/database.db").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-loggateway-truncated"], "true");
    assert_eq!(
        body_text(response).await.len(),
        loggw::web::files::MAX_INLINE_BYTES as usize
    );
}

#[tokio::test]
async fn test_download_is_not_capped() {
    let dir = TempDir::new().unwrap();
    let big = "y".repeat(loggw::web::files::MAX_INLINE_BYTES as usize * 2);
    write_file(&dir.path().join("config/zigbee2mqtt/database.db"), &big);

    let response = get(
        app(&dir, Arc::new(FakeSupervisor::default())),
        "/files/z2m/database.db?download=true",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-loggateway-truncated").is_none());
    assert_eq!(body_text(response).await, big);
}

#[tokio::test]
async fn test_get_z2m_file_rejections() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("config/zigbee2mqtt/secret.yaml"), "password: x\n");

    let response = get(app(&dir, Arc::new(FakeSupervisor::default())), "/files/z2m/secret.yaml").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, "File not allowed.");

    let response = get(app(&dir, Arc::new(FakeSupervisor::default())), "/files/z2m/groups.yaml").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, "File not found.");
}

#[tokio::test]
async fn test_external_converters() {
    let dir = TempDir::new().unwrap();
    let converters = dir.path().join("config/zigbee2mqtt/external_converters");
    write_file(&converters.join("b_device.js"), "module.exports = [];\n");
    write_file(&converters.join("a_device.js"), "module.exports = [1];\n");
    write_file(&converters.join("notes.txt"), "ignored\n");

    let response = get(
        app(&dir, Arc::new(FakeSupervisor::default())),
        "/files/z2m/external_converters",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    let names: Vec<&str> = json["locations"][0]["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a_device.js", "b_device.js"]);
    assert!(json["locations"][0]["files"][0].get("content_type").is_none());

    let response = get(
        app(&dir, Arc::new(FakeSupervisor::default())),
        "/files/z2m/external_converters/a_device.js",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/javascript; charset=utf-8"
    );
    assert_eq!(body_text(response).await, "module.exports = [1];\n");

    let response = get(
        app(&dir, Arc::new(FakeSupervisor::default())),
        "/files/z2m/external_converters/notes.txt",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, "File not allowed.");
}
