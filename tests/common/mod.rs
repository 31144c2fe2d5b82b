//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_backend;

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::time::Duration;

use teacher_panel::api::TeacherApi;
use teacher_panel::config::{ApiConfig, Config, PollConfig, UploadConfig};
use tempfile::TempDir;

use mock_backend::MockBackend;

/// Find a port nothing is listening on.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

/// Config pointing at `base_url` with short timeouts for tests.
pub fn test_config(base_url: &str) -> Config {
    Config {
        api: ApiConfig {
            base_url: base_url.to_string(),
            timeout_ms: 2_000,
            retries: 1,
            retry_delay_ms: 50,
            connect_timeout_ms: 1_000,
        },
        upload: UploadConfig {
            timeout_ms: 5_000,
            chunk_size: 1024,
        },
        poll: PollConfig::default(),
    }
}

/// API wired to a mock backend.
pub fn api_for(mock: &MockBackend) -> TeacherApi {
    TeacherApi::from_config(&test_config(&mock.base_url())).expect("Failed to build api")
}

/// Write `content` to a config file inside a fresh temp dir.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}

pub fn teacher_json() -> &'static str {
    r#"{"ok": true, "teacher": {"id": 5, "name": "Dilnoza Karimova", "login": "dilnoza"}}"#
}

pub fn group_json(pending: i64) -> String {
    format!(
        r#"{{"ok": true, "group": {{"id": 3, "name": "Physics 10A", "code": "PHY10A", "students_count": 24, "pending_count": {}}}}}"#,
        pending
    )
}

pub fn requests_json(ids: &[i64]) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|id| {
            format!(
                r#"{{"student_id": {}, "full_name": "Student {}", "status": "pending", "created_at": "2026-09-01 10:00:00"}}"#,
                id, id
            )
        })
        .collect();
    format!(r#"{{"ok": true, "requests": [{}]}}"#, items.join(","))
}

/// Wait for a server to become available.
pub async fn wait_for_server(addr: SocketAddr, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
