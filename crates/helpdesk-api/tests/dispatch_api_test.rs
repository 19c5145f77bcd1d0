//! End-to-end tests for the `/api?action=` dispatcher.
//!
//! Each test serves the real router on an ephemeral port, backed by the
//! in-memory repository and a temporary upload directory.

use std::sync::Arc;

use helpdesk_api::{router, ApiConfig, AppState};
use helpdesk_db::{AttachmentConfig, AttachmentStore, MemoryTicketRepository};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    repo: MemoryTicketRepository,
    upload_dir: TempDir,
}

impl TestServer {
    fn api(&self) -> String {
        format!("{}/api", self.base_url)
    }

    fn uploaded_files(&self) -> Vec<String> {
        std::fs::read_dir(self.upload_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    async fn create(&self, form: Form) -> reqwest::Response {
        self.client
            .post(self.api())
            .query(&[("action", "create")])
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    async fn get_ticket(&self, id: i64) -> Value {
        self.client
            .get(self.api())
            .query(&[("action", "get"), ("id", id.to_string().as_str())])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn download(&self, file: &str) -> reqwest::Response {
        self.client
            .get(self.api())
            .query(&[("action", "download"), ("file", file)])
            .send()
            .await
            .unwrap()
    }
}

/// Build a test server. Returns once the listener is bound.
async fn spawn_test_server() -> TestServer {
    let upload_dir = TempDir::new().expect("Failed to create temp dir");
    let attachments = AttachmentStore::open(AttachmentConfig::new(upload_dir.path()))
        .await
        .expect("Failed to open attachment store");
    let repo = MemoryTicketRepository::new(attachments.clone());

    let state = AppState::new(Arc::new(repo.clone()), attachments);
    let app = router(state, &ApiConfig::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url,
        client: reqwest::Client::new(),
        repo,
        upload_dir,
    }
}

fn ticket_form(title: &str, department: &str) -> Form {
    Form::new()
        .text("title", title.to_string())
        .text("department", department.to_string())
}

fn file_part(name: &str, data: Vec<u8>) -> Part {
    Part::bytes(data).file_name(name.to_string())
}

async fn error_message(resp: reqwest::Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

// -- create / get --

#[tokio::test]
async fn test_create_then_get_uses_defaults() {
    let server = spawn_test_server().await;

    let resp = server.create(ticket_form("Printer broken", "IT")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "ok": true, "id": 1 }));

    let ticket = server.get_ticket(1).await;
    assert_eq!(ticket["title"], "Printer broken");
    assert_eq!(ticket["department"], "IT");
    assert_eq!(ticket["status"], "Open");
    assert_eq!(ticket["priority"], "Medium");
    assert_eq!(ticket["attachment"], Value::Null);
    assert!(ticket["created_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_create_accepts_urlencoded_body() {
    let server = spawn_test_server().await;

    let resp = server
        .client
        .post(server.api())
        .query(&[("action", "create")])
        .form(&[
            ("title", "VPN down"),
            ("department", "Network"),
            ("priority", "Urgent"),
            ("end_at", "2024-07-01T17:30"),
            ("github_url", "https://github.com/acme/vpn/issues/3"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let ticket = server.get_ticket(1).await;
    assert_eq!(ticket["priority"], "Urgent");
    assert_eq!(ticket["end_at"], "2024-07-01T17:30:00Z");
    assert_eq!(ticket["github_url"], "https://github.com/acme/vpn/issues/3");
}

#[tokio::test]
async fn test_create_requires_title_and_department() {
    let server = spawn_test_server().await;

    let resp = server
        .create(ticket_form("   ", "IT").part("attachment", file_part("a.txt", b"x".to_vec())))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "title and department required");
    assert!(server.repo.is_empty().await);
    assert!(server.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_create_with_oversized_file_is_rejected() {
    let server = spawn_test_server().await;

    let big = vec![b'a'; 6 * 1024 * 1024];
    let resp = server
        .create(ticket_form("Logs", "IT").part("attachment", file_part("huge.log", big)))
        .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(resp).await.starts_with("File too large"));
    assert!(server.repo.is_empty().await);
    assert!(server.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_create_with_disallowed_extension_is_rejected() {
    let server = spawn_test_server().await;

    let resp = server
        .create(ticket_form("Script", "IT").part("attachment", file_part("evil.php", b"<?php".to_vec())))
        .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "File type not allowed");
    assert!(server.repo.is_empty().await);
    assert!(server.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_create_with_empty_file_input_has_no_attachment() {
    let server = spawn_test_server().await;

    let resp = server
        .create(ticket_form("No file", "IT").part("attachment", file_part("", Vec::new())))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let ticket = server.get_ticket(1).await;
    assert_eq!(ticket["attachment"], Value::Null);
    assert!(server.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_create_with_bad_priority_stores_nothing() {
    let server = spawn_test_server().await;

    let resp = server
        .create(
            ticket_form("Printer broken", "IT")
                .text("priority", "whenever")
                .part("attachment", file_part("a.txt", b"x".to_vec())),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(server.repo.is_empty().await);
    assert!(server.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_create_fails_when_upload_cannot_be_written() {
    let server = spawn_test_server().await;
    std::fs::remove_dir_all(server.upload_dir.path()).unwrap();

    let resp = server
        .create(ticket_form("Printer broken", "IT").part("attachment", file_part("a.png", b"png".to_vec())))
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(resp).await, "Failed to move uploaded file");
    assert_eq!(server.repo.len().await, 0);
}

#[tokio::test]
async fn test_get_invalid_id() {
    let server = spawn_test_server().await;

    for id in ["0", "-1", "abc", ""] {
        let resp = server
            .client
            .get(server.api())
            .query(&[("action", "get"), ("id", id)])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{id:?}");
        assert_eq!(error_message(resp).await, "invalid id");
    }
}

#[tokio::test]
async fn test_get_absent_ticket_is_empty_object() {
    let server = spawn_test_server().await;
    assert_eq!(server.get_ticket(99).await, serde_json::json!({}));
}

// -- list --

#[tokio::test]
async fn test_list_is_default_action_and_filters() {
    let server = spawn_test_server().await;

    server.create(ticket_form("Printer broken", "IT")).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    server
        .create(ticket_form("Chair squeaks", "Facilities").text("description", "Near the printer"))
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    server.create(ticket_form("Laptop slow", "IT")).await;

    let all: Vec<Value> = server
        .client
        .get(server.api())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = all.iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Laptop slow", "Chair squeaks", "Printer broken"]);

    let printer: Vec<Value> = server
        .client
        .get(server.api())
        .query(&[("action", "list"), ("q", "PRINTER")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(printer.len(), 2);

    let it_printer: Vec<Value> = server
        .client
        .get(server.api())
        .query(&[("action", "list"), ("q", "printer"), ("department", "IT"), ("status", "")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(it_printer.len(), 1);
    assert_eq!(it_printer[0]["title"], "Printer broken");
}

#[tokio::test]
async fn test_list_empty_is_empty_array() {
    let server = spawn_test_server().await;

    let resp = server
        .client
        .get(server.api())
        .query(&[("action", "list"), ("q", "nothing")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_list_with_unknown_status_matches_nothing() {
    let server = spawn_test_server().await;
    server.create(ticket_form("Printer broken", "IT")).await;

    let resp = server
        .client
        .get(server.api())
        .query(&[("action", "list"), ("status", "Pending")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!([]));

    let open: Vec<Value> = server
        .client
        .get(server.api())
        .query(&[("action", "list"), ("status", "Open")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
}

// -- update --

#[tokio::test]
async fn test_update_replaces_attachment() {
    let server = spawn_test_server().await;

    server
        .create(ticket_form("Printer broken", "IT").part("attachment", file_part("old.txt", b"old".to_vec())))
        .await;
    let old_name = server.get_ticket(1).await["attachment"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = server
        .client
        .post(server.api())
        .query(&[("action", "update")])
        .multipart(
            Form::new()
                .text("id", "1")
                .text("status", "In Progress")
                .part("attachment", file_part("new.pdf", b"%PDF".to_vec())),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "ok": true }));

    let ticket = server.get_ticket(1).await;
    let new_name = ticket["attachment"].as_str().unwrap();
    assert_ne!(new_name, old_name);
    assert!(new_name.ends_with(".pdf"));
    assert_eq!(ticket["status"], "In Progress");
    assert_eq!(ticket["title"], "Printer broken");

    assert_eq!(server.download(&old_name).await.status(), StatusCode::NOT_FOUND);
    let resp = server.download(new_name).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"%PDF");
    assert_eq!(server.uploaded_files(), vec![new_name.to_string()]);
}

#[tokio::test]
async fn test_update_unknown_id_cleans_up_upload() {
    let server = spawn_test_server().await;

    let resp = server
        .client
        .post(server.api())
        .query(&[("action", "update")])
        .multipart(
            Form::new()
                .text("id", "41")
                .part("attachment", file_part("a.txt", b"x".to_vec())),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(server.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_update_fails_when_upload_cannot_be_written() {
    let server = spawn_test_server().await;

    server
        .create(ticket_form("Printer broken", "IT").part("attachment", file_part("old.txt", b"old".to_vec())))
        .await;
    let before = server.get_ticket(1).await;
    std::fs::remove_dir_all(server.upload_dir.path()).unwrap();

    let resp = server
        .client
        .post(server.api())
        .query(&[("action", "update")])
        .multipart(
            Form::new()
                .text("id", "1")
                .text("status", "Closed")
                .part("attachment", file_part("new.png", b"png".to_vec())),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(resp).await, "Failed to move uploaded file");

    let after = server.get_ticket(1).await;
    assert_eq!(after["attachment"], before["attachment"]);
    assert_eq!(after["status"], "Open");
}

#[tokio::test]
async fn test_update_invalid_id() {
    let server = spawn_test_server().await;

    let resp = server
        .client
        .post(server.api())
        .query(&[("action", "update")])
        .form(&[("id", "zero"), ("title", "x")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "invalid id");
}

// -- delete --

#[tokio::test]
async fn test_delete_removes_ticket_and_file() {
    let server = spawn_test_server().await;

    server
        .create(ticket_form("Printer broken", "IT").part("attachment", file_part("shot.png", b"png".to_vec())))
        .await;
    let name = server.get_ticket(1).await["attachment"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = server
        .client
        .post(server.api())
        .query(&[("action", "delete")])
        .form(&[("id", "1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(server.get_ticket(1).await, serde_json::json!({}));
    assert_eq!(server.download(&name).await.status(), StatusCode::NOT_FOUND);
    assert!(server.uploaded_files().is_empty());

    // Id in the query string works too; the ticket is gone now.
    let resp = server
        .client
        .post(server.api())
        .query(&[("action", "delete"), ("id", "1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// -- download --

#[tokio::test]
async fn test_download_headers_and_body() {
    let server = spawn_test_server().await;

    server
        .create(ticket_form("Logs", "IT").part("attachment", file_part("app.log", b"line one\n".to_vec())))
        .await;
    let name = server.get_ticket(1).await["attachment"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = server.download(&name).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers["content-type"], "application/octet-stream");
    assert_eq!(
        headers["content-disposition"],
        format!("attachment; filename=\"{}\"", name).as_str()
    );
    assert_eq!(headers["content-length"], "9");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"line one\n");
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let server = spawn_test_server().await;

    for file in ["../../etc/passwd", "../outside.txt", "..", "", "/etc/passwd", "..\\..\\boot.ini"] {
        let resp = server.download(file).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{file:?}");
    }
}

// -- export --

#[tokio::test]
async fn test_export_csv() {
    let server = spawn_test_server().await;

    let resp = server
        .client
        .get(server.api())
        .query(&[("action", "export_csv")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=tickets_export.csv"
    );
    assert_eq!(
        resp.text().await.unwrap(),
        "id,title,department,priority,status,created_at,end_at,github_url,attachment\n"
    );

    server
        .create(ticket_form("Printer, upstairs", "IT").text("description", "secret details"))
        .await;
    let csv = server
        .client
        .get(server.api())
        .query(&[("action", "export_csv")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("1,\"Printer, upstairs\",IT,Medium,Open,"));
    assert!(!csv.contains("secret details"));
}

// -- dispatch rules --

#[tokio::test]
async fn test_unknown_action() {
    let server = spawn_test_server().await;

    let resp = server
        .client
        .get(server.api())
        .query(&[("action", "explode")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "unknown action");
}

#[tokio::test]
async fn test_write_actions_require_post() {
    let server = spawn_test_server().await;

    for action in ["create", "update", "delete"] {
        let resp = server
            .client
            .get(server.api())
            .query(&[("action", action), ("title", "x"), ("department", "y")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{action}");
    }
    assert!(server.repo.is_empty().await);
}

#[tokio::test]
async fn test_legacy_script_path_is_served() {
    let server = spawn_test_server().await;

    let resp = server
        .client
        .get(format!("{}/api.php", server.base_url))
        .query(&[("action", "list")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let server = spawn_test_server().await;

    let resp = server
        .client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
