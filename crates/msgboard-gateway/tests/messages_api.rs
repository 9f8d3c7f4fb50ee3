use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use msgboard_common::{Error, Message, MessageId, NewMessage, Result};
use msgboard_config::AppConfig;
use msgboard_db::{ListQuery, MessageProvider, MessageStore};
use msgboard_gateway::GatewayServer;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct TestGateway {
    base_url: String,
    store: MessageStore,
    dir: TempDir,
    _stop: oneshot::Sender<()>,
}

fn write_site(dir: &TempDir) {
    let root = dir.path();
    fs::create_dir_all(root.join("templates")).unwrap();
    fs::create_dir_all(root.join("static").join("js")).unwrap();
    fs::create_dir_all(root.join("static").join("css")).unwrap();
    fs::write(
        root.join("templates").join("index.html"),
        "<!doctype html><title>board</title>",
    )
    .unwrap();
    fs::write(root.join("static").join("js").join("app.js"), "console.log(1);").unwrap();
    fs::write(root.join("static").join("css").join("style.css"), "body{}").unwrap();
}

/// Start a gateway over `messages` on an ephemeral port.
async fn start_with(
    dir: TempDir,
    messages: Arc<dyn MessageProvider>,
) -> (String, TempDir, oneshot::Sender<()>) {
    let config = AppConfig::default().resolve_paths(dir.path());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server = GatewayServer::new(config, messages);
    tokio::spawn(async move {
        let _ = server
            .serve(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), dir, tx)
}

async fn start_gateway() -> TestGateway {
    let dir = tempfile::tempdir().unwrap();
    write_site(&dir);
    let config = AppConfig::default().resolve_paths(dir.path());
    let store = MessageStore::open(&config.storage.database_path)
        .await
        .unwrap();

    let (base_url, dir, stop) = start_with(dir, Arc::new(store.clone())).await;
    TestGateway {
        base_url,
        store,
        dir,
        _stop: stop,
    }
}

fn content_type(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn post_then_list_includes_new_message() {
    let gw = start_gateway().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/messages", gw.base_url))
        .body(r#"{"content":"hi"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(content_type(&resp).starts_with("application/json"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "success"}));

    let resp = client
        .get(format!("{}/messages", gw.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(content_type(&resp).starts_with("application/json"));
    let listed: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["content"], "hi");
    assert!(listed[0]["id"].as_i64().unwrap() > 0);
    assert!(listed[0]["timestamp"].is_string());
}

#[tokio::test]
async fn post_stores_author_and_parent() {
    let gw = start_gateway().await;
    let root = gw.store.insert(NewMessage::text("root")).await.unwrap();

    let resp = reqwest::Client::new()
        .post(format!("{}/messages", gw.base_url))
        .json(&serde_json::json!({
            "content": "reply",
            "author": "user3",
            "parent_message_id": root,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let replies = gw.store.replies(root).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].content, "reply");
    assert_eq!(replies[0].author.as_deref(), Some("user3"));
}

#[tokio::test]
async fn post_without_content_is_rejected() {
    let gw = start_gateway().await;

    let resp = reqwest::Client::new()
        .post(format!("{}/messages", gw.base_url))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(content_type(&resp).starts_with("text/plain"));
    let text = resp.text().await.unwrap();
    assert!(text.contains("content"), "unexpected error text: {text}");

    assert!(gw.store.list_all(ListQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn post_with_malformed_or_blank_body_is_rejected() {
    let gw = start_gateway().await;
    let client = reqwest::Client::new();

    for body in ["{not json", r#"{"content":"   "}"#, r#"{"content":42}"#] {
        let resp = client
            .post(format!("{}/messages", gw.base_url))
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }

    assert!(gw.store.list_all(ListQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_hides_deleted_rows_and_commit_hash() {
    let gw = start_gateway().await;
    let kept = gw.store.insert(NewMessage::text("kept")).await.unwrap();
    let gone = gw.store.insert(NewMessage::text("gone")).await.unwrap();
    gw.store.annotate_commit_hash(kept, "abc123").await.unwrap();
    gw.store.soft_delete(gone).await.unwrap();

    let listed: Vec<Value> = reqwest::get(format!("{}/messages", gw.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], kept);
    let keys: Vec<&String> = listed[0].as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 3);
    assert!(listed[0].get("git_commit_hash").is_none());

    let raw = gw.store.fetch_raw(kept).await.unwrap().unwrap();
    assert_eq!(raw.git_commit_hash.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
    let gw = start_gateway().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!(
            "{}/messages/unknown-path-that-does-not-exist",
            gw.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post(format!("{}/elsewhere", gw.base_url))
        .body(r#"{"content":"hi"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    for method in [reqwest::Method::POST, reqwest::Method::DELETE] {
        let resp = client
            .request(method.clone(), format!("{}/", gw.base_url))
            .body(r#"{"content":"hi"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "method: {method}");
    }
    assert!(gw.store.list_all(ListQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn not_found_bodies_do_not_reveal_server_paths() {
    let gw = start_gateway().await;
    let root = gw.dir.path().display().to_string();

    let resp = reqwest::get(format!("{}/nope.js", gw.base_url)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let text = resp.text().await.unwrap();
    assert!(text.contains("/nope.js"), "unexpected body: {text}");
    assert!(!text.contains(&root), "body leaks server path: {text}");
    assert!(!text.contains("static"), "body leaks server path: {text}");
}

#[tokio::test]
async fn serves_landing_page_and_static_assets() {
    let gw = start_gateway().await;

    let resp = reqwest::get(format!("{}/", gw.base_url)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(content_type(&resp), "text/html");
    assert!(resp.text().await.unwrap().contains("<title>board</title>"));

    let resp = reqwest::get(format!("{}/js/app.js", gw.base_url)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(content_type(&resp), "application/javascript");

    let resp = reqwest::get(format!("{}/css/style.css", gw.base_url)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(content_type(&resp), "text/css");
    assert_eq!(resp.text().await.unwrap(), "body{}");

    let resp = reqwest::get(format!("{}/css", gw.base_url)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_landing_page_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::default().resolve_paths(dir.path());
    let store = MessageStore::open(&config.storage.database_path)
        .await
        .unwrap();
    let (base_url, _dir, _stop) = start_with(dir, Arc::new(store)).await;

    let resp = reqwest::get(format!("{base_url}/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let text = resp.text().await.unwrap();
    assert!(!text.contains("templates"), "body leaks server path: {text}");
    assert!(!text.contains("index.html"), "body leaks server path: {text}");
}

/// Provider whose every call fails the way a corrupt or locked database would.
struct BrokenStorage;

#[async_trait]
impl MessageProvider for BrokenStorage {
    async fn list(&self, _query: ListQuery) -> Result<Vec<Message>> {
        Err(Error::Database("database disk image is malformed".into()))
    }

    async fn get(&self, _id: MessageId) -> Result<Option<Message>> {
        Err(Error::Database("database disk image is malformed".into()))
    }

    async fn insert(&self, _message: NewMessage) -> Result<MessageId> {
        Err(Error::Database("database is locked".into()))
    }

    async fn update_content(&self, _id: MessageId, _content: &str) -> Result<bool> {
        Err(Error::Database("database is locked".into()))
    }

    async fn soft_delete(&self, _id: MessageId) -> Result<bool> {
        Err(Error::Database("database is locked".into()))
    }

    async fn annotate_commit_hash(&self, _id: MessageId, _hash: &str) -> Result<bool> {
        Err(Error::Database("database is locked".into()))
    }
}

#[tokio::test]
async fn storage_failures_surface_as_500() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, _dir, _stop) = start_with(dir, Arc::new(BrokenStorage)).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base_url}/messages"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.text().await.unwrap().contains("malformed"));

    let resp = client
        .post(format!("{base_url}/messages"))
        .body(r#"{"content":"hi"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.text().await.unwrap().contains("locked"));
}
