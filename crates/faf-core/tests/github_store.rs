//! Contents-API store against a mock server

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use faf_core::{
    BrokerConfig, BrokerError, DnaStore, FafBroker, FixedClock, GitHubContentsStore, GitHubTarget,
    MemoryAuditSink, MutationRequest, StaticCredentials, StoreError,
};
use faf_dna::{UpdateSet, VersionToken};
use faf_test_utils::{after_sample, SAMPLE_DNA};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "ghp_testtoken123";
const CONTENTS: &str = "/repos/acme/dna/contents/project.faf";

fn store(server: &MockServer) -> GitHubContentsStore {
    GitHubContentsStore::new(
        GitHubTarget {
            api_base: server.uri(),
            owner: "acme".into(),
            repo: "dna".into(),
            branch: "main".into(),
        },
        Arc::new(StaticCredentials::new(TOKEN)),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn encoded(text: &str) -> String {
    // The API wraps base64 at 60 columns
    let raw = STANDARD.encode(text);
    raw.as_bytes()
        .chunks(60)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn mount_get(server: &MockServer, sha: &str) {
    Mock::given(method("GET"))
        .and(path(CONTENTS))
        .and(query_param("ref", "main"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": sha,
            "encoding": "base64",
            "content": encoded(SAMPLE_DNA),
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn read_decodes_content_and_sha() {
    let server = MockServer::start().await;
    mount_get(&server, "abc123").await;

    let stored = store(&server).read("project.faf").await.unwrap();
    assert_eq!(stored.content, SAMPLE_DNA);
    assert_eq!(stored.version, VersionToken::new("abc123"));
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTENTS))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let err = store(&server).read("project.faf").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn write_sends_sha_and_returns_commit_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS))
        .and(body_partial_json(json!({
            "message": "voice: update",
            "sha": "abc123",
            "branch": "main",
            "content": STANDARD.encode("a: 2\n"),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": {"sha": "def456"},
            "commit": {"sha": "c0ffee", "html_url": "https://github.com/acme/dna/commit/c0ffee"},
        })))
        .mount(&server)
        .await;

    let commit = store(&server)
        .write("project.faf", "a: 2\n", &VersionToken::new("abc123"), "voice: update")
        .await
        .unwrap();
    assert_eq!(commit.version, VersionToken::new("def456"));
    assert_eq!(commit.url, "https://github.com/acme/dna/commit/c0ffee");
}

#[tokio::test]
async fn sha_mismatch_is_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "project.faf does not match abc123"
        })))
        .mount(&server)
        .await;

    let err = store(&server)
        .write("project.faf", "a: 2\n", &VersionToken::new("abc123"), "m")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[tokio::test]
async fn validation_failure_is_upstream_not_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Invalid request. \"sha\" wasn't supplied."
        })))
        .mount(&server)
        .await;

    let err = store(&server)
        .write("project.faf", "a: 2\n", &VersionToken::new("abc123"), "m")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Upstream { status: 422, .. }));
    let broker_err = BrokerError::from(err);
    assert_eq!(broker_err.status_code(), 502);
    assert_eq!(broker_err.upstream_status(), Some(422));
}

#[tokio::test]
async fn upstream_failure_never_leaks_token() {
    let server = MockServer::start().await;
    mount_get(&server, "abc123").await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": format!("Bad credentials for {TOKEN}")
        })))
        .mount(&server)
        .await;

    let broker = FafBroker::new(
        BrokerConfig::default(),
        Arc::new(store(&server)),
        Arc::new(MemoryAuditSink::new()),
    )
    .with_clock(Arc::new(FixedClock(after_sample())));

    let err = broker
        .mutate(&MutationRequest {
            updates: Some(UpdateSet::new().with("project.goal", json!("x"))),
            ..MutationRequest::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, BrokerError::Upstream { status: Some(401), .. }));
    let payload = err.to_payload();
    assert_eq!(payload["upstream_status"], 401);
    let rendered = payload.to_string();
    assert!(!rendered.contains(TOKEN));
    assert!(!rendered.contains("ghp_"));
}

#[tokio::test]
async fn slow_upstream_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTENTS))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let slow = GitHubContentsStore::new(
        GitHubTarget {
            api_base: server.uri(),
            owner: "acme".into(),
            repo: "dna".into(),
            branch: "main".into(),
        },
        Arc::new(StaticCredentials::new(TOKEN)),
        Duration::from_millis(100),
    )
    .unwrap();

    let err = slow.read("project.faf").await.unwrap_err();
    assert!(matches!(err, StoreError::TimedOut { timeout_ms: 100 }));
    assert_eq!(BrokerError::from(err).status_code(), 504);
}
