use std::{path::Path, process::Stdio, time::Duration};

use anyhow::{anyhow, Context, Result};
use comment_thread_sync::ReactionKind;
use serde_json::json;
use tokio::{process::Command, time::timeout};
use wiremock::{
    matchers::{body_partial_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const RUN_TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_URL: &str = "https://example.com/post";

struct Run {
    success: bool,
    stdout: String,
    stderr: String,
}

#[tokio::test]
async fn comment_shows_up_at_the_top_and_name_is_remembered() -> Result<()> {
    let binary = assert_cmd::cargo::cargo_bin!("comment-thread");
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/api/blogs/42/comments"))
        .and(body_partial_json(json!({"name": "Alice", "body": "first!"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "c9",
            "name": "Alice",
            "body": "first!",
            "timestamp": "2025-03-02T08:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;
    let prefs = tempfile::tempdir()?;
    let prefs_file = prefs.path().join("prefs.json");

    let run = run_cli(
        &binary,
        &server,
        &prefs_file,
        &["comment", "--url", PAGE_URL, "--name", "Alice", "first!"],
    )
    .await?;

    assert!(run.success, "comment failed: {}", run.stderr);
    let lines: Vec<&str> = run.stdout.lines().collect();
    assert_eq!(lines[0], "# A post");
    assert_eq!(lines[1], "reactions: 👍 2");
    let first = lines
        .iter()
        .position(|line| line.contains("] Alice ·"))
        .context("new comment missing")?;
    let existing = lines
        .iter()
        .position(|line| line.starts_with("[c1] Carol"))
        .context("existing comment missing")?;
    assert!(first < existing);
    assert!(!run.stderr.contains("!!!"));

    let stored: serde_json::Value = serde_json::from_slice(&std::fs::read(&prefs_file)?)?;
    assert_eq!(stored, json!({"commentName": "Alice"}));
    Ok(())
}

#[tokio::test]
async fn comment_without_any_name_is_refused() -> Result<()> {
    let binary = assert_cmd::cargo::cargo_bin!("comment-thread");
    let server = backend().await;
    let prefs = tempfile::tempdir()?;

    let run = run_cli(
        &binary,
        &server,
        &prefs.path().join("prefs.json"),
        &["comment", "--url", PAGE_URL, "hello"],
    )
    .await?;

    assert!(!run.success);
    assert!(run.stderr.contains("pass --name"), "stderr: {}", run.stderr);
    Ok(())
}

#[tokio::test]
async fn stored_name_is_used_and_failed_writes_are_reported() -> Result<()> {
    let binary = assert_cmd::cargo::cargo_bin!("comment-thread");
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/api/blogs/42/comments"))
        .and(body_partial_json(json!({"name": "Bob", "parent_id": "c1"})))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;
    let prefs = tempfile::tempdir()?;
    let prefs_file = prefs.path().join("prefs.json");

    let named = run_cli(&binary, &server, &prefs_file, &["name", "  Bob "]).await?;
    assert!(named.success, "name failed: {}", named.stderr);
    assert_eq!(named.stdout.trim_end(), "*** display name set to Bob");

    let run = run_cli(
        &binary,
        &server,
        &prefs_file,
        &["reply", "--url", PAGE_URL, "--comment", "c1", "me too"],
    )
    .await?;

    // The reply stays visible even though the backend refused it.
    assert!(run.success, "reply failed: {}", run.stderr);
    assert!(run.stdout.contains("    ↳ [reply-"));
    assert!(run.stdout.contains("        me too"));
    assert!(run.stderr.contains("was not saved: http 503: maintenance"));
    Ok(())
}

#[tokio::test]
async fn react_toggles_the_page_reaction() -> Result<()> {
    let binary = assert_cmd::cargo::cargo_bin!("comment-thread");
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/api/blogs/42/reactions"))
        .and(body_partial_json(json!({"type": "love"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reaction_counts": {"like": 2, "love": 1},
        })))
        .expect(1)
        .mount(&server)
        .await;
    let prefs = tempfile::tempdir()?;

    let run = run_cli(
        &binary,
        &server,
        &prefs.path().join("prefs.json"),
        &["react", "--url", PAGE_URL, "love"],
    )
    .await?;

    assert!(run.success, "react failed: {}", run.stderr);
    let expected = format!("reactions: 👍 2  {} 1*", ReactionKind::Love.emoji());
    assert!(run.stdout.contains(&expected), "stdout: {}", run.stdout);
    Ok(())
}

/// Mock backend with a site, one blog post and a single page of comments.
async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "site": {"id": "site-1", "name": "Example", "url": "https://example.com"},
            "token": "secret-token",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "blog": {
                "id": "42",
                "name": "A post",
                "url": PAGE_URL,
                "reaction_counts": {"like": 2},
                "total_comments": 1,
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/blogs/42/comments"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "comments": [{
                "id": "c1",
                "name": "Carol",
                "body": "nice post",
                "timestamp": "2025-03-01T09:00:00Z",
                "reaction_counts": {},
                "replies": [],
            }],
            "pagination": {
                "current_page": 1,
                "last_page": 1,
                "per_page": 10,
                "total": 1,
                "has_more": false,
            },
        })))
        .mount(&server)
        .await;
    server
}

async fn run_cli(binary: &Path, server: &MockServer, prefs: &Path, args: &[&str]) -> Result<Run> {
    let mut cmd = Command::new(binary);
    cmd.arg("--api")
        .arg(format!("{}/api", server.uri()))
        .arg("--client-key")
        .arg("client-key")
        .arg("--preferences")
        .arg(prefs)
        .args(args)
        .env("RUST_LOG", "warn")
        .env("RUST_LOG_STYLE", "never")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = timeout(RUN_TIMEOUT, cmd.output())
        .await
        .map_err(|_| anyhow!("comment-thread {args:?} timed out"))?
        .with_context(|| format!("failed to run comment-thread {args:?}"))?;

    Ok(Run {
        success: output.status.success(),
        stdout: String::from_utf8(output.stdout)?,
        stderr: String::from_utf8(output.stderr)?,
    })
}
