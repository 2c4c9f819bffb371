//! End-to-end tests for the line protocol against file-backed engines.

use caskdb_core::Config;
use caskdb_server::{Server, ServerConfig};
use std::time::Duration;
use tempfile::TempDir;

fn server_config(dir: &TempDir) -> ServerConfig {
    ServerConfig::new(dir.path().join("logs"), dir.path().join("hints"))
        .with_workers(4)
        .with_compaction_threshold(3)
        .with_compaction_interval(Duration::from_millis(10))
}

/// Sends `input` on a fresh connection and returns every reply.
///
/// Requests within one connection may run concurrently, so tests that
/// depend on ordering use one exchange per step.
async fn exchange(server: &Server, input: &str) -> String {
    let mut output = Vec::new();
    server
        .serve_connection(input.as_bytes(), &mut output)
        .await
        .unwrap();
    String::from_utf8(output).unwrap()
}

#[tokio::test]
async fn write_then_read() {
    let dir = TempDir::new().unwrap();
    let server = Server::start(server_config(&dir), Config::default())
        .await
        .unwrap();

    assert_eq!(exchange(&server, "w 7 {\"temp\": 21.5}\n").await, "");
    let reply = exchange(&server, "r 7\nr 8\nr 7\n").await;
    assert_eq!(reply, "{\"temp\": 21.5}\n{\"temp\": 21.5}\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn values_survive_restart() {
    let dir = TempDir::new().unwrap();

    let server = Server::start(server_config(&dir), Config::default())
        .await
        .unwrap();
    exchange(&server, "w 1 first --no-reply\nw 2 second\n").await;
    exchange(&server, "w 1 third\n").await;
    server.shutdown().await.unwrap();

    let server = Server::start(server_config(&dir), Config::default())
        .await
        .unwrap();
    let reply = exchange(&server, "r 1\nr 2\n").await;
    assert_eq!(reply, "third\nsecond\n");
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn export_replies_with_table_and_writes_file() {
    let dir = TempDir::new().unwrap();
    let server = Server::start(server_config(&dir), Config::default())
        .await
        .unwrap();
    let export_dir = dir.path().join("exports");

    exchange(&server, "w 2 b\nw 1 a\n").await;
    let input = format!("a {} table.csv\n", export_dir.display());
    let reply = exchange(&server, &input).await;

    assert_eq!(reply, "Key,Value\n1,a\n2,b\n\n");
    let written = std::fs::read_to_string(export_dir.join("table.csv")).unwrap();
    assert_eq!(written, "Key,Value\n1,a\n2,b\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn oversized_value_replies_error_and_connection_continues() {
    let dir = TempDir::new().unwrap();
    let server = Server::start(server_config(&dir), Config::new().buffer_capacity(64))
        .await
        .unwrap();

    let big = "x".repeat(100);
    let input = format!("w 1 {big}\nw 2 ok\n");
    let reply = exchange(&server, &input).await;
    assert!(reply.starts_with("ERR "));
    assert_eq!(reply.lines().count(), 1);

    assert_eq!(exchange(&server, "r 2\nr 1\n").await, "ok\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn trigger_compacts_written_segments() {
    let dir = TempDir::new().unwrap();
    let server = Server::start(server_config(&dir), Config::new().buffer_capacity(64))
        .await
        .unwrap();

    // 40-byte values: each write after the first flushes one segment.
    let value = "v".repeat(40);
    for _ in 0..6 {
        exchange(&server, &format!("w 9 {value} --no-reply\n")).await;
    }
    exchange(&server, "w 9 last\n").await;

    let engine = server.dispatcher().engine().clone();
    for _ in 0..200 {
        if engine.segment_count().unwrap() < 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(engine.segment_count().unwrap() < 3);
    assert_eq!(exchange(&server, "r 9\n").await, "last\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = server_config(&dir).with_workers(0);
    assert!(Server::start(config, Config::default()).await.is_err());
}
