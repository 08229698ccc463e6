// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use datadog_logs_persistence::config::UploadConfig;
use datadog_logs_persistence::context::AppContext;
use datadog_logs_persistence::persistence::{
    Directory, EventWriter, FileWriter, FilesOrchestrator, PersistenceHandle, PersistenceService,
    ReadConditions, WriteConditions,
};
use datadog_logs_persistence::time::ManualDateProvider;
use datadog_logs_persistence::upload::{
    DataUploadUrl, DataUploader, HttpHeaders, ReqwestHttpClient, UploadDelay, UploadStrategy,
};
use datadog_logs_persistence::{Config, LogsFeature};
use mockito::{Matcher, Server};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

const DEFAULT: Duration = Duration::from_secs(5);
const MIN: Duration = Duration::from_secs(1);
const MAX: Duration = Duration::from_secs(20);

struct Pipeline {
    clock: Arc<ManualDateProvider>,
    handle: PersistenceHandle,
    thread: JoinHandle<()>,
    strategy: UploadStrategy,
}

fn pipeline(dir: &Path, endpoint: &str) -> Pipeline {
    let clock = Arc::new(ManualDateProvider::new(
        UNIX_EPOCH + Duration::from_secs(1_600_000_000),
    ));
    let orchestrator = FilesOrchestrator::new(
        Directory::new(dir).expect("failed to create directory"),
        WriteConditions {
            max_file_size: 4_096,
            max_directory_size: 65_536,
            max_file_age_for_write: Duration::from_millis(4_750),
            max_writes_per_file: 500,
        },
        ReadConditions {
            min_file_age_for_read: Duration::from_secs(5),
            max_file_age_for_read: Duration::from_secs(3_600),
        },
        clock.clone(),
    );
    let (service, handle) = PersistenceService::new(FileWriter::new(orchestrator, 1_024), 64);
    let thread = service.spawn().expect("failed to spawn persistence thread");

    let uploader = DataUploader::new(
        DataUploadUrl::new(endpoint, "abc").expect("failed to build upload URL"),
        HttpHeaders::new(&AppContext::default()),
        Arc::new(ReqwestHttpClient::new(&UploadConfig::default()).expect("failed to build client")),
    );
    let strategy = UploadStrategy::new(
        handle.clone(),
        uploader,
        UploadDelay::new(DEFAULT, MIN, MAX, 0.9),
    );
    Pipeline {
        clock,
        handle,
        thread,
        strategy,
    }
}

fn file_count(dir: &Path) -> usize {
    Directory::new(dir)
        .and_then(|d| d.files())
        .map(|files| files.len())
        .expect("failed to list directory")
}

#[tokio::test]
async fn accepted_batch_is_uploaded_as_json_array_and_deleted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Regex("^/abc".to_string()))
        .match_query(Matcher::UrlEncoded("ddsource".into(), "mobile".into()))
        .match_header("content-type", "application/json")
        .match_body(r#"[{"message":"first"},{"message":"second"}]"#)
        .with_status(202)
        .create_async()
        .await;

    let dir = TempDir::new().expect("failed to create temp dir");
    let mut pipeline = pipeline(dir.path(), &server.url());

    let writer = EventWriter::new(pipeline.handle.clone());
    writer.write(serde_json::json!({"message": "first"}));
    writer.write(serde_json::json!({"message": "second"}));
    pipeline.handle.flush().await.expect("flush failed");
    assert_eq!(file_count(dir.path()), 1);

    // Still inside the read grace period: nothing is uploaded.
    assert_eq!(pipeline.strategy.run_cycle().await, DEFAULT);

    pipeline.clock.advance(Duration::from_secs(5));
    let next = pipeline.strategy.run_cycle().await;

    mock.assert_async().await;
    assert!(next < DEFAULT);
    assert_eq!(file_count(dir.path()), 0);

    pipeline.handle.shutdown().await.expect("shutdown failed");
    pipeline.thread.join().expect("persistence thread panicked");
}

#[tokio::test]
async fn server_error_keeps_batch_for_retry() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", Matcher::Any)
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().expect("failed to create temp dir");
    let mut pipeline = pipeline(dir.path(), &server.url());

    EventWriter::new(pipeline.handle.clone()).write("retry me");
    pipeline.handle.flush().await.expect("flush failed");
    pipeline.clock.advance(Duration::from_secs(5));

    assert_eq!(pipeline.strategy.run_cycle().await, MAX);
    failing.assert_async().await;
    assert_eq!(file_count(dir.path()), 1);

    failing.remove_async().await;
    let accepted = server
        .mock("POST", Matcher::Any)
        .match_body(r#"["retry me"]"#)
        .with_status(202)
        .create_async()
        .await;

    let next = pipeline.strategy.run_cycle().await;
    accepted.assert_async().await;
    assert!(next < DEFAULT);
    assert_eq!(file_count(dir.path()), 0);

    pipeline.handle.shutdown().await.expect("shutdown failed");
    pipeline.thread.join().expect("persistence thread panicked");
}

#[tokio::test]
async fn oversized_event_is_skipped_without_touching_disk() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let pipeline = pipeline(dir.path(), "https://api.example.com");

    let writer = EventWriter::new(pipeline.handle.clone());
    writer.write("x".repeat(2_048));
    pipeline.handle.flush().await.expect("flush failed");

    assert_eq!(file_count(dir.path()), 0);
    assert_eq!(writer.dropped_events(), 1);

    pipeline.handle.shutdown().await.expect("shutdown failed");
    pipeline.thread.join().expect("persistence thread panicked");
}

#[tokio::test]
async fn feature_delivers_logs_in_background() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Regex("^/abc".to_string()))
        .match_query(Matcher::UrlEncoded("ddsource".into(), "mobile".into()))
        .match_body(Matcher::Regex(r#""message":"payment accepted""#.to_string()))
        .with_status(202)
        .create_async()
        .await;

    let mut config = Config::default();
    config.persistence.max_file_age_for_write = Duration::from_millis(10);
    config.persistence.min_file_age_for_read = Duration::from_millis(20);
    config.upload.default_upload_delay = Duration::from_millis(100);
    config.upload.min_upload_delay = Duration::from_millis(50);
    config.upload.max_upload_delay = Duration::from_millis(200);

    let dir = TempDir::new().expect("failed to create temp dir");
    let feature = LogsFeature::builder(dir.path(), server.url(), "abc")
        .config(config)
        .start()
        .expect("failed to start feature");

    feature
        .logger("checkout", "main")
        .info("payment accepted");

    let mut delivered = false;
    for _ in 0..100 {
        if mock.matched_async().await && file_count(dir.path()) == 0 {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    feature.shutdown().await;

    assert!(delivered, "log was not delivered in time");
}
