// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic upload loop.
//!
//! ```text
//!   Idle ──(no readable file)──────────────────────────┐
//!    │                                                 v
//!    └──(batch)──> Uploading ──(delete | retain)──> Waiting ──(next_delay)──> Idle
//! ```
//!
//! File access goes through the persistence service; only the network call
//! runs on the upload task, so a slow collector never stalls writes.

use crate::persistence::service::PersistenceHandle;
use crate::upload::delay::UploadDelay;
use crate::upload::uploader::DataUploader;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Uploading,
    Waiting,
}

#[derive(Debug)]
pub struct UploadStrategy {
    handle: PersistenceHandle,
    uploader: DataUploader,
    delay: UploadDelay,
    phase: UploadPhase,
}

impl UploadStrategy {
    pub fn new(handle: PersistenceHandle, uploader: DataUploader, delay: UploadDelay) -> Self {
        Self {
            handle,
            uploader,
            delay,
            phase: UploadPhase::Idle,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    /// Uploads at most one batch and returns how long to wait before the next cycle.
    pub async fn run_cycle(&mut self) -> Duration {
        self.phase = UploadPhase::Idle;

        match self.handle.read_next_batch().await {
            Ok(Some(batch)) => {
                self.phase = UploadPhase::Uploading;
                let status = self.uploader.upload(&batch.data).await;

                if status.should_delete_batch() {
                    let name = batch.file.name().to_string();
                    if let Err(e) = self.handle.delete(batch.file).await {
                        error!("UPLOAD | Failed to delete uploaded batch {}: {}", name, e);
                    }
                    self.delay.decrease();
                } else {
                    debug!(
                        "UPLOAD | Keeping batch {} for a later attempt",
                        batch.file.name()
                    );
                    self.delay.increase_once();
                }
            }
            Ok(None) => {
                debug!("UPLOAD | No batch ready for upload");
            }
            Err(e) => {
                error!("UPLOAD | Unable to read next batch: {}", e);
            }
        }

        self.phase = UploadPhase::Waiting;
        self.delay.next_delay()
    }

    /// Runs upload cycles until `cancel` fires.
    ///
    /// The first cycle starts after the initial delay rather than immediately.
    pub async fn run(mut self, cancel: CancellationToken) {
        debug!("UPLOAD | Upload loop started");
        let mut wait = self.delay.next_delay();
        self.phase = UploadPhase::Waiting;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("UPLOAD | Upload loop cancelled");
                    break;
                }
                () = tokio::time::sleep(wait) => {
                    wait = self.run_cycle().await;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::AppContext;
    use crate::persistence::directory::Directory;
    use crate::persistence::orchestrator::{FilesOrchestrator, ReadConditions, WriteConditions};
    use crate::persistence::service::PersistenceService;
    use crate::persistence::writer::{EventWriter, FileWriter};
    use crate::time::ManualDateProvider;
    use crate::upload::request::{DataUploadUrl, HttpHeaders};
    use crate::upload::uploader::tests::{network_error, RecordingClient};
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use std::time::UNIX_EPOCH;
    use tempfile::TempDir;

    const DEFAULT: Duration = Duration::from_secs(5);
    const MIN: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(20);

    struct Fixture {
        _dir: TempDir,
        clock: Arc<ManualDateProvider>,
        handle: PersistenceHandle,
        thread: JoinHandle<()>,
        client: Arc<RecordingClient>,
        strategy: UploadStrategy,
    }

    impl Fixture {
        fn new(client: Arc<RecordingClient>) -> Self {
            let dir = TempDir::new().unwrap();
            let clock = Arc::new(ManualDateProvider::new(
                UNIX_EPOCH + Duration::from_secs(1_600_000_000),
            ));
            let orchestrator = FilesOrchestrator::new(
                Directory::new(dir.path()).unwrap(),
                WriteConditions {
                    max_file_size: 1_000,
                    max_directory_size: 10_000,
                    max_file_age_for_write: Duration::from_secs(4),
                    max_writes_per_file: 500,
                },
                ReadConditions {
                    min_file_age_for_read: Duration::from_secs(5),
                    max_file_age_for_read: Duration::from_secs(600),
                },
                clock.clone(),
            );
            let (service, handle) =
                PersistenceService::new(FileWriter::new(orchestrator, 100), 64);
            let thread = service.spawn().unwrap();
            let uploader = DataUploader::new(
                DataUploadUrl::new("https://api.example.com/v1/endpoint", "abc").unwrap(),
                HttpHeaders::new(&AppContext::default()),
                client.clone(),
            );
            let strategy = UploadStrategy::new(
                handle.clone(),
                uploader,
                UploadDelay::new(DEFAULT, MIN, MAX, 0.9),
            );
            Self {
                _dir: dir,
                clock,
                handle,
                thread,
                client,
                strategy,
            }
        }

        async fn write_readable_batch(&self, value: &'static str) {
            EventWriter::new(self.handle.clone()).write(value);
            self.handle.flush().await.unwrap();
            self.clock.advance(Duration::from_secs(5));
        }

        async fn stop(self) {
            self.handle.shutdown().await.unwrap();
            self.thread.join().unwrap();
        }
    }

    #[tokio::test]
    async fn test_no_batch_waits_current_delay_without_upload() {
        let mut fixture = Fixture::new(RecordingClient::responding(Ok(202)));

        assert_eq!(fixture.strategy.run_cycle().await, DEFAULT);
        assert_eq!(fixture.strategy.phase(), UploadPhase::Waiting);
        assert_eq!(fixture.client.request_count(), 0);

        fixture.stop().await;
    }

    #[tokio::test]
    async fn test_success_deletes_batch_and_decreases_delay() {
        let mut fixture = Fixture::new(RecordingClient::responding(Ok(202)));
        fixture.write_readable_batch("event").await;

        let next = fixture.strategy.run_cycle().await;

        assert!(next < DEFAULT && next >= MIN);
        assert_eq!(fixture.client.request_count(), 1);
        assert!(fixture.handle.read_next_batch().await.unwrap().is_none());
        fixture.stop().await;
    }

    #[tokio::test]
    async fn test_client_error_deletes_batch() {
        let mut fixture = Fixture::new(RecordingClient::responding(Ok(400)));
        fixture.write_readable_batch("event").await;

        fixture.strategy.run_cycle().await;

        assert!(fixture.handle.read_next_batch().await.unwrap().is_none());
        fixture.stop().await;
    }

    #[tokio::test]
    async fn test_server_error_retains_batch_and_backs_off_once() {
        let mut fixture = Fixture::new(RecordingClient::responding(Ok(500)));
        fixture.write_readable_batch("event").await;

        assert_eq!(fixture.strategy.run_cycle().await, MAX);
        let retained = fixture.handle.read_next_batch().await.unwrap().unwrap();
        assert!(retained.file.path().exists());
        assert_eq!(retained.data, br#""event""#.to_vec());

        // The retained batch is retried on the next cycle.
        fixture.client.set_response(Ok(202));
        let next = fixture.strategy.run_cycle().await;
        assert!(next < DEFAULT);
        assert_eq!(fixture.client.request_count(), 2);
        assert!(fixture.handle.read_next_batch().await.unwrap().is_none());

        fixture.stop().await;
    }

    #[tokio::test]
    async fn test_network_error_retains_batch() {
        let mut fixture = Fixture::new(RecordingClient::responding(Ok(503)));
        fixture.write_readable_batch("event").await;

        assert_eq!(fixture.strategy.run_cycle().await, MAX);
        fixture.client.set_response(Err(network_error()));
        assert_eq!(fixture.strategy.run_cycle().await, MAX);

        fixture.stop().await;
    }

    #[tokio::test]
    async fn test_backoff_returns_to_default_after_one_wait() {
        let mut fixture = Fixture::new(RecordingClient::responding(Ok(500)));
        fixture.write_readable_batch("event").await;
        assert_eq!(fixture.strategy.run_cycle().await, MAX);

        let batch = fixture.handle.read_next_batch().await.unwrap().unwrap();
        fixture.handle.delete(batch.file).await.unwrap();

        assert_eq!(fixture.strategy.run_cycle().await, DEFAULT);
        fixture.stop().await;
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let fixture = Fixture::new(RecordingClient::responding(Ok(202)));
        let cancel = CancellationToken::new();
        let Fixture {
            _dir,
            handle,
            thread,
            strategy,
            ..
        } = fixture;

        let task = tokio::spawn(strategy.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        task.await.unwrap();

        handle.shutdown().await.unwrap();
        thread.join().unwrap();
    }
}
