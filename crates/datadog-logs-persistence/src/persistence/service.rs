// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Single-threaded owner of the batch directory.
//!
//! Every file-system mutation (writes, rotation, eviction, reads for upload,
//! deletion) is a command processed in order by one dedicated thread. This
//! is what makes file locks unnecessary: only one actor ever touches the
//! directory.
//!
//! ```text
//!   EventWriter ──try_send──┐
//!                           v
//!                   ┌───────────────┐      ┌───────────────────┐
//!                   │ bounded queue │ ───> │ persistence thread│ ──> disk
//!                   └───────────────┘      └───────────────────┘
//!                           ^
//!   UploadStrategy ──send───┘ (read next batch / delete, replies via oneshot)
//! ```

use crate::error::PersistenceError;
use crate::persistence::file::StoredFile;
use crate::persistence::writer::FileWriter;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

pub(crate) type EncodeFn = Box<dyn FnOnce() -> serde_json::Result<Vec<u8>> + Send>;

/// A file picked for upload together with its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub file: StoredFile,
    pub data: Vec<u8>,
}

pub enum PersistenceCommand {
    Write(EncodeFn),
    ReadNextBatch(oneshot::Sender<Option<Batch>>),
    Delete {
        file: StoredFile,
        response_tx: oneshot::Sender<Result<(), PersistenceError>>,
    },
    /// Replies once every command queued before it has been processed.
    Flush(oneshot::Sender<()>),
    Shutdown,
}

impl fmt::Debug for PersistenceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write(_) => write!(f, "Write"),
            Self::ReadNextBatch(_) => write!(f, "ReadNextBatch"),
            Self::Delete { file, .. } => write!(f, "Delete({})", file.name()),
            Self::Flush(_) => write!(f, "Flush"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

#[derive(Clone)]
pub struct PersistenceHandle {
    tx: mpsc::Sender<PersistenceCommand>,
    dropped_events: Arc<AtomicU64>,
}

impl fmt::Debug for PersistenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PersistenceHandle")
    }
}

impl PersistenceHandle {
    /// Queues a write without blocking. A full queue drops the event.
    pub(crate) fn write(&self, encode: EncodeFn) {
        match self.tx.try_send(PersistenceCommand::Write(encode)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("PERSISTENCE | Write queue is full, dropping event");
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Closed(_)) => {
                error!("PERSISTENCE | Persistence service stopped, dropping event");
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Picks the oldest readable file and loads its contents.
    pub async fn read_next_batch(&self) -> Result<Option<Batch>, PersistenceError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(PersistenceCommand::ReadNextBatch(response_tx))
            .await?;
        response_rx
            .await
            .map_err(|_| PersistenceError::ServiceUnavailable)
    }

    pub async fn delete(&self, file: StoredFile) -> Result<(), PersistenceError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(PersistenceCommand::Delete { file, response_tx })
            .await?;
        response_rx
            .await
            .map_err(|_| PersistenceError::ServiceUnavailable)?
    }

    /// Waits until every write queued so far has reached the disk.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(PersistenceCommand::Flush(response_tx)).await?;
        response_rx
            .await
            .map_err(|_| PersistenceError::ServiceUnavailable)
    }

    /// Stops the service after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), PersistenceError> {
        self.send(PersistenceCommand::Shutdown).await
    }

    async fn send(&self, command: PersistenceCommand) -> Result<(), PersistenceError> {
        self.tx.send(command).await.map_err(|e| {
            debug!("PERSISTENCE | Failed to send command {:?}", e.0);
            PersistenceError::ServiceUnavailable
        })
    }
}

pub struct PersistenceService {
    writer: FileWriter,
    rx: mpsc::Receiver<PersistenceCommand>,
}

impl PersistenceService {
    pub fn new(writer: FileWriter, queue_capacity: usize) -> (Self, PersistenceHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let handle = PersistenceHandle {
            tx,
            dropped_events: writer.dropped_events(),
        };
        (Self { writer, rx }, handle)
    }

    /// Runs the service on its own OS thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("dd-logs-persistence".to_string())
            .spawn(move || self.run())
    }

    /// Processes commands until shutdown or until every handle is dropped.
    ///
    /// Blocks the calling thread; must not be called from within an async task.
    pub fn run(mut self) {
        debug!("PERSISTENCE | Service started");

        while let Some(command) = self.rx.blocking_recv() {
            match command {
                PersistenceCommand::Write(encode) => {
                    self.writer.write_with(encode);
                }
                PersistenceCommand::ReadNextBatch(response_tx) => {
                    let batch = self.read_next_batch();
                    if response_tx.send(batch).is_err() {
                        debug!("PERSISTENCE | Batch requester went away");
                    }
                }
                PersistenceCommand::Delete { file, response_tx } => {
                    let result = self.writer.orchestrator_mut().delete(&file);
                    if let Err(e) = &result {
                        error!("PERSISTENCE | Failed to delete file {}: {}", file.name(), e);
                    }
                    if response_tx.send(result).is_err() {
                        debug!("PERSISTENCE | Delete requester went away");
                    }
                }
                PersistenceCommand::Flush(response_tx) => {
                    if response_tx.send(()).is_err() {
                        debug!("PERSISTENCE | Flush requester went away");
                    }
                }
                PersistenceCommand::Shutdown => {
                    debug!("PERSISTENCE | Service shutting down");
                    break;
                }
            }
        }

        self.discard_remaining();
        debug!("PERSISTENCE | Service stopped");
    }

    /// Closes the queue and accounts for writes that arrived after shutdown.
    ///
    /// Pending requests are answered by dropping their reply channel.
    fn discard_remaining(&mut self) {
        self.rx.close();
        let mut discarded = 0;
        while let Ok(command) = self.rx.try_recv() {
            if let PersistenceCommand::Write(_) = command {
                discarded += 1;
            }
        }
        if discarded > 0 {
            warn!(
                "PERSISTENCE | Dropping {} events queued after shutdown",
                discarded
            );
            self.writer
                .dropped_events()
                .fetch_add(discarded, Ordering::Relaxed);
        }
    }

    fn read_next_batch(&mut self) -> Option<Batch> {
        let file = self.writer.orchestrator_mut().get_readable_file()?;
        match file.read() {
            Ok(data) => Some(Batch { file, data }),
            Err(e) => {
                error!("PERSISTENCE | Failed to read file {}: {}", file.name(), e);
                None
            }
        }
    }
}
