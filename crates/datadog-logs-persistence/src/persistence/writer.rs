// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Appending encoded events to batch files.
//!
//! A batch file holds the interior of a JSON array: values separated by `,`
//! with no enclosing brackets. The uploader adds `[` and `]` when it builds
//! the request body, so a file can always be appended to without rewriting.
//!
//! ```text
//!   empty file:      {"a":1}
//!   after 2 writes:  {"a":1},{"b":2}
//! ```

use crate::error::PersistenceError;
use crate::persistence::orchestrator::FilesOrchestrator;
use crate::persistence::service::PersistenceHandle;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, warn};

/// Written between two consecutive values in a file.
pub const SEPARATOR: &[u8] = b",";

/// Encodes values and appends them to the orchestrator's writable file.
///
/// Not thread safe on its own; it is owned by the persistence service thread.
#[derive(Debug)]
pub struct FileWriter {
    orchestrator: FilesOrchestrator,
    max_write_size: u64,
    dropped_events: Arc<AtomicU64>,
}

impl FileWriter {
    pub fn new(orchestrator: FilesOrchestrator, max_write_size: u64) -> Self {
        Self {
            orchestrator,
            max_write_size,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn orchestrator(&self) -> &FilesOrchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut FilesOrchestrator {
        &mut self.orchestrator
    }

    pub(crate) fn dropped_events(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped_events)
    }

    /// Encodes `value` and appends it. Failures are logged and counted, never returned.
    pub fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> bool {
        self.write_with(|| serde_json::to_vec(value))
    }

    /// Same as [`FileWriter::write`] with the encoding deferred to `encode`.
    pub fn write_with<F>(&mut self, encode: F) -> bool
    where
        F: FnOnce() -> serde_json::Result<Vec<u8>>,
    {
        let result = encode()
            .map_err(PersistenceError::from)
            .and_then(|data| self.append(&data));

        match result {
            Ok(()) => true,
            Err(e) => {
                match &e {
                    PersistenceError::EventTooLarge { .. }
                    | PersistenceError::WriteSizeExceedsSingleFileLimit { .. } => {
                        warn!("PERSISTENCE | Skipping write: {}", e);
                    }
                    _ => error!("PERSISTENCE | Failed to write event: {}", e),
                }
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    fn append(&mut self, data: &[u8]) -> Result<(), PersistenceError> {
        let size = data.len() as u64;
        if size > self.max_write_size {
            return Err(PersistenceError::EventTooLarge {
                size,
                limit: self.max_write_size,
            });
        }

        // Reserve room for the separator so the file and directory limits hold
        // whichever file is picked.
        let file = self
            .orchestrator
            .get_writable_file(size + SEPARATOR.len() as u64)?;

        if file.is_empty()? {
            file.append(&[data])?;
        } else {
            file.append(&[SEPARATOR, data])?;
        }
        Ok(())
    }
}

/// Producer-facing entry point. Cheap to clone and never blocks.
///
/// Encoding and appending happen on the persistence service thread, so
/// concurrent callers are strictly ordered and never interleave.
#[derive(Debug, Clone)]
pub struct EventWriter {
    handle: PersistenceHandle,
}

impl EventWriter {
    pub fn new(handle: PersistenceHandle) -> Self {
        Self { handle }
    }

    pub fn write<T>(&self, value: T)
    where
        T: Serialize + Send + 'static,
    {
        self.handle
            .write(Box::new(move || serde_json::to_vec(&value)));
    }

    /// Number of events dropped so far (queue full, oversized, encoding or I/O failure).
    pub fn dropped_events(&self) -> u64 {
        self.handle.dropped_events()
    }
}
