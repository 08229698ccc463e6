// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decides which file receives new writes and which file is ready for upload.
//!
//! # Policies
//!
//! - **Rotation**: the current file is replaced once it is older than
//!   `max_file_age_for_write`, cannot fit the next write, or has received
//!   `max_writes_per_file` writes.
//! - **Grace period**: a file is only readable once it is at least
//!   `min_file_age_for_read` old and no longer eligible for writes.
//! - **Eviction**: before every write, files older than `max_file_age_for_read`
//!   are deleted, then the oldest files go until the directory (including the
//!   pending write) fits in `max_directory_size_bytes`.
//!
//! The orchestrator holds no lock. It must only be driven from the
//! persistence service thread, which serializes all access to the directory.

use crate::config::PersistenceConfig;
use crate::error::PersistenceError;
use crate::persistence::directory::Directory;
use crate::persistence::file::{file_name_from, millis_since_epoch, StoredFile};
use crate::time::DateProvider;
use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteConditions {
    pub max_file_size: u64,
    pub max_directory_size: u64,
    pub max_file_age_for_write: Duration,
    pub max_writes_per_file: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadConditions {
    pub min_file_age_for_read: Duration,
    pub max_file_age_for_read: Duration,
}

impl From<&PersistenceConfig> for WriteConditions {
    fn from(config: &PersistenceConfig) -> Self {
        Self {
            max_file_size: config.max_file_size_bytes,
            max_directory_size: config.max_directory_size_bytes,
            max_file_age_for_write: config.max_file_age_for_write,
            max_writes_per_file: config.max_writes_per_file,
        }
    }
}

impl From<&PersistenceConfig> for ReadConditions {
    fn from(config: &PersistenceConfig) -> Self {
        Self {
            min_file_age_for_read: config.min_file_age_for_read,
            max_file_age_for_read: config.max_file_age_for_read,
        }
    }
}

#[derive(Debug)]
struct CurrentFile {
    name: String,
    uses: u64,
}

#[derive(Debug)]
pub struct FilesOrchestrator {
    directory: Directory,
    write_conditions: WriteConditions,
    read_conditions: ReadConditions,
    date_provider: Arc<dyn DateProvider>,
    current: Option<CurrentFile>,
    last_created_millis: Option<u64>,
}

impl FilesOrchestrator {
    pub fn new(
        directory: Directory,
        write_conditions: WriteConditions,
        read_conditions: ReadConditions,
        date_provider: Arc<dyn DateProvider>,
    ) -> Self {
        Self {
            directory,
            write_conditions,
            read_conditions,
            date_provider,
            current: None,
            last_created_millis: None,
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn write_conditions(&self) -> &WriteConditions {
        &self.write_conditions
    }

    /// Returns the file that should receive the next `write_size` bytes.
    pub fn get_writable_file(&mut self, write_size: u64) -> Result<StoredFile, PersistenceError> {
        if write_size > self.write_conditions.max_file_size {
            return Err(PersistenceError::WriteSizeExceedsSingleFileLimit {
                size: write_size,
                limit: self.write_conditions.max_file_size,
            });
        }

        let now = self.date_provider.now();
        self.purge_directory(write_size, now)?;

        if let Some(file) = self.reuse_current_file(write_size, now) {
            if let Some(current) = self.current.as_mut() {
                current.uses += 1;
            }
            return Ok(file);
        }

        let file = self.create_file(now)?;
        debug!("PERSISTENCE | Created new writable file {}", file.name());
        self.current = Some(CurrentFile {
            name: file.name().to_string(),
            uses: 1,
        });
        Ok(file)
    }

    /// Returns the oldest file that is old enough to upload, if any.
    ///
    /// Stale files encountered on the way are deleted.
    pub fn get_readable_file(&mut self) -> Option<StoredFile> {
        let files = match self.sorted_files() {
            Ok(files) => files,
            Err(e) => {
                error!("PERSISTENCE | Failed to list files for reading: {}", e);
                return None;
            }
        };
        let now = self.date_provider.now();

        for file in files {
            let age = file.age(now);
            if age > self.read_conditions.max_file_age_for_read {
                debug!("PERSISTENCE | Deleting stale file {}", file.name());
                self.delete_or_warn(&file);
                continue;
            }
            if self.is_current(&file) && age <= self.write_conditions.max_file_age_for_write {
                continue;
            }
            // Files are sorted oldest first: if this one is too young, so are the rest.
            if age < self.read_conditions.min_file_age_for_read {
                return None;
            }
            return Some(file);
        }
        None
    }

    /// Removes `file`. A file that is already gone counts as deleted.
    pub fn delete(&mut self, file: &StoredFile) -> Result<(), PersistenceError> {
        file.delete()?;
        if self.is_current(file) {
            self.current = None;
        }
        Ok(())
    }

    /// Total size of the managed files, in bytes.
    pub fn directory_size(&self) -> io::Result<u64> {
        Ok(self
            .directory
            .files()?
            .iter()
            .filter_map(|file| file.size().ok())
            .sum())
    }

    fn is_current(&self, file: &StoredFile) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.name == file.name())
    }

    fn reuse_current_file(&self, write_size: u64, now: SystemTime) -> Option<StoredFile> {
        let current = self.current.as_ref()?;
        let file = self.directory.file(&current.name)?;
        let size = file.size().ok()?;

        let is_recent_enough = file.age(now) <= self.write_conditions.max_file_age_for_write;
        let has_room = size + write_size <= self.write_conditions.max_file_size;
        let has_uses_left = current.uses < self.write_conditions.max_writes_per_file;

        (is_recent_enough && has_room && has_uses_left).then_some(file)
    }

    fn create_file(&mut self, now: SystemTime) -> Result<StoredFile, PersistenceError> {
        // Names must be unique and increasing even when two files are created
        // within the same millisecond.
        let mut millis = millis_since_epoch(now);
        if let Some(last) = self.last_created_millis {
            millis = millis.max(last + 1);
        }
        loop {
            let name = file_name_from(UNIX_EPOCH + Duration::from_millis(millis));
            match self.directory.create_file(&name) {
                Ok(file) => {
                    self.last_created_millis = Some(millis);
                    return Ok(file);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => millis += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn sorted_files(&self) -> io::Result<Vec<StoredFile>> {
        let mut files = self.directory.files()?;
        files.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.name().cmp(b.name()))
        });
        Ok(files)
    }

    /// Deletes stale files, then the oldest ones until `pending_write` bytes fit
    /// under the directory quota.
    fn purge_directory(&mut self, pending_write: u64, now: SystemTime) -> Result<(), PersistenceError> {
        let mut files_with_size = Vec::new();
        for file in self.sorted_files()? {
            if file.age(now) > self.read_conditions.max_file_age_for_read {
                debug!("PERSISTENCE | Evicting stale file {}", file.name());
                self.delete_or_warn(&file);
                continue;
            }
            // A file that vanished between listing and stat no longer counts.
            if let Ok(size) = file.size() {
                files_with_size.push((file, size));
            }
        }

        let mut total: u64 = files_with_size.iter().map(|(_, size)| size).sum();
        let quota = self.write_conditions.max_directory_size;
        if total + pending_write <= quota {
            return Ok(());
        }

        debug!(
            "PERSISTENCE | Directory holds {} bytes, over the {} bytes quota; evicting oldest files",
            total, quota
        );
        for (file, size) in files_with_size {
            if total + pending_write <= quota {
                break;
            }
            if self.delete_or_warn(&file) {
                total -= size;
            }
        }
        Ok(())
    }

    fn delete_or_warn(&mut self, file: &StoredFile) -> bool {
        match self.delete(file) {
            Ok(()) => true,
            Err(e) => {
                warn!("PERSISTENCE | Failed to evict file {}: {}", file.name(), e);
                false
            }
        }
    }
}
