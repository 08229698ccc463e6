// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A single batch file on disk.
//!
//! The file name is its creation time in milliseconds since the Unix epoch,
//! so the directory listing alone is enough to order files and compute ages.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    path: PathBuf,
    name: String,
    created_at: SystemTime,
}

impl StoredFile {
    /// Returns `None` for paths whose name does not encode a creation time.
    pub(crate) fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let created_at = creation_time_from(&name)?;
        Some(Self {
            path,
            name,
            created_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Age relative to `now`. Files "from the future" (clock moved back) are treated as new.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.created_at).unwrap_or(Duration::ZERO)
    }

    pub fn size(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.size()? == 0)
    }

    /// Appends all chunks with a single write call.
    ///
    /// If the write fails midway the file is truncated back to its previous
    /// length, so readers never observe a partial value.
    pub fn append(&self, chunks: &[&[u8]]) -> io::Result<()> {
        let buffer = chunks.concat();
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let previous_len = file.metadata()?.len();

        if let Err(e) = file.write_all(&buffer).and_then(|()| file.flush()) {
            if let Err(truncate_err) = file.set_len(previous_len) {
                warn!(
                    "PERSISTENCE | Failed to roll back partial write to {}: {}",
                    self.name, truncate_err
                );
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Deleting a file that is already gone succeeds.
    pub fn delete(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

pub(crate) fn file_name_from(created_at: SystemTime) -> String {
    millis_since_epoch(created_at).to_string()
}

pub(crate) fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub(crate) fn creation_time_from(name: &str) -> Option<SystemTime> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let millis: u64 = name.parse().ok()?;
    UNIX_EPOCH.checked_add(Duration::from_millis(millis))
}
