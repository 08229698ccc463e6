// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::persistence::file::StoredFile;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A flat directory of batch files. No index is kept: every listing is read
/// from the file system.
#[derive(Debug, Clone)]
pub struct Directory {
    path: PathBuf,
}

impl Directory {
    /// Opens `path`, creating it (and its parents) when missing.
    pub fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lists batch files, skipping sub-directories, entries that cannot be
    /// inspected and names that do not encode a creation time.
    pub fn files(&self) -> io::Result<Vec<StoredFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("PERSISTENCE | Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    debug!(
                        "PERSISTENCE | Skipping {}: {}",
                        entry.path().display(),
                        e
                    );
                    continue;
                }
            }
            if let Some(file) = StoredFile::from_path(entry.path()) {
                files.push(file);
            }
        }
        Ok(files)
    }

    pub fn file(&self, name: &str) -> Option<StoredFile> {
        let path = self.path.join(name);
        if path.is_file() {
            StoredFile::from_path(path)
        } else {
            None
        }
    }

    /// Creates an empty file. Fails if a file with that name already exists.
    pub fn create_file(&self, name: &str) -> io::Result<StoredFile> {
        let file = StoredFile::from_path(self.path.join(name)).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("`{name}` is not a valid batch file name"),
            )
        })?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(file.path())?;
        Ok(file)
    }
}
