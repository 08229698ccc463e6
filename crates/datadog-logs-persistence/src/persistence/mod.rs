// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! On-disk buffering of encoded events.
//!
//! # Components
//!
//! - **[`file`]**: a single batch file named after its creation time
//! - **[`directory`]**: the flat directory holding batch files
//! - **[`orchestrator`]**: picks the writable and readable files, rotates and evicts
//! - **[`writer`]**: encodes events and appends them with `,` separators
//! - **[`service`]**: the single thread that owns the directory

pub mod directory;
pub mod file;
pub mod orchestrator;
pub mod service;
pub mod writer;

pub use directory::Directory;
pub use file::StoredFile;
pub use orchestrator::{FilesOrchestrator, ReadConditions, WriteConditions};
pub use service::{Batch, PersistenceHandle, PersistenceService};
pub use writer::{EventWriter, FileWriter};
