// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Datadog Logs Persistence
//!
//! Disk-buffered delivery of log events to the Datadog mobile logs intake.
//!
//! Producers hand events to an [`EventWriter`] and return immediately. A
//! single persistence thread appends them to time-named batch files, rotating
//! and evicting files to stay within size and age limits. An upload loop
//! periodically picks the oldest readable batch, sends it as a JSON array and
//! deletes it once the intake has accepted (or definitively refused) it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use datadog_logs_persistence::{Config, LogsFeature};
//!
//! let feature = LogsFeature::builder("/var/cache/dd-logs", "https://mobile-http-intake.logs.datadoghq.com/v1/input", "pub0123")
//!     .config(Config::from_env()?)
//!     .start()?;
//!
//! feature.logger("checkout", "main").info("payment accepted");
//! feature.shutdown().await;
//! ```

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

/// Limits, delays and their environment overrides
pub mod config;

/// Host application, device and network context
pub mod context;

pub mod error;

/// Start-up and shutdown of the whole pipeline
pub mod feature;

/// `DD_LOGS` prefixed tracing output
pub mod logger;

/// The log event model
pub mod logs;

pub mod persistence;

pub mod time;

pub mod upload;

pub use config::{Config, PersistenceConfig, UploadConfig};
pub use context::{AppContext, DeviceContext, MobileDevice};
pub use error::{ConfigError, PersistenceError, StartError, TransportError, UploadUrlError};
pub use feature::{LogsFeature, LogsFeatureBuilder, Logger};
pub use logs::{Log, LogStatus};
pub use persistence::EventWriter;
pub use upload::{HttpClient, UploadStatus};
