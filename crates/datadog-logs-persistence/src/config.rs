// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Configuration for the persistence and upload pipeline.
//!
//! Defaults mirror the limits of the mobile logs intake. Every value can be
//! overridden through `DD_LOGS_*` environment variables; durations are given
//! in milliseconds.
//!
//! | Variable | Field |
//! |---|---|
//! | `DD_LOGS_MAX_FILE_SIZE_BYTES` | `persistence.max_file_size_bytes` |
//! | `DD_LOGS_MAX_DIRECTORY_SIZE_BYTES` | `persistence.max_directory_size_bytes` |
//! | `DD_LOGS_MAX_FILE_AGE_FOR_WRITE_MS` | `persistence.max_file_age_for_write` |
//! | `DD_LOGS_MIN_FILE_AGE_FOR_READ_MS` | `persistence.min_file_age_for_read` |
//! | `DD_LOGS_MAX_FILE_AGE_FOR_READ_MS` | `persistence.max_file_age_for_read` |
//! | `DD_LOGS_MAX_WRITES_PER_FILE` | `persistence.max_writes_per_file` |
//! | `DD_LOGS_MAX_WRITE_SIZE` | `persistence.max_write_size` |
//! | `DD_LOGS_WRITE_QUEUE_CAPACITY` | `persistence.write_queue_capacity` |
//! | `DD_LOGS_DEFAULT_UPLOAD_DELAY_MS` | `upload.default_upload_delay` |
//! | `DD_LOGS_MIN_UPLOAD_DELAY_MS` | `upload.min_upload_delay` |
//! | `DD_LOGS_MAX_UPLOAD_DELAY_MS` | `upload.max_upload_delay` |
//! | `DD_LOGS_UPLOAD_DELAY_DECREASE_FACTOR` | `upload.upload_delay_decrease_factor` |
//! | `DD_LOGS_UPLOAD_REQUEST_TIMEOUT_MS` | `upload.upload_request_timeout` |
//! | `DD_PROXY_HTTPS` / `HTTPS_PROXY` | `upload.https_proxy` |

use crate::error::ConfigError;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const KIB: u64 = 1_024;
const MIB: u64 = 1_024 * KIB;

/// Limits applied to files on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceConfig {
    /// Upper bound for a single file.
    pub max_file_size_bytes: u64,
    /// Upper bound for the sum of all files in the directory.
    pub max_directory_size_bytes: u64,
    /// The current file stops receiving writes once it is older than this.
    pub max_file_age_for_write: Duration,
    /// Grace period before a file becomes eligible for upload.
    pub min_file_age_for_read: Duration,
    /// Files older than this are stale and get deleted instead of uploaded.
    pub max_file_age_for_read: Duration,
    /// The current file rotates after receiving this many writes.
    pub max_writes_per_file: u64,
    /// Largest encoded event accepted for writing.
    pub max_write_size: u64,
    /// Capacity of the queue between producers and the persistence thread.
    pub write_queue_capacity: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 4 * MIB,
            max_directory_size_bytes: 512 * MIB,
            max_file_age_for_write: Duration::from_millis(4_750),
            min_file_age_for_read: Duration::from_millis(5_000),
            max_file_age_for_read: Duration::from_secs(18 * 60 * 60),
            max_writes_per_file: 500,
            max_write_size: 256 * KIB,
            write_queue_capacity: 1_000,
        }
    }
}

/// Upload cadence and transport settings.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub default_upload_delay: Duration,
    pub min_upload_delay: Duration,
    pub max_upload_delay: Duration,
    /// Multiplier applied to the delay after each accepted upload, in `(0, 1)`.
    pub upload_delay_decrease_factor: f64,
    pub upload_request_timeout: Duration,
    pub https_proxy: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            default_upload_delay: Duration::from_secs(5),
            min_upload_delay: Duration::from_secs(1),
            max_upload_delay: Duration::from_secs(20),
            upload_delay_decrease_factor: 0.9,
            upload_request_timeout: Duration::from_secs(10),
            https_proxy: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub persistence: PersistenceConfig,
    pub upload: UploadConfig,
}

impl Config {
    /// Builds the configuration from defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let p = &mut config.persistence;
        p.max_file_size_bytes = env_or("DD_LOGS_MAX_FILE_SIZE_BYTES", p.max_file_size_bytes);
        p.max_directory_size_bytes =
            env_or("DD_LOGS_MAX_DIRECTORY_SIZE_BYTES", p.max_directory_size_bytes);
        p.max_file_age_for_write =
            env_millis_or("DD_LOGS_MAX_FILE_AGE_FOR_WRITE_MS", p.max_file_age_for_write);
        p.min_file_age_for_read =
            env_millis_or("DD_LOGS_MIN_FILE_AGE_FOR_READ_MS", p.min_file_age_for_read);
        p.max_file_age_for_read =
            env_millis_or("DD_LOGS_MAX_FILE_AGE_FOR_READ_MS", p.max_file_age_for_read);
        p.max_writes_per_file = env_or("DD_LOGS_MAX_WRITES_PER_FILE", p.max_writes_per_file);
        p.max_write_size = env_or("DD_LOGS_MAX_WRITE_SIZE", p.max_write_size);
        p.write_queue_capacity = env_or("DD_LOGS_WRITE_QUEUE_CAPACITY", p.write_queue_capacity);

        let u = &mut config.upload;
        u.default_upload_delay =
            env_millis_or("DD_LOGS_DEFAULT_UPLOAD_DELAY_MS", u.default_upload_delay);
        u.min_upload_delay = env_millis_or("DD_LOGS_MIN_UPLOAD_DELAY_MS", u.min_upload_delay);
        u.max_upload_delay = env_millis_or("DD_LOGS_MAX_UPLOAD_DELAY_MS", u.max_upload_delay);
        u.upload_delay_decrease_factor = env_or(
            "DD_LOGS_UPLOAD_DELAY_DECREASE_FACTOR",
            u.upload_delay_decrease_factor,
        );
        u.upload_request_timeout =
            env_millis_or("DD_LOGS_UPLOAD_REQUEST_TIMEOUT_MS", u.upload_request_timeout);
        u.https_proxy = env::var("DD_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok()
            .filter(|proxy| !proxy.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.persistence;
        if p.max_file_size_bytes == 0 || p.max_directory_size_bytes == 0 || p.max_write_size == 0
        {
            return Err(invalid("size limits must be greater than 0"));
        }
        // Leaves room for the separator written in front of every value but the first.
        if p.max_write_size >= p.max_file_size_bytes {
            return Err(invalid("max_write_size must be smaller than max_file_size_bytes"));
        }
        if p.max_file_size_bytes > p.max_directory_size_bytes {
            return Err(invalid(
                "max_file_size_bytes cannot exceed max_directory_size_bytes",
            ));
        }
        if p.max_writes_per_file == 0 || p.write_queue_capacity == 0 {
            return Err(invalid(
                "max_writes_per_file and write_queue_capacity must be greater than 0",
            ));
        }
        // A file still accepting writes must never be offered for upload.
        if p.min_file_age_for_read <= p.max_file_age_for_write {
            return Err(invalid(
                "min_file_age_for_read must be greater than max_file_age_for_write",
            ));
        }
        if p.min_file_age_for_read > p.max_file_age_for_read {
            return Err(invalid(
                "min_file_age_for_read cannot exceed max_file_age_for_read",
            ));
        }

        let u = &self.upload;
        if u.min_upload_delay.is_zero() {
            return Err(invalid("min_upload_delay must be greater than 0"));
        }
        if !(u.min_upload_delay <= u.default_upload_delay
            && u.default_upload_delay <= u.max_upload_delay)
        {
            return Err(invalid(
                "upload delays must satisfy min <= default <= max",
            ));
        }
        if !(u.upload_delay_decrease_factor > 0.0 && u.upload_delay_decrease_factor < 1.0) {
            return Err(invalid(&format!(
                "upload_delay_decrease_factor must be in (0, 1), got {}",
                u.upload_delay_decrease_factor
            )));
        }
        if u.upload_request_timeout.is_zero() {
            return Err(invalid("upload_request_timeout must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::InvalidConfig(message.to_string())
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            debug!("Ignoring unparsable value for {key}: {raw}");
            default
        }),
        Err(_) => default,
    }
}

fn env_millis_or(key: &str, default: Duration) -> Duration {
    Duration::from_millis(env_or(key, u64::try_from(default.as_millis()).unwrap_or(u64::MAX)))
}
