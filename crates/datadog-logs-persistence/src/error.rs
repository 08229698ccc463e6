// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;

/// Errors raised while validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that can occur while persisting or reading events on disk.
///
/// None of these ever reach the producer: the persistence service logs them
/// and moves on to the next command.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Write of {size} bytes exceeds the single file limit of {limit} bytes")]
    WriteSizeExceedsSingleFileLimit { size: u64, limit: u64 },

    #[error("Encoded event of {size} bytes exceeds the maximum write size of {limit} bytes")]
    EventTooLarge { size: u64, limit: u64 },

    #[error("Failed to encode event: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("File system failure: {0}")]
    FileSystem(#[from] io::Error),

    #[error("Persistence service is not running")]
    ServiceUnavailable,
}

/// Usage errors when building the upload URL.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UploadUrlError {
    #[error("`client_token` cannot be empty")]
    EmptyClientToken,

    #[error("`endpoint_url` cannot be empty")]
    EmptyEndpointUrl,

    #[error("`endpoint_url` is not a valid URL: {0}")]
    InvalidEndpointUrl(String),
}

/// A request that never produced an HTTP response.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub is_timeout: bool,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError {
            is_timeout: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// Errors preventing the logs feature from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    UploadUrl(#[from] UploadUrlError),

    #[error("Failed to prepare persistence: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] TransportError),
}
