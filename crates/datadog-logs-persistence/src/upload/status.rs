// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Outcome of a single upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    /// 2xx
    Success,
    /// 3xx
    Redirection,
    /// 4xx: the payload is not acceptable, retrying would not help.
    ClientError,
    /// 5xx
    ServerError,
    /// No response at all (connection failure, timeout).
    NetworkError,
    /// Anything outside 200..=599.
    Unknown(i32),
}

impl UploadStatus {
    pub fn from_status_code(code: i32) -> Self {
        match code {
            200..=299 => Self::Success,
            300..=399 => Self::Redirection,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            other => Self::Unknown(other),
        }
    }

    /// Whether the batch should be deleted after this outcome.
    ///
    /// Only transient failures keep the batch on disk for another attempt.
    pub fn should_delete_batch(self) -> bool {
        matches!(self, Self::Success | Self::Redirection | Self::ClientError)
    }
}

impl<E> From<Result<u16, E>> for UploadStatus {
    fn from(result: Result<u16, E>) -> Self {
        match result {
            Ok(code) => Self::from_status_code(i32::from(code)),
            Err(_) => Self::NetworkError,
        }
    }
}
