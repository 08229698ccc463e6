// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::upload::http_client::HttpClient;
use crate::upload::request::{DataUploadUrl, HttpHeaders, UploadRequest};
use crate::upload::status::UploadStatus;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends batches to the intake and classifies the outcome.
///
/// Performs exactly one attempt per call; retry policy belongs to the caller.
#[derive(Clone)]
pub struct DataUploader {
    url: DataUploadUrl,
    headers: HttpHeaders,
    client: Arc<dyn HttpClient>,
}

impl fmt::Debug for DataUploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUploader")
            .field("url", &self.url.url().as_str())
            .finish_non_exhaustive()
    }
}

impl DataUploader {
    pub fn new(url: DataUploadUrl, headers: HttpHeaders, client: Arc<dyn HttpClient>) -> Self {
        Self {
            url,
            headers,
            client,
        }
    }

    pub async fn upload(&self, data: &[u8]) -> UploadStatus {
        let request = UploadRequest::new(&self.url, &self.headers, data);
        let body_size = request.body.len();

        let status = match self.client.send(request).await {
            Ok(code) => UploadStatus::from_status_code(i32::from(code)),
            Err(e) => {
                warn!(
                    "UPLOAD | Failed to send request (timeout: {}): {}",
                    e.is_timeout, e.message
                );
                UploadStatus::NetworkError
            }
        };

        match status {
            UploadStatus::Success => {
                debug!("UPLOAD | Uploaded batch of {} bytes", body_size);
            }
            UploadStatus::Redirection | UploadStatus::ClientError => {
                warn!(
                    "UPLOAD | Batch of {} bytes rejected with {:?}, dropping it",
                    body_size, status
                );
            }
            UploadStatus::ServerError | UploadStatus::NetworkError | UploadStatus::Unknown(_) => {
                debug!(
                    "UPLOAD | Batch of {} bytes not delivered ({:?}), will retry",
                    body_size, status
                );
            }
        }
        status
    }
}
