// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of persisted batches to the logs intake.
//!
//! # Components
//!
//! - **[`request`]**: upload URL, headers and JSON array framing
//! - **[`http_client`]**: transport seam and its reqwest implementation
//! - **[`uploader`]**: one attempt per batch, classified into an [`UploadStatus`]
//! - **[`delay`]**: adaptive interval between attempts
//! - **[`strategy`]**: the loop tying reads, uploads, deletions and delays together

pub mod delay;
pub mod http_client;
pub mod request;
pub mod status;
pub mod strategy;
pub mod uploader;

pub use delay::UploadDelay;
pub use http_client::{HttpClient, ReqwestHttpClient};
pub use request::{DataUploadUrl, HttpHeaders, UploadRequest};
pub use status::UploadStatus;
pub use strategy::{UploadPhase, UploadStrategy};
pub use uploader::DataUploader;
