// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport used by the uploader.
//!
//! The [`HttpClient`] trait is the seam between upload logic and the network:
//! production code uses [`ReqwestHttpClient`], tests substitute their own.

use crate::config::UploadConfig;
use crate::error::TransportError;
use crate::upload::request::UploadRequest;
use async_trait::async_trait;
use tracing::{debug, error};

/// Sends a single request and reports the response status code.
///
/// `Err` means no response was received at all.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: UploadRequest) -> Result<u16, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Builds a client with the configured timeout and proxy.
    ///
    /// An invalid proxy is logged and the client is built without it, so
    /// uploads keep working with a misconfigured environment. Redirects are
    /// never followed: a 3xx is reported to the caller as is.
    pub fn new(config: &UploadConfig) -> Result<Self, TransportError> {
        let client = match build_client(config) {
            Ok(client) => client,
            Err(e) => {
                error!(
                    "UPLOAD | Unable to parse proxy configuration: {}, no proxy will be used",
                    e
                );
                client_builder(config).build()?
            }
        };
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn client_builder(config: &UploadConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(config.upload_request_timeout)
        .redirect(reqwest::redirect::Policy::none())
}

fn build_client(config: &UploadConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = client_builder(config);
    if let Some(https_proxy) = &config.https_proxy {
        debug!("UPLOAD | Using HTTPS proxy {}", https_proxy);
        builder = builder.proxy(reqwest::Proxy::https(https_proxy)?);
    }
    builder.build()
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, request: UploadRequest) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }
}
