// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request construction: target URL, headers and body framing.

use crate::context::{AppContext, DeviceContext};
use crate::error::UploadUrlError;
use crate::logs::LOGGER_VERSION;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Url;
use tracing::warn;

/// Platform token reported in the `User-Agent` header.
const USER_AGENT_PLATFORM: &str = "CFNetwork";

/// `<endpoint_url>/<client_token>?ddsource=mobile`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUploadUrl {
    url: Url,
}

impl DataUploadUrl {
    pub fn new(endpoint_url: &str, client_token: &str) -> Result<Self, UploadUrlError> {
        if client_token.is_empty() {
            return Err(UploadUrlError::EmptyClientToken);
        }
        if endpoint_url.is_empty() {
            return Err(UploadUrlError::EmptyEndpointUrl);
        }
        let endpoint = endpoint_url.trim_end_matches('/');
        let url = Url::parse(&format!("{endpoint}/{client_token}?ddsource=mobile"))
            .map_err(|e| UploadUrlError::InvalidEndpointUrl(e.to_string()))?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Headers sent with every upload.
#[derive(Debug, Clone)]
pub struct HttpHeaders {
    headers: HeaderMap,
}

impl HttpHeaders {
    pub fn new(app_context: &AppContext) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(user_agent) = user_agent(app_context) {
            match HeaderValue::from_str(&user_agent) {
                Ok(value) => {
                    headers.insert(USER_AGENT, value);
                }
                Err(e) => warn!("UPLOAD | Omitting invalid User-Agent {:?}: {}", user_agent, e),
            }
        }
        Self { headers }
    }

    pub fn as_map(&self) -> &HeaderMap {
        &self.headers
    }
}

fn user_agent(app_context: &AppContext) -> Option<String> {
    let DeviceContext::Present(device) = &app_context.device else {
        return None;
    };
    let name = app_context.executable_name.as_deref().unwrap_or("Datadog");
    let version = app_context
        .bundle_version
        .as_deref()
        .unwrap_or(LOGGER_VERSION);
    Some(format!(
        "{name}/{version} {USER_AGENT_PLATFORM} ({}; {}/{})",
        device.model, device.os_name, device.os_version
    ))
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl UploadRequest {
    /// Wraps the comma-joined batch in `[` `]` to form a JSON array body.
    pub fn new(url: &DataUploadUrl, headers: &HttpHeaders, batch: &[u8]) -> Self {
        let mut body = Vec::with_capacity(batch.len() + 2);
        body.push(b'[');
        body.extend_from_slice(batch);
        body.push(b']');
        Self {
            url: url.url().clone(),
            headers: headers.as_map().clone(),
            body,
        }
    }
}
