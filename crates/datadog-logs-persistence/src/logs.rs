// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log event model.
//!
//! Field order is fixed by the struct definition and dates are always
//! rendered as UTC ISO-8601 with millisecond precision, so the same log
//! always encodes to the same bytes.

use crate::context::{AppContext, NetworkConnectionInfo, NetworkConnectionInfoProvider};
use crate::time::DateProvider;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::sync::Arc;

pub const LOGGER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Debug,
    Info,
    Notice,
    Warn,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Log {
    #[serde(serialize_with = "serialize_iso8601")]
    pub date: DateTime<Utc>,
    pub status: LogStatus,
    pub message: String,
    pub service: String,
    #[serde(rename = "logger.name")]
    pub logger_name: String,
    #[serde(rename = "logger.version")]
    pub logger_version: String,
    #[serde(rename = "application.version", skip_serializing_if = "Option::is_none")]
    pub application_version: Option<String>,
    #[serde(rename = "network.client", skip_serializing_if = "Option::is_none")]
    pub network_connection_info: Option<NetworkConnectionInfo>,
}

fn serialize_iso8601<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Stamps logs with the current date and the shared context.
#[derive(Debug, Clone)]
pub struct LogBuilder {
    service: String,
    logger_name: String,
    app_context: AppContext,
    date_provider: Arc<dyn DateProvider>,
    network_info_provider: Option<Arc<dyn NetworkConnectionInfoProvider>>,
}

impl LogBuilder {
    pub fn new(
        service: impl Into<String>,
        logger_name: impl Into<String>,
        app_context: AppContext,
        date_provider: Arc<dyn DateProvider>,
    ) -> Self {
        Self {
            service: service.into(),
            logger_name: logger_name.into(),
            app_context,
            date_provider,
            network_info_provider: None,
        }
    }

    #[must_use]
    pub fn with_network_info_provider(
        mut self,
        provider: Arc<dyn NetworkConnectionInfoProvider>,
    ) -> Self {
        self.network_info_provider = Some(provider);
        self
    }

    pub fn create(&self, status: LogStatus, message: impl Into<String>) -> Log {
        Log {
            date: DateTime::<Utc>::from(self.date_provider.now()),
            status,
            message: message.into(),
            service: self.service.clone(),
            logger_name: self.logger_name.clone(),
            logger_version: LOGGER_VERSION.to_string(),
            application_version: self.app_context.bundle_version.clone(),
            network_connection_info: self
                .network_info_provider
                .as_ref()
                .and_then(|provider| provider.current()),
        }
    }
}
