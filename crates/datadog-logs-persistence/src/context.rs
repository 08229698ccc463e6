// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Host application and device context.
//!
//! These values come from the embedding application. They only decorate
//! outgoing requests and events; none of them drive control flow.

use serde::Serialize;
use std::fmt::Debug;

/// Describes the device the application runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileDevice {
    pub model: String,
    pub os_name: String,
    pub os_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceContext {
    Present(MobileDevice),
    #[default]
    Absent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppContext {
    pub executable_name: Option<String>,
    pub bundle_version: Option<String>,
    pub device: DeviceContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Yes,
    Maybe,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkInterface {
    Wifi,
    WiredEthernet,
    Cellular,
    Loopback,
    Other,
}

/// Snapshot of network reachability, attached to each log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConnectionInfo {
    pub reachability: Reachability,
    pub available_interfaces: Vec<NetworkInterface>,
    pub supports_ipv4: bool,
    pub supports_ipv6: bool,
    pub is_expensive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_constrained: Option<bool>,
}

/// Source of network reachability data. Platform monitors implement this.
pub trait NetworkConnectionInfoProvider: Send + Sync + Debug {
    fn current(&self) -> Option<NetworkConnectionInfo>;
}

/// Provider returning a fixed value, or nothing when reachability is unknown.
#[derive(Debug, Clone, Default)]
pub struct StaticNetworkConnectionInfoProvider {
    info: Option<NetworkConnectionInfo>,
}

impl StaticNetworkConnectionInfoProvider {
    pub fn new(info: Option<NetworkConnectionInfo>) -> Self {
        Self { info }
    }
}

impl NetworkConnectionInfoProvider for StaticNetworkConnectionInfoProvider {
    fn current(&self) -> Option<NetworkConnectionInfo> {
        self.info.clone()
    }
}
