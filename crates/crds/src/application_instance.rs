//! ApplicationInstance Custom Resource Definition
//!
//! A running instance of an onboarded application in one zone. The partner
//! installs instances asynchronously, so guest instances are polled until the
//! partner reports them ready and publishes their access points.

use crate::phase::Phase;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ApplicationInstanceSpec defines the desired state of an instance
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "opg.ewbi.nby.one",
    version = "v1beta1",
    kind = "ApplicationInstance",
    namespaced,
    status = "ApplicationInstanceStatus",
    shortname = "appinst"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInstanceSpec {
    /// Application provider owning the instance
    #[serde(default)]
    pub app_provider_id: String,

    /// Onboarded application id at the partner
    #[serde(default)]
    pub app_id: String,

    /// Application version to install
    #[serde(default)]
    pub app_version: String,

    /// Target zone
    #[serde(default)]
    pub zone_info: ZoneInfo,

    /// Link the partner posts instance status to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_back_link: Option<String>,
}

/// Placement of an instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZoneInfo {
    /// Zone identifier
    #[serde(default)]
    pub zone_id: String,
    /// Flavour identifier
    #[serde(default)]
    pub flavour_id: String,
    /// RESERVED_RES_SHALL, RESERVED_RES_PREFER or RESERVED_RES_AVOID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_consumption: Option<String>,
    /// Reserved resource pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub res_pool: Option<String>,
}

/// Lifecycle state of an instance at the partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ApplicationInstanceState {
    /// Installing
    Pending,
    /// Running
    Ready,
    /// Installation failed
    Failed,
    /// Being removed
    Terminating,
}

/// One endpoint of an exposed interface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessPoint {
    /// Port number
    pub port: i32,
    /// Fully qualified domain name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// IPv4 addresses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<String>,
    /// IPv6 addresses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv6_addresses: Vec<String>,
}

/// Access points of one exposed interface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessPointInfo {
    /// Interface identifier from the artefact's component spec
    pub interface_id: String,
    /// Endpoints reachable for this interface
    #[serde(default)]
    pub access_points: Vec<AccessPoint>,
}

/// ApplicationInstanceStatus defines the observed state of an instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInstanceStatus {
    /// Reconciliation phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Partner-side lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ApplicationInstanceState>,
    /// Last failure reported by the partner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    /// Endpoints published by the partner once the instance is ready
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_point_info: Vec<AccessPointInfo>,
}
