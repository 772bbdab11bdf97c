//! AvailabilityZone Custom Resource Definition
//!
//! Describes a zone shared through a federation. Zones have no partner-side
//! counterpart to push; they only track the parent federation and converge
//! locally.

use crate::phase::Phase;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// AvailabilityZoneSpec defines the desired state of a zone
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "opg.ewbi.nby.one",
    version = "v1beta1",
    kind = "AvailabilityZone",
    namespaced,
    status = "AvailabilityZoneStatus",
    shortname = "az"
)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityZoneSpec {
    /// Zone identifier
    #[serde(default)]
    pub zone_id: String,

    /// Geolocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<String>,

    /// Geography details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geography_details: Option<String>,
}

/// AvailabilityZoneStatus defines the observed state of a zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityZoneStatus {
    /// Reconciliation phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,

    /// Flavours offered in this zone
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flavours_supported: Vec<String>,

    /// Compute resources reserved for the partner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_compute_resources: Option<String>,

    /// Quota limits applied to the partner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_resource_quota_limits: Option<String>,

    /// Advertised latency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<String>,
}
