//! Federation Custom Resource Definition
//!
//! A Federation is the cooperation context between this operator and one
//! partner operator. Guest federations are created at the partner; the
//! partner answers with a context id and a set of offered availability zones.

use crate::phase::Phase;
use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// FederationSpec defines the desired state of a federation
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "opg.ewbi.nby.one",
    version = "v1beta1",
    kind = "Federation",
    namespaced,
    status = "FederationStatus",
    shortname = "fed"
)]
#[serde(rename_all = "camelCase")]
pub struct FederationSpec {
    /// Date the federation becomes effective
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_date: Option<DateTime<Utc>>,

    /// Identity of the originating operator
    #[serde(rename = "originOP", default)]
    pub origin_op: OriginOperator,

    /// Partner-facing callback details
    #[serde(default)]
    pub partner: PartnerDetails,

    /// Zones offered to the partner (host side)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offered_availability_zones: Vec<String>,

    /// Zones this operator accepted from the partner's offer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepted_availability_zones: Vec<String>,

    /// Endpoint and caller identity used to reach the partner (guest side)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_partner_credentials: Option<PartnerCredentials>,
}

/// Originating operator identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OriginOperator {
    /// ISO 3166-1 alpha-2 country code
    #[serde(default)]
    pub country_code: String,

    /// Fixed network codes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_network_codes: Vec<String>,

    /// Mobile network codes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_network_codes: Option<MobileNetworkCodes>,
}

/// MCC plus its MNCs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MobileNetworkCodes {
    /// Mobile country code
    pub mcc: String,
    /// Mobile network codes
    #[serde(default)]
    pub mncs: Vec<String>,
}

/// How the partner calls back into this operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerDetails {
    /// Credentials the partner uses for callbacks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_credentials: Option<PartnerCredentials>,

    /// Link the partner posts federation status changes to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_link: Option<String>,
}

/// Client id plus token endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerCredentials {
    /// Caller identity
    pub client_id: String,
    /// Token (and, for guest credentials, API base) URL
    pub token_url: String,
}

/// Federation lifecycle state as reported by the partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum FederationState {
    /// Creation failed permanently
    Failed,
    /// Creation failed but may succeed later
    TemporaryFailure,
    /// Federation is established
    Available,
    /// Federation is administratively locked
    Locked,
    /// Federation is not (yet) available
    NotAvailable,
}

/// A zone the partner offered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferedZone {
    /// Zone identifier
    pub zone_id: String,
    /// Geolocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<String>,
    /// Geography details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geography_details: Option<String>,
}

/// FederationStatus defines the observed state of a federation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FederationStatus {
    /// Context id assigned by the partner; stable once set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federation_context_id: Option<String>,

    /// Partner-reported federation state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<FederationState>,

    /// Reconciliation phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,

    /// Zones the partner currently offers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offered_availability_zones: Vec<OfferedZone>,
}

impl Federation {
    /// Context id recorded in status, if any and non-empty
    #[must_use]
    pub fn status_context_id(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.federation_context_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Current phase, if any
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_uses_protocol_field_names() {
        let spec: FederationSpec = serde_json::from_value(serde_json::json!({
            "originOP": {
                "countryCode": "ES",
                "mobileNetworkCodes": {"mcc": "214", "mncs": ["01"]}
            },
            "guestPartnerCredentials": {"clientId": "guest", "tokenUrl": "https://partner"},
            "acceptedAvailabilityZones": ["zone-a"]
        }))
        .unwrap();

        assert_eq!(spec.origin_op.country_code, "ES");
        assert_eq!(spec.origin_op.mobile_network_codes.unwrap().mncs, vec!["01"]);
        assert_eq!(spec.accepted_availability_zones, vec!["zone-a"]);
        assert_eq!(spec.guest_partner_credentials.unwrap().client_id, "guest");
    }

    #[test]
    fn test_status_context_id_ignores_empty() {
        let mut fed = Federation::new("fed", FederationSpec::default());
        assert_eq!(fed.status_context_id(), None);

        fed.status = Some(FederationStatus {
            federation_context_id: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(fed.status_context_id(), None);

        fed.status = Some(FederationStatus {
            federation_context_id: Some("ctx".to_string()),
            state: Some(FederationState::Available),
            ..Default::default()
        });
        assert_eq!(fed.status_context_id(), Some("ctx"));
        assert_eq!(
            serde_json::to_value(fed.status.unwrap()).unwrap()["state"],
            "Available"
        );
    }
}
