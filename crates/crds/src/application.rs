//! Application Custom Resource Definition
//!
//! An application groups artefacts and QoS requirements. Guest applications
//! are onboarded at the partner with a JSON request.

use crate::phase::Phase;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ApplicationSpec defines the desired state of an application
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "opg.ewbi.nby.one",
    version = "v1beta1",
    kind = "Application",
    namespaced,
    status = "ApplicationStatus",
    shortname = "app"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Application provider owning the application
    #[serde(default)]
    pub app_provider_id: String,

    /// Artefacts making up the application
    #[serde(default)]
    pub component_specs: Vec<ApplicationComponent>,

    /// Descriptive metadata
    #[serde(default)]
    pub app_meta_data: AppMetaData,

    /// QoS requirements
    #[serde(rename = "qoSProfile", default)]
    pub qos_profile: QosProfile,

    /// Link the partner posts onboarding status to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_link: Option<String>,
}

/// Reference to an artefact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationComponent {
    /// Artefact id at the partner
    pub artefact_id: String,
}

/// Descriptive application metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppMetaData {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Version
    #[serde(default)]
    pub version: String,
    /// Access token handed to the partner
    #[serde(default)]
    pub access_token: String,
    /// Whether the application supports mobility
    #[serde(default)]
    pub mobility_support: bool,
}

/// QoS requirements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QosProfile {
    /// Whether the partner should provision up front
    #[serde(default)]
    pub provisioning: bool,
    /// NONE, LOW or ULTRALOW
    #[serde(default)]
    pub latency_constraints: String,
    /// APP_TYPE_SINGLE_USER or APP_TYPE_MULTI_USER
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_user_clients: Option<String>,
    /// Users per instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users_per_app_inst: Option<i32>,
}

/// Onboarding state of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ApplicationState {
    /// Submitted, not yet confirmed
    Pending,
    /// Onboarded at the partner
    Onboarded,
    /// Being removed
    Deboarding,
    /// Onboarding failed
    Failed,
    /// Removed from the partner
    Removed,
}

/// ApplicationStatus defines the observed state of an application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    /// Reconciliation phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Onboarding state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ApplicationState>,
    /// Last failure reported by the partner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}
