//! Artefact Custom Resource Definition
//!
//! An artefact describes how an application's components are packaged and
//! run. Guest artefacts are uploaded as multipart forms whose component list
//! travels as a JSON-encoded field.

use crate::phase::Phase;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ArtefactSpec defines the desired state of an artefact
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "opg.ewbi.nby.one",
    version = "v1beta1",
    kind = "Artefact",
    namespaced,
    status = "ArtefactStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ArtefactSpec {
    /// Application provider owning the artefact
    #[serde(default)]
    pub app_provider_id: String,

    /// Artefact name
    #[serde(default)]
    pub artefact_name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artefact_description: Option<String>,

    /// Artefact version
    #[serde(default)]
    pub artefact_version: String,

    /// Descriptor type (e.g. HELM, COMPONENTSPEC)
    #[serde(default)]
    pub descriptor_type: String,

    /// Virtualisation type (VM_TYPE or CONTAINER_TYPE)
    #[serde(default)]
    pub virt_type: String,

    /// Components making up the artefact
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_spec: Vec<ComponentSpec>,
}

/// One component of an artefact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Component name
    pub name: String,

    /// File ids of the images this component runs
    #[serde(default)]
    pub images: Vec<String>,

    /// Replica count
    #[serde(default)]
    pub num_of_instances: i32,

    /// Restart policy (RESTART_POLICY_ALWAYS or RESTART_POLICY_NEVER)
    #[serde(default)]
    pub restart_policy: String,

    /// Entrypoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_line_params: Option<CommandLineParams>,

    /// Network interfaces the component exposes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exposed_interfaces: Vec<ExposedInterface>,

    /// Compute requirements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_resource_profile: Option<ComputeResourceProfile>,
}

/// Command and arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommandLineParams {
    /// Command
    #[serde(default)]
    pub command: Vec<String>,
    /// Arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Exposed interface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExposedInterface {
    /// Interface identifier
    pub interface_id: String,
    /// Transport protocol
    pub protocol: String,
    /// Port number
    pub port: i32,
    /// VISIBILITY_EXTERNAL or VISIBILITY_INTERNAL
    pub visibility_type: String,
}

/// Compute requirements of a component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResourceProfile {
    /// CPU architecture
    #[serde(default)]
    pub cpu_arch_type: String,
    /// vCPU count, as a quantity string
    #[serde(rename = "numCPU", default)]
    pub num_cpu: String,
    /// Memory in MB
    #[serde(default)]
    pub memory: i64,
    /// Pin the component to exclusive cores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_exclusivity: Option<bool>,
}

/// Partner-side state of an artefact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ArtefactState {
    /// Accepted, still being processed
    Pending,
    /// Available at the partner
    Ready,
    /// Partner reported something we could not interpret
    Error,
}

/// ArtefactStatus defines the observed state of an artefact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtefactStatus {
    /// Reconciliation phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Partner-side state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ArtefactState>,
}
