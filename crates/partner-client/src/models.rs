//! Partner API data models
//!
//! Request and response bodies of the federation protocol. Field names
//! follow the protocol's camelCase wire format, including its irregular
//! acronyms (`origOPFederationId`, `appQoSProfile`, `numCPU`).

use crate::error::MultipartError;
use crate::multipart::{EncodedForm, MultipartForm};
use serde::{Deserialize, Serialize};

/// Structured error body returned with non-2xx answers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// Problem type URI
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    /// Short summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// HTTP status echoed by the partner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Human readable explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Occurrence URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Machine readable cause
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ProblemDetails {
    /// Problem carrying only a status and a detail
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            detail: Some(detail.into()),
            ..Default::default()
        }
    }
}

// Federation

/// MCC plus MNCs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileNetworkIds {
    /// Mobile country code
    pub mcc: String,
    /// Mobile network codes
    #[serde(default)]
    pub mncs: Vec<String>,
}

/// Credentials the partner uses when calling back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackCredentials {
    /// Token endpoint
    pub token_url: String,
    /// Client id
    pub client_id: String,
}

/// Body of `POST /partner`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationRequestData {
    /// Our federation id
    #[serde(rename = "origOPFederationId")]
    pub orig_op_federation_id: String,
    /// Our country code
    #[serde(rename = "origOPCountryCode", default, skip_serializing_if = "Option::is_none")]
    pub orig_op_country_code: Option<String>,
    /// Our mobile network codes
    #[serde(rename = "origOPMobileNetworkCodes", default, skip_serializing_if = "Option::is_none")]
    pub orig_op_mobile_network_codes: Option<MobileNetworkIds>,
    /// Our fixed network codes
    #[serde(rename = "origOPFixedNetworkCodes", default, skip_serializing_if = "Vec::is_empty")]
    pub orig_op_fixed_network_codes: Vec<String>,
    /// RFC 3339 start date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_date: Option<String>,
    /// Where the partner posts federation status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_status_link: Option<String>,
    /// How the partner authenticates callbacks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_callback_credentials: Option<CallbackCredentials>,
}

/// A zone offered by the partner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDetails {
    /// Zone identifier
    pub zone_id: String,
    /// Geolocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<String>,
    /// Geography details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geography_details: Option<String>,
}

/// Success body of `POST /partner`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationResponseData {
    /// Correlation id for every later call
    pub federation_context_id: String,
    /// Partner's own federation id
    #[serde(rename = "partnerOPFederationId", default, skip_serializing_if = "Option::is_none")]
    pub partner_op_federation_id: Option<String>,
    /// Zones the partner offers
    #[serde(default)]
    pub offered_availability_zones: Vec<ZoneDetails>,
}

/// Body of `POST /{federationContextId}/zones`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRegistrationRequestData {
    /// Zones being accepted
    pub accepted_availability_zones: Vec<String>,
    /// Where the partner posts zone notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avail_zone_notif_link: Option<String>,
}

/// Per-zone detail returned after a subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRegisteredData {
    /// Zone identifier
    pub zone_id: String,
    /// Flavours available in the zone
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flavours_supported: Vec<String>,
}

/// Success body of `POST /{federationContextId}/zones`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRegistrationResponseData {
    /// Detail of each accepted zone
    #[serde(default)]
    pub accepted_zone_resource_info: Vec<ZoneRegisteredData>,
}

// Files

/// Repository coordinates, JSON-encoded inside the `fileRepoLocation` field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectRepoLocation {
    /// Repository URL
    #[serde(rename = "repoURL", default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    /// User name
    #[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ObjectRepoLocation {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// OS descriptor, JSON-encoded inside the `imgOSType` field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsType {
    /// CPU architecture
    pub architecture: String,
    /// Distribution
    pub distribution: String,
    /// Version
    pub version: String,
    /// License
    pub license: String,
}

impl OsType {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Multipart body of `POST /{federationContextId}/files`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadFileForm {
    /// Application provider
    pub app_provider_id: String,
    /// Checksum
    pub checksum: Option<String>,
    /// Description
    pub file_description: Option<String>,
    /// External file id
    pub file_id: String,
    /// File name
    pub file_name: String,
    /// Repository coordinates
    pub file_repo_location: Option<ObjectRepoLocation>,
    /// File type
    pub file_type: String,
    /// Version
    pub file_version_info: String,
    /// Instruction set architecture
    pub img_ins_set_arch: Option<String>,
    /// OS descriptor
    pub img_os_type: Option<OsType>,
    /// Repository type
    pub repo_type: Option<String>,
}

impl UploadFileForm {
    /// Encodes the form, omitting empty fields
    pub fn encode(&self) -> Result<EncodedForm, MultipartError> {
        let mut form = MultipartForm::new();
        form.text("appProviderId", &self.app_provider_id)
            .optional_text("checksum", self.checksum.as_deref())
            .optional_text("fileDescription", self.file_description.as_deref())
            .text("fileId", &self.file_id)
            .text("fileName", &self.file_name);
        if let Some(location) = self.file_repo_location.as_ref().filter(|l| !l.is_empty()) {
            form.json("fileRepoLocation", location)?;
        }
        form.text("fileType", &self.file_type)
            .text("fileVersionInfo", &self.file_version_info)
            .optional_text("imgInsSetArch", self.img_ins_set_arch.as_deref());
        if let Some(os) = self.img_os_type.as_ref().filter(|os| !os.is_empty()) {
            form.json("imgOSType", os)?;
        }
        form.optional_text("repoType", self.repo_type.as_deref());
        Ok(form.finish())
    }
}

// Artefacts

/// Entrypoint override of a component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandLineParams {
    /// Command
    pub command: Vec<String>,
    /// Arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_args: Vec<String>,
}

/// Network interface a component exposes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDetails {
    /// Interface identifier
    pub interface_id: String,
    /// Transport protocol
    pub comm_protocol: String,
    /// Port
    pub comm_port: i32,
    /// Visibility
    pub visibility_type: String,
}

/// Compute requirements of a component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResourceInfo {
    /// CPU architecture
    pub cpu_arch_type: String,
    /// vCPU quantity
    #[serde(rename = "numCPU")]
    pub num_cpu: String,
    /// Memory in MB
    pub memory: i64,
    /// Exclusive cores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_exclusivity: Option<bool>,
}

/// One component, JSON-encoded as an element of the `componentSpec` field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Component name
    pub component_name: String,
    /// File ids of the images
    pub images: Vec<String>,
    /// Replica count
    pub num_of_instances: i32,
    /// Restart policy
    pub restart_policy: String,
    /// Entrypoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_line_params: Option<CommandLineParams>,
    /// Exposed interfaces
    #[serde(default)]
    pub exposed_interfaces: Vec<InterfaceDetails>,
    /// Compute requirements
    pub compute_resource_profile: ComputeResourceInfo,
}

/// Multipart body of `POST /{federationContextId}/artefact`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadArtefactForm {
    /// Application provider
    pub app_provider_id: String,
    /// Description
    pub artefact_description: Option<String>,
    /// External artefact id
    pub artefact_id: String,
    /// Name
    pub artefact_name: String,
    /// Version
    pub artefact_version_info: String,
    /// Virtualisation type
    pub artefact_virt_type: String,
    /// Descriptor type
    pub artefact_descriptor_type: String,
    /// Components
    pub component_spec: Vec<ComponentSpec>,
}

impl UploadArtefactForm {
    /// Encodes the form, omitting empty fields
    pub fn encode(&self) -> Result<EncodedForm, MultipartError> {
        let mut form = MultipartForm::new();
        form.text("appProviderId", &self.app_provider_id)
            .optional_text("artefactDescription", self.artefact_description.as_deref())
            .text("artefactId", &self.artefact_id)
            .text("artefactName", &self.artefact_name)
            .text("artefactVersionInfo", &self.artefact_version_info)
            .text("artefactVirtType", &self.artefact_virt_type)
            .text("artefactDescriptorType", &self.artefact_descriptor_type);
        if !self.component_spec.is_empty() {
            form.json("componentSpec", &self.component_spec)?;
        }
        Ok(form.finish())
    }
}

// Applications

/// Application metadata on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetaData {
    /// Display name
    pub app_name: String,
    /// Version
    pub version: String,
    /// Access token
    pub access_token: String,
    /// Mobility support
    pub mobility_support: bool,
}

/// QoS profile on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppQoSProfile {
    /// Provision up front
    pub app_provisioning: bool,
    /// Latency class
    pub latency_constraints: String,
    /// Single or multi user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_user_clients: Option<String>,
    /// Users per instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_users_per_app_inst: Option<i32>,
}

/// Reference to an uploaded artefact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppComponentRef {
    /// Artefact id
    pub artefact_id: String,
}

/// Body of `POST /{federationContextId}/application/onboarding`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardApplicationRequest {
    /// External application id
    pub app_id: String,
    /// Application provider
    pub app_provider_id: String,
    /// Metadata
    pub app_meta_data: AppMetaData,
    /// QoS profile
    #[serde(rename = "appQoSProfile")]
    pub app_qos_profile: AppQoSProfile,
    /// Artefacts
    pub app_component_specs: Vec<AppComponentRef>,
    /// Where the partner posts onboarding status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_status_callback_link: Option<String>,
}

// Application instances

/// Placement on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallZoneInfo {
    /// Zone
    pub zone_id: String,
    /// Flavour
    pub flavour_id: String,
    /// Reservation preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_consumption: Option<String>,
    /// Reserved pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub res_pool: Option<String>,
}

/// Body of `POST /{federationContextId}/application/lcm`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallAppRequest {
    /// Onboarded application id
    pub app_id: String,
    /// Application version
    pub app_version: String,
    /// Application provider
    pub app_provider_id: String,
    /// Placement
    pub zone_info: InstallZoneInfo,
    /// External instance id
    pub app_instance_id: String,
    /// Where the partner posts instance status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_inst_callback_link: Option<String>,
}

/// One reachable endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    /// Port
    pub port: i32,
    /// FQDN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// IPv4 addresses
    #[serde(default)]
    pub ipv4_addresses: Vec<String>,
    /// IPv6 addresses
    #[serde(default)]
    pub ipv6_addresses: Vec<String>,
}

/// Endpoints of one interface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceAccessPoints {
    /// Interface identifier
    pub interface_id: String,
    /// Endpoints
    #[serde(default)]
    pub access_points: Vec<ServiceEndpoint>,
}

/// Success body of `GET .../instance/{appInstanceId}/zone/{zoneId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInstanceDetails {
    /// PENDING, READY, FAILED or TERMINATING
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_instance_state: Option<String>,
    /// Published endpoints
    #[serde(rename = "accesspointInfo", default)]
    pub accesspoint_info: Vec<InterfaceAccessPoints>,
}
