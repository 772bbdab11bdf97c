//! File Custom Resource Definition
//!
//! An image or binary the partner must fetch from a repository before an
//! artefact can reference it. Guest files are uploaded as multipart forms.

use crate::phase::Phase;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// FileSpec defines the desired state of a file
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "opg.ewbi.nby.one",
    version = "v1beta1",
    kind = "File",
    namespaced,
    status = "FileStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    /// Application provider owning the file
    #[serde(default)]
    pub app_provider_id: String,

    /// File name
    #[serde(default)]
    pub file_name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_description: Option<String>,

    /// File version
    #[serde(default)]
    pub file_version: String,

    /// File type (e.g. QCOW2, DOCKER)
    #[serde(default)]
    pub file_type: String,

    /// Checksum of the file contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Where the partner fetches the file from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_location: Option<RepoLocation>,

    /// Image properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageDetails>,
}

/// Repository coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepoLocation {
    /// Repository type (e.g. PUBLICREPO, PRIVATEREPO)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<String>,
    /// Repository URL
    #[serde(default)]
    pub url: String,
    /// User name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Image properties of a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    /// Instruction set architecture (e.g. ISA_X86_64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_set_architecture: Option<String>,
    /// Operating system descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsDescriptor>,
}

/// Operating system descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OsDescriptor {
    /// CPU architecture
    #[serde(default)]
    pub architecture: String,
    /// Distribution
    #[serde(default)]
    pub distribution: String,
    /// Version
    #[serde(default)]
    pub version: String,
    /// License
    #[serde(default)]
    pub license: String,
}

/// Partner-side state of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum FileState {
    /// Accepted, still being fetched
    Pending,
    /// Available at the partner
    Ready,
    /// Partner reported something we could not interpret
    Error,
}

/// FileStatus defines the observed state of a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    /// Reconciliation phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Partner-side state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<FileState>,
}
