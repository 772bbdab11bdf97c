//! PartnerApi trait for mocking
//!
//! This trait abstracts the partner protocol so reconcilers can run against
//! [`crate::PartnerClient`] in production and an in-memory double in tests.

use crate::error::PartnerError;
use crate::models::*;
use crate::multipart::EncodedForm;
use crate::response::PartnerResponse;

/// Operations of the federation partner protocol.
///
/// Every method returns `Ok` for any HTTP answer, including non-2xx ones;
/// `Err` is reserved for transport and serialization failures. All futures
/// must be `Send` to run on Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait PartnerApi: Send + Sync {
    /// Base URL of the partner
    fn base_url(&self) -> &str;

    // Federation
    /// Creates (or refreshes) the federation and returns the offered zones
    async fn create_federation(
        &self,
        request: &FederationRequestData,
    ) -> Result<PartnerResponse<FederationResponseData>, PartnerError>;
    /// Tears the federation down
    async fn delete_federation(&self, context_id: &str) -> Result<PartnerResponse<()>, PartnerError>;
    /// Accepts offered zones
    async fn zone_subscribe(
        &self,
        context_id: &str,
        request: &ZoneRegistrationRequestData,
    ) -> Result<PartnerResponse<ZoneRegistrationResponseData>, PartnerError>;

    // Files
    /// Uploads a file descriptor as a multipart form
    async fn upload_file(&self, context_id: &str, form: EncodedForm) -> Result<PartnerResponse<()>, PartnerError>;
    /// Removes a file
    async fn remove_file(&self, context_id: &str, file_id: &str) -> Result<PartnerResponse<()>, PartnerError>;

    // Artefacts
    /// Uploads an artefact descriptor as a multipart form
    async fn upload_artefact(&self, context_id: &str, form: EncodedForm) -> Result<PartnerResponse<()>, PartnerError>;
    /// Removes an artefact
    async fn remove_artefact(&self, context_id: &str, artefact_id: &str) -> Result<PartnerResponse<()>, PartnerError>;

    // Applications
    /// Onboards an application
    async fn onboard_application(
        &self,
        context_id: &str,
        request: &OnboardApplicationRequest,
    ) -> Result<PartnerResponse<()>, PartnerError>;
    /// Deboards an application
    async fn delete_app(&self, context_id: &str, app_id: &str) -> Result<PartnerResponse<()>, PartnerError>;

    // Application instances
    /// Installs an application instance
    async fn install_app(
        &self,
        context_id: &str,
        request: &InstallAppRequest,
    ) -> Result<PartnerResponse<()>, PartnerError>;
    /// Removes an application instance
    async fn remove_app(
        &self,
        context_id: &str,
        app_id: &str,
        app_instance_id: &str,
        zone_id: &str,
    ) -> Result<PartnerResponse<()>, PartnerError>;
    /// Reads instance state and access points
    async fn get_app_instance_details(
        &self,
        context_id: &str,
        app_id: &str,
        app_instance_id: &str,
        zone_id: &str,
    ) -> Result<PartnerResponse<AppInstanceDetails>, PartnerError>;
}
