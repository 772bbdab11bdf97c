//! Mock partner for unit testing
//!
//! In-memory implementation of [`PartnerApi`] that behaves like a well-formed
//! partner: creates answer 409 when the id already exists, deletes answer 404
//! when it does not. Individual operations can be forced to answer with any
//! status to exercise error paths.

use crate::error::PartnerError;
use crate::models::*;
use crate::multipart::{EncodedForm, form_field_value};
use crate::partner_trait::PartnerApi;
use crate::response::PartnerResponse;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const ALREADY_EXISTS: &str = "conflict object already exists";

#[derive(Debug, Clone)]
struct MockFederation {
    context_id: String,
    offered_zones: Vec<ZoneDetails>,
    accepted_zones: Vec<String>,
}

#[derive(Debug, Clone)]
struct ForcedResponse {
    status: u16,
    detail: Option<String>,
}

/// Mock partner for testing
///
/// Clones share state, so a test can keep one handle for assertions while the
/// code under test owns another.
#[derive(Debug, Clone)]
pub struct MockPartnerClient {
    base_url: String,
    federations: Arc<Mutex<HashMap<String, MockFederation>>>,
    files: Arc<Mutex<HashSet<String>>>,
    artefacts: Arc<Mutex<HashSet<String>>>,
    apps: Arc<Mutex<HashSet<String>>>,
    app_instances: Arc<Mutex<HashMap<String, AppInstanceDetails>>>,
    forced: Arc<Mutex<HashMap<String, ForcedResponse>>>,
    create_status: Arc<Mutex<u16>>,
    calls: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn zone(id: &str) -> ZoneDetails {
    ZoneDetails {
        zone_id: id.to_string(),
        ..Default::default()
    }
}

impl MockPartnerClient {
    /// Create a new mock partner
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            federations: Arc::new(Mutex::new(HashMap::new())),
            files: Arc::new(Mutex::new(HashSet::new())),
            artefacts: Arc::new(Mutex::new(HashSet::new())),
            apps: Arc::new(Mutex::new(HashSet::new())),
            app_instances: Arc::new(Mutex::new(HashMap::new())),
            forced: Arc::new(Mutex::new(HashMap::new())),
            create_status: Arc::new(Mutex::new(200)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registers a federation the partner is willing to create
    pub fn add_federation(&self, federation_id: &str, context_id: &str, offered_zones: &[&str]) {
        lock(&self.federations).insert(
            federation_id.to_string(),
            MockFederation {
                context_id: context_id.to_string(),
                offered_zones: offered_zones.iter().map(|z| zone(z)).collect(),
                accepted_zones: Vec::new(),
            },
        );
    }

    /// Replaces the zones offered for `federation_id`
    pub fn offer_zones(&self, federation_id: &str, offered_zones: &[&str]) {
        if let Some(fed) = lock(&self.federations).get_mut(federation_id) {
            fed.offered_zones = offered_zones.iter().map(|z| zone(z)).collect();
        }
    }

    /// Zones accepted through `zone_subscribe` for `context_id`
    pub fn accepted_zones(&self, context_id: &str) -> Vec<String> {
        lock(&self.federations)
            .values()
            .find(|f| f.context_id == context_id)
            .map(|f| f.accepted_zones.clone())
            .unwrap_or_default()
    }

    /// Whether a federation with `context_id` exists
    pub fn has_federation(&self, context_id: &str) -> bool {
        lock(&self.federations).values().any(|f| f.context_id == context_id)
    }

    /// Seeds an uploaded file
    pub fn add_file(&self, file_id: &str) {
        lock(&self.files).insert(file_id.to_string());
    }

    /// Whether `file_id` is uploaded
    pub fn has_file(&self, file_id: &str) -> bool {
        lock(&self.files).contains(file_id)
    }

    /// Seeds an uploaded artefact
    pub fn add_artefact(&self, artefact_id: &str) {
        lock(&self.artefacts).insert(artefact_id.to_string());
    }

    /// Whether `artefact_id` is uploaded
    pub fn has_artefact(&self, artefact_id: &str) -> bool {
        lock(&self.artefacts).contains(artefact_id)
    }

    /// Seeds an onboarded application
    pub fn add_app(&self, app_id: &str) {
        lock(&self.apps).insert(app_id.to_string());
    }

    /// Whether `app_id` is onboarded
    pub fn has_app(&self, app_id: &str) -> bool {
        lock(&self.apps).contains(app_id)
    }

    /// Seeds an installed instance in state PENDING
    pub fn add_app_instance(&self, app_instance_id: &str) {
        self.set_app_instance(app_instance_id, "PENDING", Vec::new());
    }

    /// Sets the state and access points reported for an instance
    pub fn set_app_instance(
        &self,
        app_instance_id: &str,
        state: &str,
        access_points: Vec<InterfaceAccessPoints>,
    ) {
        lock(&self.app_instances).insert(
            app_instance_id.to_string(),
            AppInstanceDetails {
                app_instance_state: Some(state.to_string()),
                accesspoint_info: access_points,
            },
        );
    }

    /// Whether `app_instance_id` is installed
    pub fn has_app_instance(&self, app_instance_id: &str) -> bool {
        lock(&self.app_instances).contains_key(app_instance_id)
    }

    /// Status returned by successful creates (default 200)
    pub fn set_create_status(&self, status: u16) {
        *lock(&self.create_status) = status;
    }

    /// Forces `operation` (a [`PartnerApi`] method name) to answer `status`
    pub fn force_response(&self, operation: &str, status: u16, detail: Option<&str>) {
        lock(&self.forced).insert(
            operation.to_string(),
            ForcedResponse {
                status,
                detail: detail.map(str::to_string),
            },
        );
    }

    /// Removes every forced answer
    pub fn clear_forced_responses(&self) {
        lock(&self.forced).clear();
    }

    /// Names of the operations invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// How many times `operation` was invoked
    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.calls).iter().filter(|c| *c == operation).count()
    }

    fn record<T>(&self, operation: &str) -> Option<PartnerResponse<T>> {
        lock(&self.calls).push(operation.to_string());
        lock(&self.forced).get(operation).map(|forced| PartnerResponse {
            status: forced.status,
            body: None,
            problem: forced
                .detail
                .as_ref()
                .map(|d| ProblemDetails::new(forced.status, d.clone())),
        })
    }

    fn create_status(&self) -> u16 {
        *lock(&self.create_status)
    }

    fn create_in(&self, set: &Mutex<HashSet<String>>, id: String) -> PartnerResponse<()> {
        if lock(set).insert(id) {
            PartnerResponse::ok(self.create_status(), ())
        } else {
            PartnerResponse::problem(409, ALREADY_EXISTS)
        }
    }

    fn remove_from(set: &Mutex<HashSet<String>>, id: &str, what: &str) -> PartnerResponse<()> {
        if lock(set).remove(id) {
            PartnerResponse::ok(200, ())
        } else {
            PartnerResponse::problem(404, format!("unable to remove {what}, not found"))
        }
    }
}

#[async_trait::async_trait]
impl PartnerApi for MockPartnerClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_federation(
        &self,
        request: &FederationRequestData,
    ) -> Result<PartnerResponse<FederationResponseData>, PartnerError> {
        if let Some(forced) = self.record("create_federation") {
            return Ok(forced);
        }
        Ok(match lock(&self.federations).get(&request.orig_op_federation_id) {
            Some(fed) => PartnerResponse::ok(
                200,
                FederationResponseData {
                    federation_context_id: fed.context_id.clone(),
                    partner_op_federation_id: None,
                    offered_availability_zones: fed.offered_zones.clone(),
                },
            ),
            None => PartnerResponse::problem(404, "federation doesn't exist"),
        })
    }

    async fn delete_federation(&self, context_id: &str) -> Result<PartnerResponse<()>, PartnerError> {
        if let Some(forced) = self.record("delete_federation") {
            return Ok(forced);
        }
        let mut federations = lock(&self.federations);
        let before = federations.len();
        federations.retain(|_, f| f.context_id != context_id);
        Ok(if federations.len() < before {
            PartnerResponse::ok(200, ())
        } else {
            PartnerResponse::problem(404, "unable to remove federation, not found")
        })
    }

    async fn zone_subscribe(
        &self,
        context_id: &str,
        request: &ZoneRegistrationRequestData,
    ) -> Result<PartnerResponse<ZoneRegistrationResponseData>, PartnerError> {
        if let Some(forced) = self.record("zone_subscribe") {
            return Ok(forced);
        }
        let mut federations = lock(&self.federations);
        Ok(match federations.values_mut().find(|f| f.context_id == context_id) {
            Some(fed) => {
                fed.accepted_zones.clone_from(&request.accepted_availability_zones);
                PartnerResponse::ok(
                    200,
                    ZoneRegistrationResponseData {
                        accepted_zone_resource_info: request
                            .accepted_availability_zones
                            .iter()
                            .map(|z| ZoneRegisteredData {
                                zone_id: z.clone(),
                                ..Default::default()
                            })
                            .collect(),
                    },
                )
            }
            None => PartnerResponse::problem(404, "federation not found"),
        })
    }

    async fn upload_file(&self, _context_id: &str, form: EncodedForm) -> Result<PartnerResponse<()>, PartnerError> {
        if let Some(forced) = self.record("upload_file") {
            return Ok(forced);
        }
        let file_id = form_field_value(&form.body, &form.content_type, "fileId")?;
        Ok(self.create_in(&self.files, file_id))
    }

    async fn remove_file(&self, _context_id: &str, file_id: &str) -> Result<PartnerResponse<()>, PartnerError> {
        if let Some(forced) = self.record("remove_file") {
            return Ok(forced);
        }
        Ok(Self::remove_from(&self.files, file_id, "file"))
    }

    async fn upload_artefact(&self, _context_id: &str, form: EncodedForm) -> Result<PartnerResponse<()>, PartnerError> {
        if let Some(forced) = self.record("upload_artefact") {
            return Ok(forced);
        }
        let artefact_id = form_field_value(&form.body, &form.content_type, "artefactId")?;
        Ok(self.create_in(&self.artefacts, artefact_id))
    }

    async fn remove_artefact(&self, _context_id: &str, artefact_id: &str) -> Result<PartnerResponse<()>, PartnerError> {
        if let Some(forced) = self.record("remove_artefact") {
            return Ok(forced);
        }
        Ok(Self::remove_from(&self.artefacts, artefact_id, "artefact"))
    }

    async fn onboard_application(
        &self,
        _context_id: &str,
        request: &OnboardApplicationRequest,
    ) -> Result<PartnerResponse<()>, PartnerError> {
        if let Some(forced) = self.record("onboard_application") {
            return Ok(forced);
        }
        Ok(self.create_in(&self.apps, request.app_id.clone()))
    }

    async fn delete_app(&self, _context_id: &str, app_id: &str) -> Result<PartnerResponse<()>, PartnerError> {
        if let Some(forced) = self.record("delete_app") {
            return Ok(forced);
        }
        Ok(Self::remove_from(&self.apps, app_id, "application"))
    }

    async fn install_app(
        &self,
        _context_id: &str,
        request: &InstallAppRequest,
    ) -> Result<PartnerResponse<()>, PartnerError> {
        if let Some(forced) = self.record("install_app") {
            return Ok(forced);
        }
        if self.has_app_instance(&request.app_instance_id) {
            return Ok(PartnerResponse::problem(409, ALREADY_EXISTS));
        }
        self.add_app_instance(&request.app_instance_id);
        Ok(PartnerResponse::ok(self.create_status(), ()))
    }

    async fn remove_app(
        &self,
        _context_id: &str,
        _app_id: &str,
        app_instance_id: &str,
        _zone_id: &str,
    ) -> Result<PartnerResponse<()>, PartnerError> {
        if let Some(forced) = self.record("remove_app") {
            return Ok(forced);
        }
        Ok(if lock(&self.app_instances).remove(app_instance_id).is_some() {
            PartnerResponse::ok(200, ())
        } else {
            PartnerResponse::problem(404, "unable to remove application instance, not found")
        })
    }

    async fn get_app_instance_details(
        &self,
        _context_id: &str,
        _app_id: &str,
        app_instance_id: &str,
        _zone_id: &str,
    ) -> Result<PartnerResponse<AppInstanceDetails>, PartnerError> {
        if let Some(forced) = self.record("get_app_instance_details") {
            return Ok(forced);
        }
        Ok(match lock(&self.app_instances).get(app_instance_id) {
            Some(details) => PartnerResponse::ok(200, details.clone()),
            None => PartnerResponse::problem(404, "application instance not found"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_form(file_id: &str) -> EncodedForm {
        UploadFileForm {
            app_provider_id: "provider".to_string(),
            file_id: file_id.to_string(),
            file_name: "image".to_string(),
            ..Default::default()
        }
        .encode()
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_upload_conflicts() {
        let mock = MockPartnerClient::new("mock://partner");

        assert_eq!(mock.upload_file("ctx", file_form("f1")).await.unwrap().status, 200);
        let again = mock.upload_file("ctx", file_form("f1")).await.unwrap();
        assert_eq!(again.status, 409);
        assert_eq!(again.detail(), Some(ALREADY_EXISTS));
        assert!(mock.has_file("f1"));
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let mock = MockPartnerClient::new("mock://partner");
        mock.add_app("app-1");

        assert_eq!(mock.delete_app("ctx", "app-1").await.unwrap().status, 200);
        assert_eq!(mock.delete_app("ctx", "app-1").await.unwrap().status, 404);
        assert_eq!(mock.call_count("delete_app"), 2);
    }

    #[tokio::test]
    async fn test_forced_response_wins() {
        let mock = MockPartnerClient::new("mock://partner");
        mock.force_response("upload_file", 500, Some("file not found"));

        let response = mock.upload_file("ctx", file_form("f1")).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.detail(), Some("file not found"));
        assert!(!mock.has_file("f1"));

        mock.clear_forced_responses();
        assert_eq!(mock.upload_file("ctx", file_form("f1")).await.unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_federation_create_and_subscribe() {
        let mock = MockPartnerClient::new("mock://partner");
        mock.add_federation("fed-1", "ctx-1", &["zone-a"]);

        let request = FederationRequestData {
            orig_op_federation_id: "fed-1".to_string(),
            ..Default::default()
        };
        let created = mock.create_federation(&request).await.unwrap();
        let body = created.body.unwrap();
        assert_eq!(body.federation_context_id, "ctx-1");
        assert_eq!(body.offered_availability_zones, vec![zone("zone-a")]);

        let subscribed = mock
            .zone_subscribe(
                "ctx-1",
                &ZoneRegistrationRequestData {
                    accepted_availability_zones: vec!["zone-a".to_string()],
                    avail_zone_notif_link: None,
                },
            )
            .await
            .unwrap();
        assert!(subscribed.is_success());
        assert_eq!(mock.accepted_zones("ctx-1"), vec!["zone-a"]);

        let unknown = FederationRequestData {
            orig_op_federation_id: "fed-2".to_string(),
            ..Default::default()
        };
        assert_eq!(mock.create_federation(&unknown).await.unwrap().status, 404);
    }
}
