//! Application reconciliation.

use super::Reconciler;
use super::lifecycle::{FederatedResource, SyncOutcome};
use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{
    APPLICATION_FINALIZER, Application, ApplicationState, ApplicationStatus, ExternalId, Phase,
};
use kube_runtime::controller::Action;
use partner_client::{
    AppComponentRef, AppMetaData, AppQoSProfile, OnboardApplicationRequest, PartnerApi,
    PartnerResponse, ResponseClass,
};

/// Onboarding request of `app`
pub(crate) fn onboard_request(app: &Application) -> OnboardApplicationRequest {
    let spec = &app.spec;
    OnboardApplicationRequest {
        app_id: ExternalId::of(app).to_string(),
        app_provider_id: spec.app_provider_id.clone(),
        app_meta_data: AppMetaData {
            app_name: spec.app_meta_data.name.clone(),
            version: spec.app_meta_data.version.clone(),
            access_token: spec.app_meta_data.access_token.clone(),
            mobility_support: spec.app_meta_data.mobility_support,
        },
        app_qos_profile: AppQoSProfile {
            app_provisioning: spec.qos_profile.provisioning,
            latency_constraints: spec.qos_profile.latency_constraints.clone(),
            multi_user_clients: spec.qos_profile.multi_user_clients.clone(),
            no_of_users_per_app_inst: spec.qos_profile.users_per_app_inst,
        },
        app_component_specs: spec
            .component_specs
            .iter()
            .map(|c| AppComponentRef {
                artefact_id: c.artefact_id.clone(),
            })
            .collect(),
        app_status_callback_link: spec.status_link.clone(),
    }
}

#[async_trait]
impl FederatedResource for Application {
    const KIND: &'static str = "Application";
    const FINALIZER: &'static str = APPLICATION_FINALIZER;
    const MISSING_DEPENDENCY: Option<&'static str> = Some("artefact not found");

    type Status = ApplicationStatus;

    fn status_snapshot(&self) -> Option<ApplicationStatus> {
        self.status.clone()
    }

    fn phase(&self) -> Option<Phase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    fn set_phase(&mut self, phase: Phase) {
        self.status.get_or_insert_with(Default::default).phase = Some(phase);
    }

    fn record_rejection(&mut self, detail: &str) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Error);
        status.state = Some(ApplicationState::Failed);
        status.error_msg = Some(detail.to_string());
    }

    fn record_unclassified(&mut self, status_code: u16) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Error);
        status.error_msg = Some(format!("unexpected partner status {status_code}"));
    }

    fn is_created(&self) -> bool {
        self.status.as_ref().and_then(|s| s.state) == Some(ApplicationState::Onboarded)
    }

    fn record_existing(&mut self) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Ready);
        status.error_msg = None;
    }

    async fn push(
        &mut self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<SyncOutcome, ControllerError> {
        let request = onboard_request(self);
        let response = partner.onboard_application(context_id, &request).await?;

        if response.class(Self::MISSING_DEPENDENCY) != ResponseClass::Success {
            return Ok(SyncOutcome::from_response(&response, Self::MISSING_DEPENDENCY));
        }

        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Ready);
        status.state = Some(ApplicationState::Onboarded);
        status.error_msg = None;
        Ok(SyncOutcome::synced())
    }

    async fn withdraw(
        &self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<PartnerResponse<()>, ControllerError> {
        Ok(partner
            .delete_app(context_id, ExternalId::of(self).as_str())
            .await?)
    }
}

impl Reconciler {
    /// Reconciles the Application `name`
    pub async fn reconcile_application(&self, name: &str) -> Result<Action, ControllerError> {
        self.reconcile_federated(self.stores.applications.as_ref(), name)
            .await
    }
}
