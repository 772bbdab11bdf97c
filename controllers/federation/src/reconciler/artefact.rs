//! Artefact reconciliation.
//!
//! Same upload contract as files, except that a 202 is polled: the upload is
//! repeated every few seconds until the partner answers with 200 (artefact
//! ready) or 409 (already held).

use super::lifecycle::{FederatedResource, SyncOutcome};
use super::{POLL_INTERVAL, Reconciler};
use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{ARTEFACT_FINALIZER, Artefact, ArtefactState, ArtefactStatus, ExternalId, Phase};
use kube_runtime::controller::Action;
use partner_client::{
    CommandLineParams, ComponentSpec, ComputeResourceInfo, InterfaceDetails, PartnerApi,
    PartnerError, PartnerResponse, ResponseClass, UploadArtefactForm,
};

fn component(spec: &crds::ComponentSpec) -> ComponentSpec {
    ComponentSpec {
        component_name: spec.name.clone(),
        images: spec.images.clone(),
        num_of_instances: spec.num_of_instances,
        restart_policy: spec.restart_policy.clone(),
        command_line_params: spec.command_line_params.as_ref().map(|p| CommandLineParams {
            command: p.command.clone(),
            command_args: p.args.clone(),
        }),
        exposed_interfaces: spec
            .exposed_interfaces
            .iter()
            .map(|i| InterfaceDetails {
                interface_id: i.interface_id.clone(),
                comm_protocol: i.protocol.clone(),
                comm_port: i.port,
                visibility_type: i.visibility_type.clone(),
            })
            .collect(),
        compute_resource_profile: spec
            .compute_resource_profile
            .as_ref()
            .map(|p| ComputeResourceInfo {
                cpu_arch_type: p.cpu_arch_type.clone(),
                num_cpu: p.num_cpu.clone(),
                memory: p.memory,
                cpu_exclusivity: p.cpu_exclusivity,
            })
            .unwrap_or_default(),
    }
}

/// Upload form of `artefact`
pub(crate) fn upload_form(artefact: &Artefact) -> UploadArtefactForm {
    let spec = &artefact.spec;
    UploadArtefactForm {
        app_provider_id: spec.app_provider_id.clone(),
        artefact_description: spec.artefact_description.clone(),
        artefact_id: ExternalId::of(artefact).to_string(),
        artefact_name: spec.artefact_name.clone(),
        artefact_version_info: spec.artefact_version.clone(),
        artefact_virt_type: spec.virt_type.clone(),
        artefact_descriptor_type: spec.descriptor_type.clone(),
        component_spec: spec.component_spec.iter().map(component).collect(),
    }
}

#[async_trait]
impl FederatedResource for Artefact {
    const KIND: &'static str = "Artefact";
    const FINALIZER: &'static str = ARTEFACT_FINALIZER;
    const MISSING_DEPENDENCY: Option<&'static str> = Some("file not found");

    type Status = ArtefactStatus;

    fn status_snapshot(&self) -> Option<ArtefactStatus> {
        self.status.clone()
    }

    fn phase(&self) -> Option<Phase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    fn set_phase(&mut self, phase: Phase) {
        self.status.get_or_insert_with(Default::default).phase = Some(phase);
    }

    fn record_rejection(&mut self, _detail: &str) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Error);
        status.state = Some(ArtefactState::Error);
    }

    fn record_unclassified(&mut self, _status_code: u16) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Error);
        status.state = Some(ArtefactState::Error);
    }

    fn is_created(&self) -> bool {
        matches!(
            self.status.as_ref().and_then(|s| s.state),
            Some(ArtefactState::Pending | ArtefactState::Ready)
        )
    }

    fn converge_locally(&mut self) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Ready);
        status.state.get_or_insert(ArtefactState::Pending);
    }

    async fn push(
        &mut self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<SyncOutcome, ControllerError> {
        let form = upload_form(self).encode().map_err(PartnerError::from)?;
        let response = partner.upload_artefact(context_id, form).await?;

        if response.class(Self::MISSING_DEPENDENCY) != ResponseClass::Success {
            return Ok(SyncOutcome::from_response(&response, Self::MISSING_DEPENDENCY));
        }

        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Ready);
        Ok(match response.status {
            200 => {
                status.state = Some(ArtefactState::Ready);
                SyncOutcome::synced()
            }
            202 => {
                status.state = Some(ArtefactState::Pending);
                SyncOutcome::poll_after(POLL_INTERVAL)
            }
            _ => {
                status.state = Some(ArtefactState::Pending);
                SyncOutcome::synced()
            }
        })
    }

    async fn withdraw(
        &self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<PartnerResponse<()>, ControllerError> {
        Ok(partner
            .remove_artefact(context_id, ExternalId::of(self).as_str())
            .await?)
    }
}

impl Reconciler {
    /// Reconciles the Artefact `name`
    pub async fn reconcile_artefact(&self, name: &str) -> Result<Action, ControllerError> {
        self.reconcile_federated(self.stores.artefacts.as_ref(), name).await
    }
}
