//! ApplicationInstance reconciliation.
//!
//! Installation is asynchronous at the partner. The first successful pass
//! installs and marks the instance Ready/Pending; later passes poll the
//! instance details every few seconds until the partner reports READY (access
//! points published) or FAILED.

use super::lifecycle::{FederatedResource, SyncOutcome};
use super::{POLL_INTERVAL, Reconciler};
use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{
    APPLICATION_INSTANCE_FINALIZER, AccessPoint, AccessPointInfo, ApplicationInstance,
    ApplicationInstanceState, ApplicationInstanceStatus, ExternalId, Phase,
};
use kube_runtime::controller::Action;
use partner_client::{
    AppInstanceDetails, InstallAppRequest, InstallZoneInfo, InterfaceAccessPoints, PartnerApi,
    PartnerResponse, ResponseClass,
};
use tracing::info;

/// Install request of `instance`
pub(crate) fn install_request(instance: &ApplicationInstance) -> InstallAppRequest {
    let spec = &instance.spec;
    InstallAppRequest {
        app_id: spec.app_id.clone(),
        app_version: spec.app_version.clone(),
        app_provider_id: spec.app_provider_id.clone(),
        zone_info: InstallZoneInfo {
            zone_id: spec.zone_info.zone_id.clone(),
            flavour_id: spec.zone_info.flavour_id.clone(),
            resource_consumption: spec.zone_info.resource_consumption.clone(),
            res_pool: spec.zone_info.res_pool.clone(),
        },
        app_instance_id: ExternalId::of(instance).to_string(),
        app_inst_callback_link: spec.call_back_link.clone(),
    }
}

fn access_point_info(interfaces: Vec<InterfaceAccessPoints>) -> Vec<AccessPointInfo> {
    interfaces
        .into_iter()
        .map(|interface| AccessPointInfo {
            interface_id: interface.interface_id,
            access_points: interface
                .access_points
                .into_iter()
                .map(|ep| AccessPoint {
                    port: ep.port,
                    fqdn: ep.fqdn,
                    ipv4_addresses: ep.ipv4_addresses,
                    ipv6_addresses: ep.ipv6_addresses,
                })
                .collect(),
        })
        .collect()
}

fn state(instance: &ApplicationInstance) -> Option<ApplicationInstanceState> {
    instance.status.as_ref().and_then(|s| s.state)
}

/// Whether the partner accepted the install; a failed instance is reinstalled
fn is_installed(instance: &ApplicationInstance) -> bool {
    matches!(
        state(instance),
        Some(
            ApplicationInstanceState::Pending
                | ApplicationInstanceState::Terminating
                | ApplicationInstanceState::Ready
        )
    )
}

async fn install(
    instance: &mut ApplicationInstance,
    partner: &dyn PartnerApi,
    context_id: &str,
) -> Result<SyncOutcome, ControllerError> {
    let sentinel = ApplicationInstance::MISSING_DEPENDENCY;
    let request = install_request(instance);
    let response = partner.install_app(context_id, &request).await?;

    if response.class(sentinel) != ResponseClass::Success {
        return Ok(SyncOutcome::from_response(&response, sentinel));
    }

    let status = instance.status.get_or_insert_with(Default::default);
    status.phase = Some(Phase::Ready);
    status.state = Some(ApplicationInstanceState::Pending);
    status.error_msg = None;
    Ok(SyncOutcome::poll_after(POLL_INTERVAL))
}

async fn poll(
    instance: &mut ApplicationInstance,
    partner: &dyn PartnerApi,
    context_id: &str,
) -> Result<SyncOutcome, ControllerError> {
    let sentinel = ApplicationInstance::MISSING_DEPENDENCY;
    let instance_id = ExternalId::of(instance);
    let response = partner
        .get_app_instance_details(
            context_id,
            &instance.spec.app_id,
            instance_id.as_str(),
            &instance.spec.zone_info.zone_id,
        )
        .await?;

    if response.class(sentinel) != ResponseClass::Success {
        return Ok(SyncOutcome::from_response(&response, sentinel));
    }

    let details: AppInstanceDetails = response.body.unwrap_or_default();
    let reported = details
        .app_instance_state
        .as_deref()
        .unwrap_or_default()
        .to_ascii_uppercase();
    let status = instance.status.get_or_insert_with(Default::default);

    if reported == "FAILED" {
        info!(instance = %instance_id, "partner reported instance failure");
        status.phase = Some(Phase::Error);
        status.state = Some(ApplicationInstanceState::Failed);
        status.error_msg = Some("partner reported instance failure".to_string());
        return Ok(SyncOutcome::synced());
    }

    status.phase = Some(Phase::Ready);
    status.error_msg = None;
    Ok(match reported.as_str() {
        "READY" => {
            status.state = Some(ApplicationInstanceState::Ready);
            status.access_point_info = access_point_info(details.accesspoint_info);
            SyncOutcome::synced()
        }
        "TERMINATING" => {
            status.state = Some(ApplicationInstanceState::Terminating);
            SyncOutcome::poll_after(POLL_INTERVAL)
        }
        _ => {
            status.state = Some(ApplicationInstanceState::Pending);
            SyncOutcome::poll_after(POLL_INTERVAL)
        }
    })
}

#[async_trait]
impl FederatedResource for ApplicationInstance {
    const KIND: &'static str = "ApplicationInstance";
    const FINALIZER: &'static str = APPLICATION_INSTANCE_FINALIZER;
    const MISSING_DEPENDENCY: Option<&'static str> = Some("application not found");

    type Status = ApplicationInstanceStatus;

    fn status_snapshot(&self) -> Option<ApplicationInstanceStatus> {
        self.status.clone()
    }

    fn phase(&self) -> Option<Phase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    fn set_phase(&mut self, phase: Phase) {
        self.status.get_or_insert_with(Default::default).phase = Some(phase);
    }

    /// Polling continues through transient problems until the partner
    /// reported a final state.
    fn is_settled(&self) -> bool {
        matches!(
            state(self),
            Some(ApplicationInstanceState::Ready | ApplicationInstanceState::Failed)
        )
    }

    fn record_rejection(&mut self, detail: &str) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Error);
        status.state = Some(ApplicationInstanceState::Failed);
        status.error_msg = Some(detail.to_string());
    }

    fn record_unclassified(&mut self, status_code: u16) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Error);
        status.error_msg = Some(format!("unexpected partner status {status_code}"));
    }

    async fn push(
        &mut self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<SyncOutcome, ControllerError> {
        if is_installed(self) {
            poll(self, partner, context_id).await
        } else {
            install(self, partner, context_id).await
        }
    }

    async fn withdraw(
        &self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<PartnerResponse<()>, ControllerError> {
        Ok(partner
            .remove_app(
                context_id,
                &self.spec.app_id,
                ExternalId::of(self).as_str(),
                &self.spec.zone_info.zone_id,
            )
            .await?)
    }
}

impl Reconciler {
    /// Reconciles the ApplicationInstance `name`
    pub async fn reconcile_application_instance(
        &self,
        name: &str,
    ) -> Result<Action, ControllerError> {
        self.reconcile_federated(self.stores.application_instances.as_ref(), name)
            .await
    }
}
