//! AvailabilityZone reconciliation.
//!
//! Zones have no partner-side object; both relations converge locally once
//! their federation resolves.

use super::Reconciler;
use super::lifecycle::{FederatedResource, SyncOutcome};
use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{AVAILABILITY_ZONE_FINALIZER, AvailabilityZone, AvailabilityZoneStatus, Phase};
use kube_runtime::controller::Action;
use partner_client::{PartnerApi, PartnerResponse};

#[async_trait]
impl FederatedResource for AvailabilityZone {
    const KIND: &'static str = "AvailabilityZone";
    const FINALIZER: &'static str = AVAILABILITY_ZONE_FINALIZER;
    const PARTNER_SIDE: bool = false;

    type Status = AvailabilityZoneStatus;

    fn status_snapshot(&self) -> Option<AvailabilityZoneStatus> {
        self.status.clone()
    }

    fn phase(&self) -> Option<Phase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    fn set_phase(&mut self, phase: Phase) {
        self.status.get_or_insert_with(Default::default).phase = Some(phase);
    }

    async fn push(
        &mut self,
        _partner: &dyn PartnerApi,
        _context_id: &str,
    ) -> Result<SyncOutcome, ControllerError> {
        self.converge_locally();
        Ok(SyncOutcome::synced())
    }

    async fn withdraw(
        &self,
        _partner: &dyn PartnerApi,
        _context_id: &str,
    ) -> Result<PartnerResponse<()>, ControllerError> {
        Ok(PartnerResponse::empty(204))
    }
}

impl Reconciler {
    /// Reconciles the AvailabilityZone `name`
    pub async fn reconcile_availability_zone(&self, name: &str) -> Result<Action, ControllerError> {
        self.reconcile_federated(self.stores.availability_zones.as_ref(), name)
            .await
    }
}
