//! Federation reconciliation.
//!
//! A guest federation is (re)created at the partner on every pass; the
//! partner answers with the context id and the zones it currently offers.
//! Changed offers are written to status and acceptance waits for the next
//! pass, so it always works from persisted offers. With exactly one offered
//! zone and no prior acceptance, that zone is subscribed and recorded in spec.

use super::{FAILURE_REQUEUE, NEXT_PASS, Reconciler, persist_status};
use crate::error::ControllerError;
use crds::{
    ExternalId, FEDERATION_FINALIZER, Federation, FederationRelation, FederationState,
    OfferedZone, Phase, add_finalizer, has_finalizer, is_deleting, remove_finalizer,
};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use partner_client::{
    CallbackCredentials, FederationRequestData, MobileNetworkIds, PartnerApi, ResponseClass,
    ZoneDetails, ZoneRegistrationRequestData, deletion_confirmed,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const KIND: &str = "Federation";

/// What refreshing the partner's offers did
#[derive(Debug, Clone, PartialEq, Eq)]
enum OfferRefresh {
    /// Offers, state or phase changed and were written
    Updated,
    /// Offers match the persisted ones
    Unchanged,
    /// The partner call failed; carries the follow-up action
    Failed(Action),
}

/// Create request for `federation`
pub(crate) fn federation_request(federation: &Federation) -> FederationRequestData {
    let spec = &federation.spec;
    FederationRequestData {
        orig_op_federation_id: ExternalId::of(federation).to_string(),
        orig_op_country_code: Some(spec.origin_op.country_code.clone()).filter(|c| !c.is_empty()),
        orig_op_mobile_network_codes: spec.origin_op.mobile_network_codes.as_ref().map(|codes| {
            MobileNetworkIds {
                mcc: codes.mcc.clone(),
                mncs: codes.mncs.clone(),
            }
        }),
        orig_op_fixed_network_codes: spec.origin_op.fixed_network_codes.clone(),
        initial_date: spec.initial_date.map(|date| date.to_rfc3339()),
        partner_status_link: spec.partner.status_link.clone(),
        partner_callback_credentials: spec.partner.callback_credentials.as_ref().map(|c| {
            CallbackCredentials {
                token_url: c.token_url.clone(),
                client_id: c.client_id.clone(),
            }
        }),
    }
}

/// Offers are equal as sets of zone ids with equal cardinality
pub(crate) fn same_offers(persisted: &[OfferedZone], offered: &[OfferedZone]) -> bool {
    if persisted.len() != offered.len() {
        return false;
    }
    let ids: HashSet<&str> = persisted.iter().map(|z| z.zone_id.as_str()).collect();
    offered.iter().all(|z| ids.contains(z.zone_id.as_str()))
}

fn offered_zone(zone: ZoneDetails) -> OfferedZone {
    OfferedZone {
        zone_id: zone.zone_id,
        geolocation: zone.geolocation,
        geography_details: zone.geography_details,
    }
}

impl Reconciler {
    /// Reconciles the Federation `name`
    pub async fn reconcile_federation(&self, name: &str) -> Result<Action, ControllerError> {
        let store = self.stores.federations.as_ref();
        let Some(mut federation) = store.get(name).await? else {
            debug!(kind = KIND, name = %name, "resource no longer exists");
            return Ok(Action::await_change());
        };
        let relation = FederationRelation::of(&federation);
        debug!(kind = KIND, name = %name, %relation, "reconciling");

        if is_deleting(&federation) {
            return self.finalize_federation(federation, relation).await;
        }

        if add_finalizer(&mut federation, FEDERATION_FINALIZER) {
            store.update(&federation).await?;
            info!(kind = KIND, name = %name, "added finalizer");
            return Ok(Action::await_change());
        }

        if !relation.is_guest() {
            let before = federation.status.clone();
            federation.status.get_or_insert_with(Default::default).phase = Some(Phase::Ready);
            if federation.status != before {
                persist_status(store, KIND, &federation).await;
            }
            return Ok(Action::await_change());
        }

        let partner = self.partner_for(&federation)?;
        match self.refresh_offers(&mut federation, partner.as_ref()).await? {
            OfferRefresh::Updated => Ok(Action::requeue(NEXT_PASS)),
            OfferRefresh::Unchanged => self.accept_offered_zone(&federation, partner.as_ref()).await,
            OfferRefresh::Failed(action) => Ok(action),
        }
    }

    async fn refresh_offers(
        &self,
        federation: &mut Federation,
        partner: &dyn PartnerApi,
    ) -> Result<OfferRefresh, ControllerError> {
        let store = self.stores.federations.as_ref();
        let name = federation.name_any();
        let before = federation.status.clone();
        let response = partner
            .create_federation(&federation_request(federation))
            .await?;

        let refresh = match response.class(None) {
            ResponseClass::Success => {
                let body = response.body.unwrap_or_default();
                let offered: Vec<OfferedZone> = body
                    .offered_availability_zones
                    .into_iter()
                    .map(offered_zone)
                    .collect();
                let status = federation.status.get_or_insert_with(Default::default);

                if status.state == Some(FederationState::Available)
                    && status.phase == Some(Phase::Ready)
                    && same_offers(&status.offered_availability_zones, &offered)
                {
                    debug!(kind = KIND, name = %name, "offered zones unchanged");
                    return Ok(OfferRefresh::Unchanged);
                }

                let recorded = status
                    .federation_context_id
                    .clone()
                    .filter(|id| !id.is_empty());
                match recorded {
                    Some(current) if current != body.federation_context_id => {
                        warn!(
                            kind = KIND,
                            name = %name,
                            current = %current,
                            reported = %body.federation_context_id,
                            "partner reported a different context id, keeping the recorded one"
                        );
                    }
                    Some(_) => {}
                    None if !body.federation_context_id.is_empty() => {
                        status.federation_context_id = Some(body.federation_context_id);
                    }
                    None => {}
                }
                info!(kind = KIND, name = %name, zones = offered.len(), "partner offers updated");
                status.offered_availability_zones = offered;
                status.state = Some(FederationState::Available);
                status.phase = Some(Phase::Ready);
                OfferRefresh::Updated
            }
            ResponseClass::PermanentRejection(detail) => {
                warn!(kind = KIND, name = %name, detail = %detail, "partner rejected federation");
                federation.status.get_or_insert_with(Default::default).phase = Some(Phase::Error);
                OfferRefresh::Failed(Action::requeue(FAILURE_REQUEUE))
            }
            ResponseClass::TransientProblem => {
                info!(
                    kind = KIND,
                    name = %name,
                    status = response.status,
                    detail = response.detail(),
                    "partner reported a retryable problem"
                );
                let action = if federation.phase() == Some(Phase::Ready) {
                    Action::await_change()
                } else {
                    Action::requeue(FAILURE_REQUEUE)
                };
                return Ok(OfferRefresh::Failed(action));
            }
            ResponseClass::Unclassified => {
                warn!(
                    kind = KIND,
                    name = %name,
                    status = response.status,
                    detail = response.detail(),
                    "unexpected partner status"
                );
                federation.status.get_or_insert_with(Default::default).phase = Some(Phase::Error);
                OfferRefresh::Failed(Action::requeue(FAILURE_REQUEUE))
            }
        };

        if federation.status != before {
            persist_status(store, KIND, federation).await;
        }
        Ok(refresh)
    }

    /// Subscribes to the single offered zone unless already accepted
    async fn accept_offered_zone(
        &self,
        federation: &Federation,
        partner: &dyn PartnerApi,
    ) -> Result<Action, ControllerError> {
        let store = self.stores.federations.as_ref();
        let name = federation.name_any();
        let offered = federation
            .status
            .as_ref()
            .map(|s| s.offered_availability_zones.as_slice())
            .unwrap_or_default();

        let [zone] = offered else {
            debug!(kind = KIND, name = %name, zones = offered.len(), "no single zone to accept");
            return Ok(Action::await_change());
        };
        if federation
            .spec
            .accepted_availability_zones
            .contains(&zone.zone_id)
        {
            return Ok(Action::await_change());
        }
        let Some(context_id) = federation.status_context_id() else {
            return Ok(Action::await_change());
        };

        let request = ZoneRegistrationRequestData {
            accepted_availability_zones: vec![zone.zone_id.clone()],
            avail_zone_notif_link: federation.spec.partner.status_link.clone(),
        };
        let response = partner.zone_subscribe(context_id, &request).await?;

        match response.class(None) {
            ResponseClass::Success => {
                let Some(mut latest) = store.get(&name).await? else {
                    return Ok(Action::await_change());
                };
                latest.spec.accepted_availability_zones = vec![zone.zone_id.clone()];
                store.update(&latest).await?;
                info!(kind = KIND, name = %name, zone = %zone.zone_id, "accepted offered zone");
                Ok(Action::await_change())
            }
            ResponseClass::TransientProblem => {
                info!(
                    kind = KIND,
                    name = %name,
                    status = response.status,
                    detail = response.detail(),
                    "zone subscription hit a retryable problem"
                );
                Ok(Action::requeue(FAILURE_REQUEUE))
            }
            ResponseClass::PermanentRejection(_) | ResponseClass::Unclassified => {
                warn!(
                    kind = KIND,
                    name = %name,
                    status = response.status,
                    detail = response.detail(),
                    "zone subscription failed"
                );
                let mut failed = federation.clone();
                failed.status.get_or_insert_with(Default::default).phase = Some(Phase::Error);
                persist_status(store, KIND, &failed).await;
                Ok(Action::requeue(FAILURE_REQUEUE))
            }
        }
    }

    async fn finalize_federation(
        &self,
        federation: Federation,
        relation: FederationRelation,
    ) -> Result<Action, ControllerError> {
        let store = self.stores.federations.as_ref();
        let name = federation.name_any();
        if !has_finalizer(&federation, FEDERATION_FINALIZER) {
            debug!(kind = KIND, name = %name, "deleting without our finalizer");
            return Ok(Action::await_change());
        }

        if relation.is_guest() {
            match federation.status_context_id() {
                Some(context_id) => {
                    let partner = self.partner_for(&federation)?;
                    let response = partner.delete_federation(context_id).await?;
                    if !deletion_confirmed(response.status) {
                        warn!(
                            kind = KIND,
                            name = %name,
                            status = response.status,
                            detail = response.detail(),
                            "partner did not confirm removal, keeping finalizer"
                        );
                        let mut failed = federation.clone();
                        failed.status.get_or_insert_with(Default::default).phase =
                            Some(Phase::Error);
                        if failed.status != federation.status {
                            persist_status(store, KIND, &failed).await;
                        }
                        return Err(ControllerError::RemoteDeletion {
                            kind: KIND,
                            name,
                            status: response.status,
                        });
                    }
                    info!(kind = KIND, name = %name, context_id, "partner removed federation");
                }
                None => {
                    info!(kind = KIND, name = %name, "no context id recorded, skipping partner teardown");
                }
            }
        }

        let Some(mut latest) = store.get(&name).await? else {
            return Ok(Action::await_change());
        };
        if remove_finalizer(&mut latest, FEDERATION_FINALIZER) {
            store.update(&latest).await?;
            info!(kind = KIND, name = %name, "removed finalizer");
        }
        Ok(Action::await_change())
    }
}
