//! Shared lifecycle of federated child resources.
//!
//! Every child kind walks the same steps on each pass:
//!
//! 1. resolve the parent federation from the child's labels
//! 2. make sure our finalizer is present (then wait for the next event)
//! 3. on deletion, withdraw the partner-side object (guest only) and drop
//!    the finalizer once the partner confirmed removal
//! 4. guest: push the object to the partner and map the answer onto status;
//!    host: converge status locally
//!
//! Kinds plug in through [`FederatedResource`].

use super::{FAILURE_REQUEUE, Reconciler, persist_status};
use crate::error::ControllerError;
use crate::store::ResourceStore;
use async_trait::async_trait;
use crds::{FederationRef, Phase, add_finalizer, has_finalizer, is_deleting, remove_finalizer};
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use partner_client::{PartnerApi, PartnerResponse, ResponseClass, deletion_confirmed};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of pushing a guest object to the partner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The partner accepted the object; status already reflects it
    Synced {
        /// Poll again after this delay
        requeue_after: Option<Duration>,
    },
    /// Permanent rejection with the partner's detail
    Rejected(String),
    /// Retryable problem
    Transient {
        /// Answered status
        status: u16,
        /// Problem detail
        detail: Option<String>,
    },
    /// Status outside every known class
    Unclassified {
        /// Answered status
        status: u16,
        /// Problem detail
        detail: Option<String>,
    },
}

impl SyncOutcome {
    /// Accepted, nothing left to poll
    #[must_use]
    pub fn synced() -> Self {
        Self::Synced {
            requeue_after: None,
        }
    }

    /// Accepted, poll again after `interval`
    #[must_use]
    pub fn poll_after(interval: Duration) -> Self {
        Self::Synced {
            requeue_after: Some(interval),
        }
    }

    /// Maps a partner answer that the kind did not handle as success
    pub fn from_response<T>(response: &PartnerResponse<T>, sentinel: Option<&str>) -> Self {
        let detail = response.detail().map(str::to_string);
        match response.class(sentinel) {
            ResponseClass::Success => Self::synced(),
            ResponseClass::PermanentRejection(detail) => Self::Rejected(detail),
            ResponseClass::TransientProblem => Self::Transient {
                status: response.status,
                detail,
            },
            ResponseClass::Unclassified => Self::Unclassified {
                status: response.status,
                detail,
            },
        }
    }
}

/// A child kind reconciled through the shared lifecycle
#[async_trait]
pub trait FederatedResource:
    Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Debug + Send + Sync + 'static
{
    /// Kind name used in logs and errors
    const KIND: &'static str;
    /// Finalizer guarding partner-side cleanup
    const FINALIZER: &'static str;
    /// 500 detail the partner uses for a missing dependency of this kind
    const MISSING_DEPENDENCY: Option<&'static str> = None;
    /// Whether the kind has a partner-side counterpart
    const PARTNER_SIDE: bool = true;

    /// Status type compared before writing
    type Status: Clone + PartialEq + Send + Sync;

    /// Snapshot of the current status
    fn status_snapshot(&self) -> Option<Self::Status>;

    /// Current phase
    fn phase(&self) -> Option<Phase>;

    /// Sets the phase, creating the status when absent
    fn set_phase(&mut self, phase: Phase);

    /// Whether a transient partner problem leaves nothing to retry
    fn is_settled(&self) -> bool {
        self.phase() == Some(Phase::Ready)
    }

    /// Whether status records an earlier successful create
    fn is_created(&self) -> bool {
        false
    }

    /// Records that the partner already holds the object
    fn record_existing(&mut self) {
        self.set_phase(Phase::Ready);
    }

    /// Records a permanent rejection
    fn record_rejection(&mut self, _detail: &str) {
        self.set_phase(Phase::Error);
    }

    /// Records an answer outside every known class
    fn record_unclassified(&mut self, _status: u16) {
        self.set_phase(Phase::Error);
    }

    /// Converges status without talking to the partner
    fn converge_locally(&mut self) {
        self.set_phase(Phase::Ready);
    }

    /// Creates or refreshes the partner-side object
    async fn push(
        &mut self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<SyncOutcome, ControllerError>;

    /// Removes the partner-side object
    async fn withdraw(
        &self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<PartnerResponse<()>, ControllerError>;
}

impl Reconciler {
    /// Runs one lifecycle pass for the child `name`
    pub(crate) async fn reconcile_federated<K: FederatedResource>(
        &self,
        store: &dyn ResourceStore<K>,
        name: &str,
    ) -> Result<Action, ControllerError> {
        let Some(mut obj) = store.get(name).await? else {
            debug!(kind = K::KIND, name = %name, "resource no longer exists");
            return Ok(Action::await_change());
        };

        let fed_ref = FederationRef::of(&obj);
        debug!(kind = K::KIND, name = %name, federation = %fed_ref, "reconciling");

        let federation = match self.directory.resolve(&fed_ref).await {
            Ok(federation) => federation,
            Err(e) => {
                error!(kind = K::KIND, name = %name, error = %e, "federation lookup failed");
                let before = obj.status_snapshot();
                obj.set_phase(Phase::Error);
                if obj.status_snapshot() != before {
                    persist_status(store, K::KIND, &obj).await;
                }
                return Err(e);
            }
        };

        if is_deleting(&obj) {
            return self.finalize(store, obj, &fed_ref, &federation).await;
        }

        if add_finalizer(&mut obj, K::FINALIZER) {
            store.update(&obj).await?;
            info!(kind = K::KIND, name = %name, "added finalizer");
            return Ok(Action::await_change());
        }

        let before = obj.status_snapshot();

        if !fed_ref.relation.is_guest() || !K::PARTNER_SIDE {
            obj.converge_locally();
            if obj.status_snapshot() != before {
                persist_status(store, K::KIND, &obj).await;
            }
            return Ok(Action::await_change());
        }

        let partner = self.partner_for(&federation)?;
        let outcome = obj.push(partner.as_ref(), &fed_ref.context_id).await?;

        let action = match outcome {
            SyncOutcome::Synced { requeue_after } => {
                debug!(kind = K::KIND, name = %name, ?requeue_after, "partner accepted resource");
                requeue_after.map_or_else(Action::await_change, Action::requeue)
            }
            SyncOutcome::Rejected(detail) => {
                warn!(kind = K::KIND, name = %name, detail = %detail, "partner rejected resource");
                obj.record_rejection(&detail);
                Action::requeue(FAILURE_REQUEUE)
            }
            SyncOutcome::Transient { status: 409, .. } if obj.is_created() => {
                debug!(kind = K::KIND, name = %name, "partner already holds resource");
                obj.record_existing();
                Action::await_change()
            }
            SyncOutcome::Transient { status, detail } => {
                info!(
                    kind = K::KIND,
                    name = %name,
                    status,
                    detail = detail.as_deref(),
                    "partner reported a retryable problem"
                );
                if obj.is_settled() {
                    Action::await_change()
                } else {
                    Action::requeue(FAILURE_REQUEUE)
                }
            }
            SyncOutcome::Unclassified { status, detail } => {
                warn!(
                    kind = K::KIND,
                    name = %name,
                    status,
                    detail = detail.as_deref(),
                    "unexpected partner status"
                );
                obj.record_unclassified(status);
                Action::requeue(FAILURE_REQUEUE)
            }
        };

        if obj.status_snapshot() != before {
            persist_status(store, K::KIND, &obj).await;
        }
        Ok(action)
    }

    async fn finalize<K: FederatedResource>(
        &self,
        store: &dyn ResourceStore<K>,
        mut obj: K,
        fed_ref: &FederationRef,
        federation: &crds::Federation,
    ) -> Result<Action, ControllerError> {
        let name = obj.name_any();
        if !has_finalizer(&obj, K::FINALIZER) {
            debug!(kind = K::KIND, name = %name, "deleting without our finalizer");
            return Ok(Action::await_change());
        }

        if fed_ref.relation.is_guest() && K::PARTNER_SIDE {
            let partner = self.partner_for(federation)?;
            let response = obj.withdraw(partner.as_ref(), &fed_ref.context_id).await?;
            if !deletion_confirmed(response.status) {
                warn!(
                    kind = K::KIND,
                    name = %name,
                    status = response.status,
                    detail = response.detail(),
                    "partner did not confirm removal, keeping finalizer"
                );
                let before = obj.status_snapshot();
                obj.set_phase(Phase::Error);
                if obj.status_snapshot() != before {
                    persist_status(store, K::KIND, &obj).await;
                }
                return Err(ControllerError::RemoteDeletion {
                    kind: K::KIND,
                    name,
                    status: response.status,
                });
            }
            info!(kind = K::KIND, name = %name, status = response.status, "partner removed resource");
        }

        let Some(mut latest) = store.get(&name).await? else {
            return Ok(Action::await_change());
        };
        if remove_finalizer(&mut latest, K::FINALIZER) {
            store.update(&latest).await?;
            info!(kind = K::KIND, name = %name, "removed finalizer");
        }
        Ok(Action::await_change())
    }
}
