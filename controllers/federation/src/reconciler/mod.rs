//! Reconciliation logic for federated resources.
//!
//! One [`Reconciler`] serves every watched kind. Federations are reconciled
//! directly; the child kinds share the lifecycle driver in [`lifecycle`] and
//! only supply their partner calls and status mapping.

pub mod application;
pub mod application_instance;
pub mod artefact;
pub mod availability_zone;
pub mod federation;
pub mod file;
pub mod lifecycle;

#[cfg(test)]
mod application_instance_test;
#[cfg(test)]
mod availability_zone_test;

use crate::backoff::FibonacciBackoff;
use crate::directory::FederationDirectory;
use crate::error::ControllerError;
use crate::store::ResourceStore;
use crds::{
    Application, ApplicationInstance, Artefact, AvailabilityZone, ExternalId, Federation, File,
};
use kube::{Resource, ResourceExt};
use partner_client::{PartnerApi, PartnerClientRegistry};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// Requeue delay after a failed or rejected partner call
pub const FAILURE_REQUEUE: Duration = Duration::from_secs(5);
/// Interval between polls of asynchronous partner work
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Delay before the follow-up pass of a federation whose offers changed
pub const NEXT_PASS: Duration = Duration::from_secs(1);

/// Stores for every reconciled kind
#[derive(Clone)]
pub struct Stores {
    /// Federation store
    pub federations: Arc<dyn ResourceStore<Federation>>,
    /// AvailabilityZone store
    pub availability_zones: Arc<dyn ResourceStore<AvailabilityZone>>,
    /// File store
    pub files: Arc<dyn ResourceStore<File>>,
    /// Artefact store
    pub artefacts: Arc<dyn ResourceStore<Artefact>>,
    /// Application store
    pub applications: Arc<dyn ResourceStore<Application>>,
    /// ApplicationInstance store
    pub application_instances: Arc<dyn ResourceStore<ApplicationInstance>>,
}

/// Reconciles custom resources against partner operators.
pub struct Reconciler {
    pub(crate) stores: Stores,
    pub(crate) directory: FederationDirectory,
    pub(crate) partners: Arc<PartnerClientRegistry>,
    /// Error backoff per `kind/name`
    backoff_states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("partners", &self.partners)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a reconciler over `stores`, reaching partners through `partners`.
    pub fn new(stores: Stores, partners: Arc<PartnerClientRegistry>) -> Self {
        let directory = FederationDirectory::new(Arc::clone(&stores.federations));
        Self {
            stores,
            directory,
            partners,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Partner client of a guest federation, built on first use.
    ///
    /// Keyed by the federation's external id; the guest credentials supply
    /// the base URL and caller id.
    pub(crate) fn partner_for(
        &self,
        federation: &Federation,
    ) -> Result<Arc<dyn PartnerApi>, ControllerError> {
        let credentials = federation
            .spec
            .guest_partner_credentials
            .as_ref()
            .ok_or_else(|| ControllerError::MissingCredentials(federation.name_any()))?;

        Ok(self.partners.get_or_create(
            ExternalId::of(federation).as_str(),
            &credentials.token_url,
            &credentials.client_id,
        )?)
    }

    /// Next error backoff for `key`
    pub fn error_backoff(&self, key: &str) -> Duration {
        match self.backoff_states.lock() {
            Ok(mut states) => states.entry(key.to_string()).or_default().next_backoff(),
            Err(_) => Duration::from_secs(crate::backoff::MIN_BACKOFF_SECS),
        }
    }

    /// Forgets the error backoff of `key` after a successful pass
    pub fn reset_backoff(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(key);
        }
    }

    /// Forgets the error backoff of every `kind` object `is_live` rejects
    pub fn prune_backoff(&self, kind: &str, is_live: impl Fn(&str) -> bool) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.retain(|key, _| match key.split_once('/') {
                Some((k, name)) if k == kind => is_live(name),
                _ => true,
            });
        }
    }
}

/// Writes the status of `obj`, logging instead of failing.
///
/// A lost status write is recomputed on the next pass.
pub(crate) async fn persist_status<K>(store: &dyn ResourceStore<K>, kind: &str, obj: &K)
where
    K: Resource + Sync,
{
    if let Err(e) = store.update_status(obj).await {
        warn!(kind, name = %obj.name_any(), error = %e, "failed to update status");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crds::FederationRelation;

    #[test]
    fn test_partner_for_requires_credentials() {
        let env = TestEnv::new();
        let mut fed = create_test_federation("fed", FederationRelation::Guest, Some("ctx-1"));
        fed.spec.guest_partner_credentials = None;

        assert!(matches!(
            env.reconciler.partner_for(&fed),
            Err(ControllerError::MissingCredentials(name)) if name == "fed"
        ));
    }

    #[test]
    fn test_partner_for_uses_registered_client() {
        let env = TestEnv::new();
        let fed = create_test_federation("fed", FederationRelation::Guest, Some("ctx-1"));

        let client = env.reconciler.partner_for(&fed).unwrap();
        assert_eq!(client.base_url(), TEST_PARTNER_URL);
        assert_eq!(env.reconciler.partners.len(), 1);
    }

    #[test]
    fn test_error_backoff_is_per_key_and_resets() {
        let env = TestEnv::new();
        let r = &env.reconciler;

        assert_eq!(r.error_backoff("File/a").as_secs(), 5);
        assert_eq!(r.error_backoff("File/a").as_secs(), 5);
        assert_eq!(r.error_backoff("File/a").as_secs(), 10);
        assert_eq!(r.error_backoff("File/b").as_secs(), 5);

        r.reset_backoff("File/a");
        assert_eq!(r.error_backoff("File/a").as_secs(), 5);
    }

    #[test]
    fn test_prune_backoff_drops_vanished_objects_of_one_kind() {
        let env = TestEnv::new();
        let r = &env.reconciler;
        for key in ["File/gone", "File/gone", "File/kept", "Artefact/gone"] {
            r.error_backoff(key);
        }

        r.prune_backoff("File", |name| name == "kept");

        let mut keys: Vec<_> = r.backoff_states.lock().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["Artefact/gone", "File/kept"]);
        assert_eq!(r.error_backoff("File/gone").as_secs(), 5);
    }
}
