//! Partner client registry
//!
//! Process-wide cache holding one client per federation. Clients are built
//! lazily on first use and live until the process exits; a federation whose
//! URL changes needs a new key.

use crate::client::PartnerClient;
use crate::error::PartnerError;
use crate::partner_trait::PartnerApi;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Builds a client for `(url, caller_id)`
pub type ClientFactory =
    dyn Fn(&str, &str) -> Result<Arc<dyn PartnerApi>, PartnerError> + Send + Sync;

/// Maps a federation identity to its cached partner client
pub struct PartnerClientRegistry {
    clients: Mutex<HashMap<String, Arc<dyn PartnerApi>>>,
    factory: Box<ClientFactory>,
}

impl fmt::Debug for PartnerClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartnerClientRegistry")
            .field("clients", &self.len())
            .finish_non_exhaustive()
    }
}

impl PartnerClientRegistry {
    /// Registry building [`PartnerClient`]s
    #[must_use]
    pub fn new(insecure_skip_verify: bool) -> Self {
        Self::with_factory(move |url, caller_id| {
            let client = PartnerClient::new(url, caller_id, insecure_skip_verify)?;
            Ok(Arc::new(client) as Arc<dyn PartnerApi>)
        })
    }

    /// Registry building clients with `factory`
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&str, &str) -> Result<Arc<dyn PartnerApi>, PartnerError> + Send + Sync + 'static,
    {
        Self {
            clients: Mutex::new(HashMap::new()),
            factory: Box::new(factory),
        }
    }

    /// Returns the client cached for `federation_id`, building it on first use.
    ///
    /// Lookup and insert happen under one lock, so concurrent callers for the
    /// same federation observe a single construction. A failed construction
    /// is not cached.
    pub fn get_or_create(
        &self,
        federation_id: &str,
        url: &str,
        caller_id: &str,
    ) -> Result<Arc<dyn PartnerApi>, PartnerError> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|e| PartnerError::Registry(e.to_string()))?;

        if let Some(client) = clients.get(federation_id) {
            return Ok(Arc::clone(client));
        }

        let client = (self.factory)(url, caller_id)?;
        info!(federation_id, url, "created partner client");
        clients.insert(federation_id.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Registers `client` for `federation_id`, replacing any cached one
    pub fn insert(
        &self,
        federation_id: impl Into<String>,
        client: Arc<dyn PartnerApi>,
    ) -> Result<(), PartnerError> {
        self.clients
            .lock()
            .map_err(|e| PartnerError::Registry(e.to_string()))?
            .insert(federation_id.into(), client);
        Ok(())
    }

    /// Number of cached clients
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Whether no client has been cached yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPartnerClient;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_registry() -> (PartnerClientRegistry, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let registry = PartnerClientRegistry::with_factory(move |url, _caller| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockPartnerClient::new(url)) as Arc<dyn PartnerApi>)
        });
        (registry, built)
    }

    #[test]
    fn test_client_is_built_once_per_federation() {
        let (registry, built) = counting_registry();

        let first = registry.get_or_create("fed-a", "https://a", "guest").unwrap();
        let again = registry.get_or_create("fed-a", "https://ignored", "other").unwrap();
        let other = registry.get_or_create("fed-b", "https://b", "guest").unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.base_url(), "https://a");
        assert_eq!(other.base_url(), "https://b");
        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_failed_construction_is_not_cached() {
        let registry = PartnerClientRegistry::new(false);
        assert!(registry.get_or_create("fed-a", "", "guest").is_err());
        assert!(registry.is_empty());

        let client = registry.get_or_create("fed-a", "https://partner", "guest").unwrap();
        assert_eq!(client.base_url(), "https://partner");
    }

    #[test]
    fn test_insert_overrides_cached_client() {
        let (registry, built) = counting_registry();
        registry.get_or_create("fed-a", "https://a", "guest").unwrap();
        registry
            .insert("fed-a", Arc::new(MockPartnerClient::new("https://override")))
            .unwrap();

        let client = registry.get_or_create("fed-a", "https://a", "guest").unwrap();
        assert_eq!(client.base_url(), "https://override");
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lookups_build_one_client() {
        let (registry, built) = counting_registry();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry.get_or_create("fed-a", "https://a", "guest").map(|c| c.base_url().to_string())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "https://a");
        }
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }
}
