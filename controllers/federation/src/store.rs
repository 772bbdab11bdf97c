//! Object store seam between reconcilers and the Kubernetes API.
//!
//! Reconcilers read and write custom resources only through
//! [`ResourceStore`], so tests can drive them against an in-memory store.
//! Spec/metadata writes and status writes are separate operations, the way
//! the API server treats the status subresource.

use crate::error::ControllerError;
use async_trait::async_trait;
use kube::api::{ListParams, PostParams};
use kube::{Api, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Read/write access to one resource kind in the watched namespace
#[async_trait]
pub trait ResourceStore<K>: Send + Sync {
    /// Fetches `name`, `None` when it does not exist
    async fn get(&self, name: &str) -> Result<Option<K>, ControllerError>;

    /// Lists objects carrying every label in `labels`
    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>, ControllerError>;

    /// Writes metadata and spec (finalizers, labels, desired state)
    async fn update(&self, obj: &K) -> Result<K, ControllerError>;

    /// Writes the status subresource
    async fn update_status(&self, obj: &K) -> Result<K, ControllerError>;
}

/// Formats `labels` as an equality-based label selector
#[must_use]
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// [`ResourceStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore<K> {
    api: Api<K>,
}

impl<K> std::fmt::Debug for KubeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl<K> KubeStore<K> {
    /// Store operating on `api`
    pub fn new(api: Api<K>) -> Self {
        Self { api }
    }
}

fn required_name<K: Resource>(obj: &K) -> Result<String, ControllerError> {
    obj.meta()
        .name
        .clone()
        .ok_or_else(|| ControllerError::InvalidConfig("resource has no name".to_string()))
}

#[async_trait]
impl<K> ResourceStore<K> for KubeStore<K>
where
    K: Resource<DynamicType = ()>
        + Clone
        + Serialize
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, name: &str) -> Result<Option<K>, ControllerError> {
        Ok(self.api.get_opt(name).await?)
    }

    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>, ControllerError> {
        let selector = label_selector(labels);
        let params = ListParams::default().labels(&selector);
        Ok(self.api.list(&params).await?.items)
    }

    async fn update(&self, obj: &K) -> Result<K, ControllerError> {
        let name = required_name(obj)?;
        Ok(self.api.replace(&name, &PostParams::default(), obj).await?)
    }

    async fn update_status(&self, obj: &K) -> Result<K, ControllerError> {
        let name = required_name(obj)?;
        let data = serde_json::to_vec(obj)?;
        let updated = self
            .api
            .replace_status(&name, &PostParams::default(), data)
            .await?;
        tracing::trace!(name = %updated.name_any(), "status replaced");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_selector_joins_pairs() {
        let labels = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "two".to_string()),
        ]);
        assert_eq!(label_selector(&labels), "a=1,b=two");
        assert_eq!(label_selector(&BTreeMap::new()), "");
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        use crate::test_utils::{MemoryStore, create_test_file};
        use crds::FederationRelation;

        let store = MemoryStore::new();
        store.insert(create_test_file("file-1", FederationRelation::Guest, true));
        let stale = store.get_sync("file-1").unwrap();
        store.update(&stale).await.unwrap();

        let err = store.update_status(&stale).await.unwrap_err();

        assert!(matches!(err, ControllerError::Conflict(_)));
        assert_eq!(store.status_writes(), 0);
    }
}
