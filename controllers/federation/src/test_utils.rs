//! Test utilities for unit testing reconcilers
//!
//! [`MemoryStore`] stands in for the API server: status writes only touch
//! status, spec writes never touch status, stale resource versions conflict,
//! and an object marked for deletion disappears once its finalizers are gone.
//! [`TestEnv`] wires stores and a [`MockPartnerClient`] into a [`Reconciler`].

use crate::error::ControllerError;
use crate::reconciler::{Reconciler, Stores};
use crate::store::ResourceStore;
use async_trait::async_trait;
use crds::*;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use partner_client::{MockPartnerClient, PartnerClientRegistry};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_NAMESPACE: &str = "default";
pub const TEST_CONTEXT_ID: &str = "ctx-1";
pub const TEST_PARTNER_URL: &str = "https://partner.example";
pub const TEST_FEDERATION_ID: &str = "fed-ext-1";
pub const DUPLICATE_GUEST_FEDERATION: &str = "guest-fed-2";

/// In-memory [`ResourceStore`]; clones share state
#[derive(Clone)]
pub struct MemoryStore<K> {
    objects: Arc<Mutex<BTreeMap<String, K>>>,
    version: Arc<AtomicU64>,
    spec_writes: Arc<AtomicUsize>,
    status_writes: Arc<AtomicUsize>,
}

impl<K> MemoryStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            version: Arc::new(AtomicU64::new(0)),
            spec_writes: Arc::new(AtomicUsize::new(0)),
            status_writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with(objects: Vec<K>) -> Self {
        let store = Self::new();
        for obj in objects {
            store.insert(obj);
        }
        store
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Seeds or overwrites an object, bypassing all checks
    pub fn insert(&self, mut obj: K) {
        obj.meta_mut().resource_version = Some(self.next_version());
        self.objects.lock().unwrap().insert(obj.name_any(), obj);
    }

    pub fn get_sync(&self, name: &str) -> Option<K> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    pub fn remove(&self, name: &str) {
        self.objects.lock().unwrap().remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.lock().unwrap().contains_key(name)
    }

    /// Marks `name` for deletion the way the API server does
    pub fn mark_deleted(&self, name: &str) {
        let mut objects = self.objects.lock().unwrap();
        let Some(obj) = objects.get_mut(name) else {
            return;
        };
        if obj.finalizers().is_empty() {
            objects.remove(name);
            return;
        }
        obj.meta_mut().deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2025-01-01T00:00:00Z")).unwrap());
    }

    pub fn spec_writes(&self) -> usize {
        self.spec_writes.load(Ordering::SeqCst)
    }

    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    fn stored_for_write(
        objects: &BTreeMap<String, K>,
        obj: &K,
    ) -> Result<K, ControllerError> {
        let name = obj.name_any();
        let stored = objects
            .get(&name)
            .cloned()
            .ok_or_else(|| ControllerError::Conflict(format!("{name} does not exist")))?;
        if let Some(version) = obj.meta().resource_version.as_ref() {
            if stored.meta().resource_version.as_ref() != Some(version) {
                return Err(ControllerError::Conflict(format!(
                    "{name}: stale resource version {version}"
                )));
            }
        }
        Ok(stored)
    }

    /// JSON of `base` with its `status` replaced by the one of `source`
    fn with_status_of(base: &K, source: &K) -> Result<K, ControllerError> {
        let mut value = serde_json::to_value(base)?;
        let status = serde_json::to_value(source)?
            .get("status")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.insert("status".to_string(), status);
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl<K> ResourceStore<K> for MemoryStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, name: &str) -> Result<Option<K>, ControllerError> {
        Ok(self.get_sync(name))
    }

    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>, ControllerError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .values()
            .filter(|obj| labels.iter().all(|(k, v)| obj.labels().get(k) == Some(v)))
            .cloned()
            .collect())
    }

    async fn update(&self, obj: &K) -> Result<K, ControllerError> {
        let mut objects = self.objects.lock().unwrap();
        let stored = Self::stored_for_write(&objects, obj)?;
        let mut updated = Self::with_status_of(obj, &stored)?;
        updated.meta_mut().deletion_timestamp = stored.meta().deletion_timestamp.clone();
        updated.meta_mut().resource_version = Some(self.next_version());
        self.spec_writes.fetch_add(1, Ordering::SeqCst);

        let name = updated.name_any();
        if is_deleting(&updated) && updated.finalizers().is_empty() {
            objects.remove(&name);
        } else {
            objects.insert(name, updated.clone());
        }
        Ok(updated)
    }

    async fn update_status(&self, obj: &K) -> Result<K, ControllerError> {
        let mut objects = self.objects.lock().unwrap();
        let stored = Self::stored_for_write(&objects, obj)?;
        let mut updated = Self::with_status_of(&stored, obj)?;
        updated.meta_mut().resource_version = Some(self.next_version());
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        objects.insert(updated.name_any(), updated.clone());
        Ok(updated)
    }
}

/// Reconciler over in-memory stores talking to one mock partner
pub struct TestEnv {
    pub reconciler: Reconciler,
    pub partner: MockPartnerClient,
    pub federations: MemoryStore<Federation>,
    pub availability_zones: MemoryStore<AvailabilityZone>,
    pub files: MemoryStore<File>,
    pub artefacts: MemoryStore<Artefact>,
    pub applications: MemoryStore<Application>,
    pub application_instances: MemoryStore<ApplicationInstance>,
}

impl TestEnv {
    /// Environment whose partner client is registered for [`TEST_FEDERATION_ID`]
    pub fn new() -> Self {
        let partner = MockPartnerClient::new(TEST_PARTNER_URL);
        let partners = Arc::new(PartnerClientRegistry::with_factory(|url, _caller| {
            Ok(Arc::new(MockPartnerClient::new(url)) as Arc<dyn partner_client::PartnerApi>)
        }));
        partners
            .insert(TEST_FEDERATION_ID, Arc::new(partner.clone()))
            .unwrap();

        let federations = MemoryStore::new();
        let availability_zones = MemoryStore::new();
        let files = MemoryStore::new();
        let artefacts = MemoryStore::new();
        let applications = MemoryStore::new();
        let application_instances = MemoryStore::new();

        let stores = Stores {
            federations: Arc::new(federations.clone()),
            availability_zones: Arc::new(availability_zones.clone()),
            files: Arc::new(files.clone()),
            artefacts: Arc::new(artefacts.clone()),
            applications: Arc::new(applications.clone()),
            application_instances: Arc::new(application_instances.clone()),
        };

        Self {
            reconciler: Reconciler::new(stores, partners),
            partner,
            federations,
            availability_zones,
            files,
            artefacts,
            applications,
            application_instances,
        }
    }

    /// Environment with a guest and a host federation on [`TEST_CONTEXT_ID`]
    pub fn with_federations() -> Self {
        let env = Self::new();
        env.federations.insert(create_test_federation(
            "guest-fed",
            FederationRelation::Guest,
            Some(TEST_CONTEXT_ID),
        ));
        env.federations.insert(create_test_federation(
            "host-fed",
            FederationRelation::Host,
            Some(TEST_CONTEXT_ID),
        ));
        env
    }

    /// Adds a second guest federation on [`TEST_CONTEXT_ID`] so guest lookups
    /// become ambiguous until it is removed again
    pub fn add_duplicate_guest_federation(&self) {
        self.federations.insert(create_test_federation(
            DUPLICATE_GUEST_FEDERATION,
            FederationRelation::Guest,
            Some(TEST_CONTEXT_ID),
        ));
    }
}

/// Metadata carrying the federation labels and, optionally, our finalizer
pub fn child_metadata(
    name: &str,
    relation: FederationRelation,
    finalizer: Option<&str>,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(TEST_NAMESPACE.to_string()),
        labels: Some(BTreeMap::from([
            (FEDERATION_CONTEXT_ID_LABEL.to_string(), TEST_CONTEXT_ID.to_string()),
            (FEDERATION_RELATION_LABEL.to_string(), relation.as_str().to_string()),
            (EXTERNAL_ID_LABEL.to_string(), format!("{name}-id")),
        ])),
        finalizers: finalizer.map(|f| vec![f.to_string()]),
        ..Default::default()
    }
}

/// Federation with guest credentials and, optionally, a context id in status
pub fn create_test_federation(
    name: &str,
    relation: FederationRelation,
    context_id: Option<&str>,
) -> Federation {
    Federation {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            labels: Some(BTreeMap::from([
                (FEDERATION_RELATION_LABEL.to_string(), relation.as_str().to_string()),
                (EXTERNAL_ID_LABEL.to_string(), TEST_FEDERATION_ID.to_string()),
            ])),
            finalizers: Some(vec![FEDERATION_FINALIZER.to_string()]),
            ..Default::default()
        },
        spec: FederationSpec {
            origin_op: OriginOperator {
                country_code: "ES".to_string(),
                ..Default::default()
            },
            guest_partner_credentials: Some(PartnerCredentials {
                client_id: "guest-client".to_string(),
                token_url: TEST_PARTNER_URL.to_string(),
            }),
            ..Default::default()
        },
        status: context_id.map(|ctx| FederationStatus {
            federation_context_id: Some(ctx.to_string()),
            ..Default::default()
        }),
    }
}

pub fn create_test_file(name: &str, relation: FederationRelation, finalized: bool) -> File {
    File {
        metadata: child_metadata(name, relation, finalized.then_some(FILE_FINALIZER)),
        spec: FileSpec {
            app_provider_id: "provider-1".to_string(),
            file_name: format!("{name}.img"),
            file_version: "1.0".to_string(),
            file_type: "QCOW2".to_string(),
            repo_location: Some(RepoLocation {
                url: "https://repo.example/images".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        },
        status: None,
    }
}

pub fn create_test_artefact(name: &str, relation: FederationRelation, finalized: bool) -> Artefact {
    Artefact {
        metadata: child_metadata(name, relation, finalized.then_some(ARTEFACT_FINALIZER)),
        spec: ArtefactSpec {
            app_provider_id: "provider-1".to_string(),
            artefact_name: name.to_string(),
            artefact_version: "1.0".to_string(),
            descriptor_type: "COMPONENTSPEC".to_string(),
            virt_type: "CONTAINER_TYPE".to_string(),
            component_spec: vec![crds::ComponentSpec {
                name: "web".to_string(),
                images: vec!["file-1-id".to_string()],
                num_of_instances: 1,
                restart_policy: "RESTART_POLICY_ALWAYS".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        },
        status: None,
    }
}

pub fn create_test_application(
    name: &str,
    relation: FederationRelation,
    finalized: bool,
) -> Application {
    Application {
        metadata: child_metadata(name, relation, finalized.then_some(APPLICATION_FINALIZER)),
        spec: ApplicationSpec {
            app_provider_id: "provider-1".to_string(),
            component_specs: vec![ApplicationComponent {
                artefact_id: "artefact-1-id".to_string(),
            }],
            app_meta_data: crds::AppMetaData {
                name: name.to_string(),
                version: "1.0".to_string(),
                ..Default::default()
            },
            ..Default::default()
        },
        status: None,
    }
}

pub fn create_test_application_instance(
    name: &str,
    relation: FederationRelation,
    finalized: bool,
) -> ApplicationInstance {
    ApplicationInstance {
        metadata: child_metadata(
            name,
            relation,
            finalized.then_some(APPLICATION_INSTANCE_FINALIZER),
        ),
        spec: ApplicationInstanceSpec {
            app_provider_id: "provider-1".to_string(),
            app_id: "app-1-id".to_string(),
            app_version: "1.0".to_string(),
            zone_info: ZoneInfo {
                zone_id: "zone-a".to_string(),
                flavour_id: "small".to_string(),
                ..Default::default()
            },
            call_back_link: None,
        },
        status: None,
    }
}

pub fn create_test_availability_zone(
    name: &str,
    relation: FederationRelation,
    finalized: bool,
) -> AvailabilityZone {
    AvailabilityZone {
        metadata: child_metadata(name, relation, finalized.then_some(AVAILABILITY_ZONE_FINALIZER)),
        spec: AvailabilityZoneSpec {
            zone_id: "zone-a".to_string(),
            ..Default::default()
        },
        status: None,
    }
}
