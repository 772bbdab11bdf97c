//! Main controller implementation.
//!
//! Builds the Kubernetes client, the stores and the partner registry, then
//! runs one watcher per kind plus the probe server. The process exits as
//! soon as any of them stops.

use crate::config::OperatorConfig;
use crate::error::ControllerError;
use crate::probes;
use crate::reconciler::{Reconciler, Stores};
use crate::store::KubeStore;
use crate::watcher::Watcher;
use crds::{Application, ApplicationInstance, Artefact, AvailabilityZone, Federation, File};
use kube::{Api, Client};
use partner_client::PartnerClientRegistry;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

type Task = JoinHandle<Result<(), ControllerError>>;

/// Main controller for federated resources.
#[derive(Debug)]
pub struct Controller {
    federation_watcher: Task,
    availability_zone_watcher: Task,
    file_watcher: Task,
    artefact_watcher: Task,
    application_watcher: Task,
    application_instance_watcher: Task,
    probe_server: Task,
}

impl Controller {
    /// Creates the controller and spawns its tasks.
    pub async fn new(config: OperatorConfig) -> Result<Self, ControllerError> {
        info!(namespace = %config.namespace, "initializing federation controller");

        let client = Client::try_default().await?;
        let ns = config.namespace.as_str();

        let federation_api: Api<Federation> = Api::namespaced(client.clone(), ns);
        let availability_zone_api: Api<AvailabilityZone> = Api::namespaced(client.clone(), ns);
        let file_api: Api<File> = Api::namespaced(client.clone(), ns);
        let artefact_api: Api<Artefact> = Api::namespaced(client.clone(), ns);
        let application_api: Api<Application> = Api::namespaced(client.clone(), ns);
        let application_instance_api: Api<ApplicationInstance> = Api::namespaced(client, ns);

        let stores = Stores {
            federations: Arc::new(KubeStore::new(federation_api.clone())),
            availability_zones: Arc::new(KubeStore::new(availability_zone_api.clone())),
            files: Arc::new(KubeStore::new(file_api.clone())),
            artefacts: Arc::new(KubeStore::new(artefact_api.clone())),
            applications: Arc::new(KubeStore::new(application_api.clone())),
            application_instances: Arc::new(KubeStore::new(application_instance_api.clone())),
        };
        let partners = Arc::new(PartnerClientRegistry::new(config.insecure_skip_verify));
        let reconciler = Arc::new(Reconciler::new(stores, partners));

        let watcher = Arc::new(Watcher::new(
            reconciler,
            config.concurrency,
            federation_api,
            availability_zone_api,
            file_api,
            artefact_api,
            application_api,
            application_instance_api,
        ));

        let federation_watcher = {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move { watcher.watch_federations().await })
        };
        let availability_zone_watcher = {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move { watcher.watch_availability_zones().await })
        };
        let file_watcher = {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move { watcher.watch_files().await })
        };
        let artefact_watcher = {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move { watcher.watch_artefacts().await })
        };
        let application_watcher = {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move { watcher.watch_applications().await })
        };
        let application_instance_watcher = {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move { watcher.watch_application_instances().await })
        };
        let probe_server = tokio::spawn(probes::serve(config.probe_addr));

        Ok(Self {
            federation_watcher,
            availability_zone_watcher,
            file_watcher,
            artefact_watcher,
            application_watcher,
            application_instance_watcher,
            probe_server,
        })
    }

    /// Runs until the first task stops, which is always an error.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("federation controller running");

        let (task, result) = tokio::select! {
            r = self.federation_watcher => ("Federation watcher", r),
            r = self.availability_zone_watcher => ("AvailabilityZone watcher", r),
            r = self.file_watcher => ("File watcher", r),
            r = self.artefact_watcher => ("Artefact watcher", r),
            r = self.application_watcher => ("Application watcher", r),
            r = self.application_instance_watcher => ("ApplicationInstance watcher", r),
            r = self.probe_server => ("probe server", r),
        };

        match result {
            Ok(Ok(())) => {
                error!(task, "task stopped unexpectedly");
                Err(ControllerError::Watch(format!("{task} stopped")))
            }
            Ok(Err(e)) => {
                error!(task, error = %e, "task failed");
                Err(e)
            }
            Err(e) => {
                error!(task, error = %e, "task panicked");
                Err(ControllerError::Watch(format!("{task} panicked: {e}")))
            }
        }
    }
}
