//! Kubernetes resource watchers.
//!
//! Every watched kind runs through the generic [`watch_resource`] helper,
//! which wraps `kube_runtime::Controller` (reconnection, debouncing,
//! per-object serialization) around the matching reconcile function.
//! Failed passes are requeued with a per-object Fibonacci backoff that
//! resets on the next successful pass or once the object leaves the cache.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::{Application, ApplicationInstance, Artefact, AvailabilityZone, Federation, File};
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::{
    Controller, watcher,
    controller::{Action, Config as ControllerConfig},
};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Boxed reconcile future
type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Runs a controller for `K` until its event stream ends.
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
    concurrency: u16,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, String) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!(kind = resource_name, concurrency, "starting watcher");

    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(concurrency);
    let controller =
        Controller::new(api, watcher::Config::default()).with_config(controller_config);

    // Objects gone from the cache are never reconciled again.
    let cache = controller.store();
    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let live: HashSet<String> = cache.state().iter().map(|o| o.name_any()).collect();
        ctx.prune_backoff(resource_name, |name| live.contains(name));

        let key = format!("{resource_name}/{}", obj.name_any());
        let delay = ctx.error_backoff(&key);
        error!(
            kind = resource_name,
            name = %obj.name_any(),
            error = %error,
            retry_in = ?delay,
            "reconciliation failed"
        );
        Action::requeue(delay)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let name = obj.name_any();
            debug!(kind = resource_name, name = %name, "reconcile triggered");
            let action = reconcile_fn(Arc::clone(&ctx), name.clone()).await?;
            ctx.reset_backoff(&format!("{resource_name}/{name}"));
            Ok::<Action, ControllerError>(action)
        }
    };

    controller
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                debug!(kind = resource_name, error = %e, "controller event error");
            }
        })
        .await;

    Ok(())
}

/// Watches every federated kind in one namespace.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    concurrency: u16,
    federation_api: Api<Federation>,
    availability_zone_api: Api<AvailabilityZone>,
    file_api: Api<File>,
    artefact_api: Api<Artefact>,
    application_api: Api<Application>,
    application_instance_api: Api<ApplicationInstance>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Creates a new watcher instance.
    #[allow(clippy::too_many_arguments, reason = "one API handle per watched kind")]
    pub fn new(
        reconciler: Arc<Reconciler>,
        concurrency: u16,
        federation_api: Api<Federation>,
        availability_zone_api: Api<AvailabilityZone>,
        file_api: Api<File>,
        artefact_api: Api<Artefact>,
        application_api: Api<Application>,
        application_instance_api: Api<ApplicationInstance>,
    ) -> Self {
        Self {
            reconciler,
            concurrency,
            federation_api,
            availability_zone_api,
            file_api,
            artefact_api,
            application_api,
            application_instance_api,
        }
    }

    /// Watches Federation resources.
    pub async fn watch_federations(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.federation_api.clone(),
            Arc::clone(&self.reconciler),
            |reconciler, name| {
                Box::pin(async move { reconciler.reconcile_federation(&name).await })
            },
            "Federation",
            self.concurrency,
        )
        .await
    }

    /// Watches AvailabilityZone resources.
    pub async fn watch_availability_zones(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.availability_zone_api.clone(),
            Arc::clone(&self.reconciler),
            |reconciler, name| {
                Box::pin(async move { reconciler.reconcile_availability_zone(&name).await })
            },
            "AvailabilityZone",
            self.concurrency,
        )
        .await
    }

    /// Watches File resources.
    pub async fn watch_files(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.file_api.clone(),
            Arc::clone(&self.reconciler),
            |reconciler, name| Box::pin(async move { reconciler.reconcile_file(&name).await }),
            "File",
            self.concurrency,
        )
        .await
    }

    /// Watches Artefact resources.
    pub async fn watch_artefacts(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.artefact_api.clone(),
            Arc::clone(&self.reconciler),
            |reconciler, name| Box::pin(async move { reconciler.reconcile_artefact(&name).await }),
            "Artefact",
            self.concurrency,
        )
        .await
    }

    /// Watches Application resources.
    pub async fn watch_applications(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.application_api.clone(),
            Arc::clone(&self.reconciler),
            |reconciler, name| {
                Box::pin(async move { reconciler.reconcile_application(&name).await })
            },
            "Application",
            self.concurrency,
        )
        .await
    }

    /// Watches ApplicationInstance resources.
    pub async fn watch_application_instances(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.application_instance_api.clone(),
            Arc::clone(&self.reconciler),
            |reconciler, name| {
                Box::pin(async move { reconciler.reconcile_application_instance(&name).await })
            },
            "ApplicationInstance",
            self.concurrency,
        )
        .await
    }
}
