//! Federation Controller
//!
//! Operator federating edge resources with partner operators:
//! - Federation: establishes the cooperation context and accepts offered zones
//! - AvailabilityZone: tracks zones shared through a federation
//! - File, Artefact, Application, ApplicationInstance: pushed to the partner
//!   on the guest side, tracked locally on the host side
//!
//! Configuration comes from the environment (see [`config::OperatorConfig`]).

mod backoff;
mod config;
mod controller;
mod directory;
mod error;
mod probes;
mod reconciler;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::OperatorConfig;
use crate::controller::Controller;
use crate::error::ControllerError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Federation Controller");

    let config = OperatorConfig::from_env()?;
    info!(
        namespace = %config.namespace,
        probe_addr = %config.probe_addr,
        concurrency = config.concurrency,
        insecure_skip_verify = config.insecure_skip_verify,
        "configuration loaded"
    );

    let controller = Controller::new(config).await?;
    controller.run().await
}
