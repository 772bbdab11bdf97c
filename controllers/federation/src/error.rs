//! Controller-specific error types.
//!
//! Errors returned from a reconcile pass are handed to the watcher's error
//! policy, which requeues the object with a Fibonacci backoff.

use crds::FederationRelation;
use kube::Error as KubeError;
use partner_client::PartnerError;
use thiserror::Error;

/// Errors that can occur in the federation controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Partner API error (transport, encoding, client construction)
    #[error("Partner error: {0}")]
    Partner(#[from] PartnerError),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A child resource did not resolve to exactly one federation
    #[error(
        "expected {expected} {relation} federation with context id '{context_id}', found {actual}"
    )]
    FederationResolution {
        /// Context id the child carries
        context_id: String,
        /// Relation the child carries
        relation: FederationRelation,
        /// Number of federations required
        expected: usize,
        /// Number of federations found
        actual: usize,
    },

    /// Guest federation without partner credentials
    #[error("Federation {0} has no guestPartnerCredentials")]
    MissingCredentials(String),

    /// The partner did not confirm removal of a guest resource
    #[error("Partner did not confirm removal of {kind} {name} (status {status})")]
    RemoteDeletion {
        /// Resource kind
        kind: &'static str,
        /// Resource name
        name: String,
        /// Status the partner answered
        status: u16,
    },

    /// Optimistic concurrency conflict on a store write
    #[error("Conflict: {0}")]
    #[cfg(test)]
    Conflict(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Probe server I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
