//! Operator configuration read from the environment.

use crate::error::ControllerError;
use std::env;
use std::net::SocketAddr;

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_PROBE_ADDR: &str = "0.0.0.0:8081";
const DEFAULT_CONCURRENCY: u16 = 3;

/// Runtime settings of the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Namespace whose resources are watched
    pub namespace: String,
    /// Skip TLS verification of partner endpoints
    pub insecure_skip_verify: bool,
    /// Listen address of the health probe server
    pub probe_addr: SocketAddr,
    /// Concurrent reconciliations per watched kind
    pub concurrency: u16,
}

impl OperatorConfig {
    /// Reads the configuration from process environment variables
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// `WATCH_NAMESPACE` takes precedence over `NAMESPACE`; both fall back to
    /// `default`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let namespace = lookup("WATCH_NAMESPACE")
            .filter(|ns| !ns.is_empty())
            .or_else(|| lookup("NAMESPACE").filter(|ns| !ns.is_empty()))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let insecure_skip_verify = match lookup("PARTNER_INSECURE_SKIP_VERIFY") {
            Some(value) => parse_bool("PARTNER_INSECURE_SKIP_VERIFY", &value)?,
            None => false,
        };

        let probe_addr = lookup("PROBE_ADDR")
            .unwrap_or_else(|| DEFAULT_PROBE_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ControllerError::InvalidConfig(format!("PROBE_ADDR: {e}")))?;

        let concurrency = match lookup("RECONCILE_CONCURRENCY") {
            Some(value) => value.trim().parse::<u16>().map_err(|e| {
                ControllerError::InvalidConfig(format!("RECONCILE_CONCURRENCY '{value}': {e}"))
            })?,
            None => DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            namespace,
            insecure_skip_verify,
            probe_addr,
            concurrency,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ControllerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ControllerError::InvalidConfig(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}
