//! Lifecycle phase shared by every federated resource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse reconciliation phase reported in `status.phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "PascalCase")]
pub enum Phase {
    /// Not yet confirmed
    #[default]
    #[serde(alias = "pending")]
    Pending,
    /// Confirmed locally (host) or by the partner (guest)
    #[serde(alias = "ready")]
    Ready,
    /// Last pass failed; the next pass retries the same transition
    #[serde(alias = "error")]
    Error,
    /// Partner state could not be interpreted
    #[serde(alias = "unknown")]
    Unknown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Pending => "Pending",
            Phase::Ready => "Ready",
            Phase::Error => "Error",
            Phase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}
