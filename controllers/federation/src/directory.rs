//! Federation lookup for child resources.
//!
//! Children name their parent federation only indirectly: a context id and
//! a relation label. A federation is indexed under the context id recorded in
//! its status, falling back to its own context-id label, so guest and host
//! federations sharing one context id are told apart by relation alone.

use crate::error::ControllerError;
use crate::store::ResourceStore;
use crds::{FEDERATION_CONTEXT_ID_LABEL, Federation, FederationRef};
use kube::ResourceExt;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Index key of `federation`: status context id, else the context-id label.
/// Empty values are never indexed.
#[must_use]
pub fn federation_context_index(federation: &Federation) -> Option<String> {
    federation
        .status_context_id()
        .map(str::to_string)
        .or_else(|| {
            federation
                .labels()
                .get(FEDERATION_CONTEXT_ID_LABEL)
                .filter(|id| !id.is_empty())
                .cloned()
        })
}

/// Resolves [`FederationRef`]s against the federation store
#[derive(Clone)]
pub struct FederationDirectory {
    federations: Arc<dyn ResourceStore<Federation>>,
}

impl fmt::Debug for FederationDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederationDirectory").finish_non_exhaustive()
    }
}

impl FederationDirectory {
    /// Directory reading from `federations`
    pub fn new(federations: Arc<dyn ResourceStore<Federation>>) -> Self {
        Self { federations }
    }

    /// Returns the single federation matching `fed_ref`.
    ///
    /// Zero or several matches are an error naming both counts.
    pub async fn resolve(&self, fed_ref: &FederationRef) -> Result<Federation, ControllerError> {
        let candidates = self.federations.list(&fed_ref.relation.selector()).await?;
        let mut matches: Vec<Federation> = candidates
            .into_iter()
            .filter(|f| federation_context_index(f).as_deref() == Some(fed_ref.context_id.as_str()))
            .collect();

        debug!(federation = %fed_ref, matches = matches.len(), "resolved federation");

        match matches.pop() {
            Some(federation) if matches.is_empty() => Ok(federation),
            popped => Err(ControllerError::FederationResolution {
                context_id: fed_ref.context_id.clone(),
                relation: fed_ref.relation,
                expected: 1,
                actual: matches.len() + usize::from(popped.is_some()),
            }),
        }
    }
}
