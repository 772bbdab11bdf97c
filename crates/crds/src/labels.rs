//! Labels, finalizers and typed relationship handles.
//!
//! Child resources refer to their federation through string labels. The
//! helpers here lift those labels into typed values ([`FederationRelation`],
//! [`ExternalId`], [`FederationRef`]) so reconcilers never parse raw label maps.

use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt;

/// Label carrying the parent federation's context id
pub const FEDERATION_CONTEXT_ID_LABEL: &str = "opg.ewbi.nby.one/federation-context-id";

/// Label carrying the relation (`guest` or `host`)
pub const FEDERATION_RELATION_LABEL: &str = "opg.ewbi.nby.one/federation-relation";

/// Label carrying the guest operator URL on host-side federations
pub const FEDERATION_GUEST_URL_LABEL: &str = "opg.ewbi.nby.one/federation-guest-url";

/// Label carrying the id used when talking to the partner
pub const EXTERNAL_ID_LABEL: &str = "opg.ewbi.nby.one/id";

/// Finalizer held on [`crate::Federation`] objects
pub const FEDERATION_FINALIZER: &str = "federation.opg.ewbi.finalizer.nby.one";
/// Finalizer held on [`crate::AvailabilityZone`] objects
pub const AVAILABILITY_ZONE_FINALIZER: &str = "availabilityzone.opg.ewbi.finalizer.nby.one";
/// Finalizer held on [`crate::File`] objects
pub const FILE_FINALIZER: &str = "file.opg.ewbi.finalizer.nby.one";
/// Finalizer held on [`crate::Artefact`] objects
pub const ARTEFACT_FINALIZER: &str = "artefact.opg.ewbi.finalizer.nby.one";
/// Finalizer held on [`crate::Application`] objects
pub const APPLICATION_FINALIZER: &str = "app.opg.ewbi.finalizer.nby.one";
/// Finalizer held on [`crate::ApplicationInstance`] objects
pub const APPLICATION_INSTANCE_FINALIZER: &str = "applicationinstance.opg.ewbi.finalizer.nby.one";

/// Which side of a federation this control plane plays for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FederationRelation {
    /// We initiated the federation and push resources to the partner
    Guest,
    /// The partner initiated it; resources mirror partner state
    Host,
}

impl FederationRelation {
    /// Label value for this relation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FederationRelation::Guest => "guest",
            FederationRelation::Host => "host",
        }
    }

    /// Guest iff the relation label equals `guest`; anything else is host.
    #[must_use]
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        match labels.get(FEDERATION_RELATION_LABEL).map(String::as_str) {
            Some("guest") => FederationRelation::Guest,
            _ => FederationRelation::Host,
        }
    }

    /// Relation of an arbitrary object
    pub fn of<K: Resource>(obj: &K) -> Self {
        Self::from_labels(obj.labels())
    }

    /// True for [`FederationRelation::Guest`]
    #[must_use]
    pub fn is_guest(self) -> bool {
        self == FederationRelation::Guest
    }

    /// Label selector restricting a list to this relation
    #[must_use]
    pub fn selector(self) -> BTreeMap<String, String> {
        BTreeMap::from([(FEDERATION_RELATION_LABEL.to_string(), self.as_str().to_string())])
    }
}

impl fmt::Display for FederationRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a resource at the partner.
///
/// Taken from the [`EXTERNAL_ID_LABEL`] label, falling back to the object
/// name when the label is missing or empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalId(String);

impl ExternalId {
    /// Wrap a raw id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// External id of an object
    pub fn of<K: Resource>(obj: &K) -> Self {
        match obj.labels().get(EXTERNAL_ID_LABEL) {
            Some(id) if !id.is_empty() => Self(id.clone()),
            _ => Self(obj.name_any()),
        }
    }

    /// Borrow the id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pointer from a child resource to its owning federation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FederationRef {
    /// Context id of the parent federation (may be empty if unlabelled)
    pub context_id: String,
    /// Relation the parent must carry
    pub relation: FederationRelation,
}

impl FederationRef {
    /// Reference held by an object's labels
    pub fn of<K: Resource>(obj: &K) -> Self {
        Self {
            context_id: obj
                .labels()
                .get(FEDERATION_CONTEXT_ID_LABEL)
                .cloned()
                .unwrap_or_default(),
            relation: FederationRelation::of(obj),
        }
    }
}

impl fmt::Display for FederationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.relation, self.context_id)
    }
}

/// Whether `obj` carries `finalizer`
pub fn has_finalizer<K: Resource>(obj: &K, finalizer: &str) -> bool {
    obj.finalizers().iter().any(|f| f == finalizer)
}

/// Adds `finalizer` if missing. Returns true when the object changed.
pub fn add_finalizer<K: Resource>(obj: &mut K, finalizer: &str) -> bool {
    if has_finalizer(obj, finalizer) {
        return false;
    }
    obj.finalizers_mut().push(finalizer.to_string());
    true
}

/// Removes `finalizer` if present. Returns true when the object changed.
pub fn remove_finalizer<K: Resource>(obj: &mut K, finalizer: &str) -> bool {
    let finalizers = obj.finalizers_mut();
    let before = finalizers.len();
    finalizers.retain(|f| f != finalizer);
    before != finalizers.len()
}

/// Whether deletion has been requested for `obj`
pub fn is_deleting<K: Resource>(obj: &K) -> bool {
    obj.meta().deletion_timestamp.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{File, FileSpec};

    fn labelled(labels: &[(&str, &str)]) -> File {
        let mut file = File::new("demo", FileSpec::default());
        file.metadata.labels = Some(
            labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        file
    }

    #[test]
    fn test_relation_is_guest_only_for_guest_label() {
        assert_eq!(
            FederationRelation::of(&labelled(&[(FEDERATION_RELATION_LABEL, "guest")])),
            FederationRelation::Guest
        );
        assert_eq!(
            FederationRelation::of(&labelled(&[(FEDERATION_RELATION_LABEL, "host")])),
            FederationRelation::Host
        );
        assert_eq!(FederationRelation::of(&labelled(&[])), FederationRelation::Host);
        assert_eq!(
            FederationRelation::of(&labelled(&[(FEDERATION_RELATION_LABEL, "Guest")])),
            FederationRelation::Host
        );
    }

    #[test]
    fn test_external_id_falls_back_to_name() {
        assert_eq!(ExternalId::of(&labelled(&[(EXTERNAL_ID_LABEL, "file-42")])).as_str(), "file-42");
        assert_eq!(ExternalId::of(&labelled(&[(EXTERNAL_ID_LABEL, "")])).as_str(), "demo");
        assert_eq!(ExternalId::of(&labelled(&[])).as_str(), "demo");
    }

    #[test]
    fn test_federation_ref_reads_labels() {
        let file = labelled(&[
            (FEDERATION_CONTEXT_ID_LABEL, "ctx-1"),
            (FEDERATION_RELATION_LABEL, "guest"),
        ]);
        let fed_ref = FederationRef::of(&file);
        assert_eq!(fed_ref.context_id, "ctx-1");
        assert!(fed_ref.relation.is_guest());
        assert_eq!(fed_ref.to_string(), "guest/ctx-1");
    }

    #[test]
    fn test_finalizer_helpers_are_idempotent() {
        let mut file = labelled(&[]);
        assert!(!has_finalizer(&file, FILE_FINALIZER));
        assert!(add_finalizer(&mut file, FILE_FINALIZER));
        assert!(!add_finalizer(&mut file, FILE_FINALIZER));
        assert_eq!(file.finalizers().len(), 1);
        assert!(remove_finalizer(&mut file, FILE_FINALIZER));
        assert!(!remove_finalizer(&mut file, FILE_FINALIZER));
        assert!(file.finalizers().is_empty());
    }
}
