//! Edge Federation CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the federation operator.
//!
//! Every resource lives in the `opg.ewbi.nby.one/v1beta1` group. A
//! [`Federation`] binds this control plane to one partner operator; the other
//! five kinds are children that point at their federation through labels
//! (see [`labels`]).

pub mod labels;
pub mod phase;
pub mod federation;
pub mod availability_zone;
pub mod file;
pub mod artefact;
pub mod application;
pub mod application_instance;

pub use labels::*;
pub use phase::Phase;
pub use federation::*;
pub use availability_zone::*;
pub use file::*;
pub use artefact::*;
pub use application::*;
pub use application_instance::*;
