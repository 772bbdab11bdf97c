//! Prints every CRD of this crate as a multi-document YAML stream.
//!
//! ```sh
//! cargo run -p crds --bin crdgen > config/crd/federation.yaml
//! ```

use crds::{Application, ApplicationInstance, Artefact, AvailabilityZone, Federation, File};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [
        Federation::crd(),
        AvailabilityZone::crd(),
        File::crd(),
        Artefact::crd(),
        Application::crd(),
        ApplicationInstance::crd(),
    ];

    for crd in &crds {
        print!("---\n{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
