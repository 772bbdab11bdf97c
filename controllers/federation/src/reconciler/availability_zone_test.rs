//! Unit tests for AvailabilityZone reconciliation

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::test_utils::*;
    use crds::{AVAILABILITY_ZONE_FINALIZER, FederationRelation, Phase, has_finalizer};
    use kube_runtime::controller::Action;

    fn phase(env: &TestEnv, name: &str) -> Option<Phase> {
        env.availability_zones
            .get_sync(name)
            .and_then(|az| az.status)
            .and_then(|s| s.phase)
    }

    #[tokio::test]
    async fn test_guest_zone_becomes_ready_without_partner() {
        let env = TestEnv::with_federations();
        env.availability_zones.insert(create_test_availability_zone(
            "zone-a",
            FederationRelation::Guest,
            false,
        ));

        env.reconciler.reconcile_availability_zone("zone-a").await.unwrap();
        assert!(has_finalizer(
            &env.availability_zones.get_sync("zone-a").unwrap(),
            AVAILABILITY_ZONE_FINALIZER
        ));

        let action = env.reconciler.reconcile_availability_zone("zone-a").await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(phase(&env, "zone-a"), Some(Phase::Ready));
        assert!(env.partner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ready_zone_is_not_rewritten() {
        let env = TestEnv::with_federations();
        env.availability_zones.insert(create_test_availability_zone(
            "zone-a",
            FederationRelation::Host,
            true,
        ));

        env.reconciler.reconcile_availability_zone("zone-a").await.unwrap();
        env.reconciler.reconcile_availability_zone("zone-a").await.unwrap();

        assert_eq!(env.availability_zones.status_writes(), 1);
    }

    #[tokio::test]
    async fn test_guest_zone_deletion_skips_partner() {
        let env = TestEnv::with_federations();
        env.availability_zones.insert(create_test_availability_zone(
            "zone-a",
            FederationRelation::Guest,
            true,
        ));
        env.availability_zones.mark_deleted("zone-a");

        let action = env.reconciler.reconcile_availability_zone("zone-a").await.unwrap();

        assert_eq!(action, Action::await_change());
        assert!(env.partner.calls().is_empty());
        assert!(!env.availability_zones.contains("zone-a"));
    }

    #[tokio::test]
    async fn test_ambiguous_federation_sets_error() {
        let env = TestEnv::with_federations();
        env.add_duplicate_guest_federation();
        env.availability_zones.insert(create_test_availability_zone(
            "zone-a",
            FederationRelation::Guest,
            true,
        ));

        let err = env
            .reconciler
            .reconcile_availability_zone("zone-a")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ControllerError::FederationResolution { actual: 2, .. }
        ));
        assert_eq!(phase(&env, "zone-a"), Some(Phase::Error));
    }

    #[tokio::test]
    async fn test_zone_recovers_once_federation_is_unique() {
        let env = TestEnv::with_federations();
        env.add_duplicate_guest_federation();
        env.availability_zones.insert(create_test_availability_zone(
            "zone-a",
            FederationRelation::Guest,
            true,
        ));
        env.reconciler
            .reconcile_availability_zone("zone-a")
            .await
            .unwrap_err();
        assert_eq!(phase(&env, "zone-a"), Some(Phase::Error));

        env.federations.remove(DUPLICATE_GUEST_FEDERATION);
        let action = env.reconciler.reconcile_availability_zone("zone-a").await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(phase(&env, "zone-a"), Some(Phase::Ready));
    }
}
