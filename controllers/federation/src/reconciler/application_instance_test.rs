//! Unit tests for ApplicationInstance reconciliation

#[cfg(test)]
mod tests {
    use crate::reconciler::application_instance::install_request;
    use crate::reconciler::{FAILURE_REQUEUE, POLL_INTERVAL};
    use crate::test_utils::*;
    use crds::{
        ApplicationInstanceState, ApplicationInstanceStatus, FederationRelation, Phase,
    };
    use kube_runtime::controller::Action;
    use partner_client::{InterfaceAccessPoints, ServiceEndpoint};

    fn status(env: &TestEnv, name: &str) -> ApplicationInstanceStatus {
        env.application_instances
            .get_sync(name)
            .unwrap()
            .status
            .unwrap_or_default()
    }

    /// Instance installed at the partner and recorded as Ready/Pending
    async fn installed_env() -> TestEnv {
        let env = TestEnv::with_federations();
        env.application_instances.insert(create_test_application_instance(
            "inst-1",
            FederationRelation::Guest,
            true,
        ));
        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();
        assert_eq!(action, Action::requeue(POLL_INTERVAL));
        env
    }

    fn http_endpoint() -> Vec<InterfaceAccessPoints> {
        vec![InterfaceAccessPoints {
            interface_id: "http".to_string(),
            access_points: vec![ServiceEndpoint {
                port: 8080,
                fqdn: Some("inst-1.partner.example".to_string()),
                ipv4_addresses: vec!["192.0.2.10".to_string()],
                ipv6_addresses: Vec::new(),
            }],
        }]
    }

    #[test]
    fn test_install_request_uses_external_id_and_zone() {
        let instance =
            create_test_application_instance("inst-1", FederationRelation::Guest, true);

        let request = install_request(&instance);

        assert_eq!(request.app_instance_id, "inst-1-id");
        assert_eq!(request.app_id, "app-1-id");
        assert_eq!(request.zone_info.zone_id, "zone-a");
        assert_eq!(request.zone_info.flavour_id, "small");
    }

    #[tokio::test]
    async fn test_install_starts_polling() {
        let env = installed_env().await;

        assert!(env.partner.has_app_instance("inst-1-id"));
        let status = status(&env, "inst-1");
        assert_eq!(status.phase, Some(Phase::Ready));
        assert_eq!(status.state, Some(ApplicationInstanceState::Pending));
    }

    #[tokio::test]
    async fn test_pending_instance_keeps_polling() {
        let env = installed_env().await;

        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::requeue(POLL_INTERVAL));
        assert_eq!(env.partner.call_count("install_app"), 1);
        assert_eq!(env.partner.call_count("get_app_instance_details"), 1);
    }

    #[tokio::test]
    async fn test_ready_instance_publishes_access_points() {
        let env = installed_env().await;
        env.partner
            .set_app_instance("inst-1-id", "ready", http_endpoint());

        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::await_change());
        let status = status(&env, "inst-1");
        assert_eq!(status.state, Some(ApplicationInstanceState::Ready));
        assert_eq!(status.access_point_info.len(), 1);
        let endpoint = &status.access_point_info[0].access_points[0];
        assert_eq!(endpoint.port, 8080);
        assert_eq!(endpoint.fqdn.as_deref(), Some("inst-1.partner.example"));
        assert_eq!(endpoint.ipv4_addresses, ["192.0.2.10"]);
    }

    #[tokio::test]
    async fn test_failed_instance_sets_error() {
        let env = installed_env().await;
        env.partner.set_app_instance("inst-1-id", "FAILED", Vec::new());

        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::await_change());
        let status = status(&env, "inst-1");
        assert_eq!(status.phase, Some(Phase::Error));
        assert_eq!(status.state, Some(ApplicationInstanceState::Failed));
        assert!(status.error_msg.is_some());
    }

    #[tokio::test]
    async fn test_terminating_instance_is_polled() {
        let env = installed_env().await;
        env.partner
            .set_app_instance("inst-1-id", "TERMINATING", Vec::new());

        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::requeue(POLL_INTERVAL));
        assert_eq!(
            status(&env, "inst-1").state,
            Some(ApplicationInstanceState::Terminating)
        );
    }

    #[tokio::test]
    async fn test_transient_poll_failure_retries() {
        let env = installed_env().await;
        env.partner
            .force_response("get_app_instance_details", 503, None);

        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::requeue(FAILURE_REQUEUE));
        assert_eq!(
            status(&env, "inst-1").state,
            Some(ApplicationInstanceState::Pending)
        );
    }

    #[tokio::test]
    async fn test_missing_application_is_permanent() {
        let env = TestEnv::with_federations();
        env.partner
            .force_response("install_app", 500, Some("application not found"));
        env.application_instances.insert(create_test_application_instance(
            "inst-1",
            FederationRelation::Guest,
            true,
        ));

        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::requeue(FAILURE_REQUEUE));
        let status = status(&env, "inst-1");
        assert_eq!(status.phase, Some(Phase::Error));
        assert_eq!(status.state, Some(ApplicationInstanceState::Failed));
        assert_eq!(status.error_msg.as_deref(), Some("application not found"));
    }

    #[tokio::test]
    async fn test_deletion_removes_partner_instance() {
        let env = installed_env().await;
        env.application_instances.mark_deleted("inst-1");

        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(env.partner.call_count("remove_app"), 1);
        assert!(!env.partner.has_app_instance("inst-1-id"));
        assert!(!env.application_instances.contains("inst-1"));
    }

    #[tokio::test]
    async fn test_unexpected_poll_status_does_not_reinstall() {
        let env = installed_env().await;
        env.partner
            .force_response("get_app_instance_details", 502, None);

        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();
        assert_eq!(action, Action::requeue(FAILURE_REQUEUE));
        assert_eq!(status(&env, "inst-1").phase, Some(Phase::Error));

        env.partner.clear_forced_responses();
        env.partner
            .set_app_instance("inst-1-id", "READY", http_endpoint());
        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(env.partner.call_count("install_app"), 1);
        let status = status(&env, "inst-1");
        assert_eq!(status.phase, Some(Phase::Ready));
        assert_eq!(status.state, Some(ApplicationInstanceState::Ready));
        assert_eq!(status.error_msg, None);
    }

    #[tokio::test]
    async fn test_installed_instance_recovers_after_resolution_error() {
        let env = installed_env().await;

        env.add_duplicate_guest_federation();
        env.reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap_err();
        assert_eq!(status(&env, "inst-1").phase, Some(Phase::Error));

        env.federations.remove(DUPLICATE_GUEST_FEDERATION);
        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::requeue(POLL_INTERVAL));
        assert_eq!(env.partner.call_count("install_app"), 1);
        assert_eq!(env.partner.call_count("get_app_instance_details"), 1);
        let status = status(&env, "inst-1");
        assert_eq!(status.phase, Some(Phase::Ready));
        assert_eq!(status.state, Some(ApplicationInstanceState::Pending));
    }

    #[tokio::test]
    async fn test_host_instance_converges_without_partner() {
        let env = TestEnv::with_federations();
        env.application_instances.insert(create_test_application_instance(
            "inst-1",
            FederationRelation::Host,
            true,
        ));

        let action = env
            .reconciler
            .reconcile_application_instance("inst-1")
            .await
            .unwrap();

        assert_eq!(action, Action::await_change());
        assert!(env.partner.calls().is_empty());
        assert_eq!(status(&env, "inst-1").phase, Some(Phase::Ready));
    }
}
