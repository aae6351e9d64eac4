// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `wait.rs`
//!
//! The waiters run against a mock API server so that the full request/response
//! path through `kube::Client` is exercised.

#[cfg(test)]
mod tests {
    use crate::condition::ConditionTarget;
    use crate::constants::{
        CGU_CONDITION_PROGRESSING, CGU_CONDITION_SUCCEEDED, CGU_CONDITION_VALIDATED,
        CGU_REASON_COMPLETED, CGU_REASON_IN_PROGRESS, CONDITION_STATUS_FALSE,
        CONDITION_STATUS_TRUE, POLICY_COMPLIANT, POLICY_NON_COMPLIANT,
    };
    use crate::errors::{RetryError, WaitError};
    use crate::poll::PollConfig;
    use crate::resources::{dynamic_api, RanKind};
    use crate::wait::{
        is_compliant, update_with_conflict_retry, wait_for_condition, wait_for_count,
        wait_for_object, wait_until_compliant, wait_until_deleted, NotFoundPolicy,
    };
    use kube::api::{DynamicObject, ListParams};
    use kube::Client;
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NAMESPACE: &str = "ztp-install";
    const CGU_NAME: &str = "cgu-upgrade";
    const CGU_PATH: &str =
        "/apis/ran.openshift.io/v1alpha1/namespaces/ztp-install/clustergroupupgrades/cgu-upgrade";
    const POLICY_BASE: &str =
        "/apis/policy.open-cluster-management.io/v1/namespaces/ztp-install/policies";
    const BMH_LIST_PATH: &str = "/apis/metal3.io/v1alpha1/namespaces/ztp-install/baremetalhosts";

    fn fast_config() -> PollConfig {
        PollConfig::new(Duration::from_millis(10), Duration::from_secs(5)).unwrap()
    }

    fn mock_client(server: &MockServer) -> Client {
        let config = kube::Config::new(server.uri().parse().unwrap());
        Client::try_from(config).unwrap()
    }

    fn cgu(conditions: Value) -> Value {
        json!({
            "apiVersion": "ran.openshift.io/v1alpha1",
            "kind": "ClusterGroupUpgrade",
            "metadata": {
                "name": CGU_NAME,
                "namespace": NAMESPACE,
                "resourceVersion": "1001"
            },
            "spec": {
                "clusters": ["spoke1"],
                "enable": true,
                "managedPolicies": ["upgrade-policy"]
            },
            "status": {"conditions": conditions}
        })
    }

    fn progressing_cgu() -> Value {
        cgu(json!([
            {"type": CGU_CONDITION_VALIDATED, "status": CONDITION_STATUS_TRUE, "reason": CGU_REASON_COMPLETED, "message": "Completed validation"},
            {"type": CGU_CONDITION_PROGRESSING, "status": CONDITION_STATUS_TRUE, "reason": CGU_REASON_IN_PROGRESS, "message": "Remediating non-compliant policies"}
        ]))
    }

    fn succeeded_cgu() -> Value {
        cgu(json!([
            {"type": CGU_CONDITION_PROGRESSING, "status": CONDITION_STATUS_FALSE, "reason": CGU_REASON_COMPLETED, "message": "All clusters are compliant"},
            {"type": CGU_CONDITION_SUCCEEDED, "status": CONDITION_STATUS_TRUE, "reason": CGU_REASON_COMPLETED, "message": "All clusters are compliant"}
        ]))
    }

    fn status_error(code: u16, reason: &str) -> Value {
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": format!("request failed: {reason}"),
            "reason": reason,
            "code": code
        })
    }

    fn policy(name: &str, compliant: &str) -> Value {
        json!({
            "apiVersion": "policy.open-cluster-management.io/v1",
            "kind": "Policy",
            "metadata": {"name": name, "namespace": NAMESPACE},
            "spec": {"disabled": false, "remediationAction": "inform"},
            "status": {"compliant": compliant}
        })
    }

    fn bmh(name: &str, state: &str) -> Value {
        json!({
            "apiVersion": "metal3.io/v1alpha1",
            "kind": "BareMetalHost",
            "metadata": {"name": name, "namespace": NAMESPACE},
            "spec": {"online": true},
            "status": {"provisioning": {"state": state}}
        })
    }

    fn bmh_list(items: Value) -> Value {
        json!({
            "apiVersion": "metal3.io/v1alpha1",
            "kind": "BareMetalHostList",
            "metadata": {"resourceVersion": "2002"},
            "items": items
        })
    }

    async fn requests_with_method(server: &MockServer, verb: &str) -> usize {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.method.as_str() == verb)
            .count()
    }

    fn succeeded_target() -> ConditionTarget {
        ConditionTarget::of_type(CGU_CONDITION_SUCCEEDED).with_status(CONDITION_STATUS_TRUE)
    }

    #[tokio::test]
    async fn test_wait_for_condition_polls_until_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(progressing_cgu()))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(succeeded_cgu()))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        let obj: DynamicObject = wait_for_condition(
            &api,
            CGU_NAME,
            &succeeded_target(),
            NotFoundPolicy::Fatal,
            &fast_config(),
        )
        .await
        .unwrap();

        assert_eq!(obj.metadata.name.as_deref(), Some(CGU_NAME));
        assert_eq!(requests_with_method(&server, "GET").await, 3);
    }

    #[tokio::test]
    async fn test_wait_for_condition_tolerates_missing_object_when_pending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(status_error(404, "NotFound")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(succeeded_cgu()))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        let result = wait_for_condition(
            &api,
            CGU_NAME,
            &succeeded_target(),
            NotFoundPolicy::Pending,
            &fast_config(),
        )
        .await;

        assert!(result.is_ok(), "Missing object should be polled again: {result:?}");
    }

    #[tokio::test]
    async fn test_wait_for_condition_missing_object_is_fatal_when_required() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(status_error(404, "NotFound")))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        let err = wait_for_condition(
            &api,
            CGU_NAME,
            &succeeded_target(),
            NotFoundPolicy::Fatal,
            &fast_config(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Probe { .. }), "unexpected: {err}");
        assert!(err.to_string().contains("not found"));
        assert_eq!(requests_with_method(&server, "GET").await, 1);
    }

    #[tokio::test]
    async fn test_wait_for_condition_rejects_wildcard_target() {
        let server = MockServer::start().await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        let err = wait_for_condition(
            &api,
            CGU_NAME,
            &ConditionTarget::default(),
            NotFoundPolicy::Pending,
            &fast_config(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::InvalidTarget(_)));
        assert_eq!(requests_with_method(&server, "GET").await, 0);
    }

    #[tokio::test]
    async fn test_wait_for_condition_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(progressing_cgu()))
            .mount(&server)
            .await;

        let config = PollConfig::new(Duration::from_millis(20), Duration::from_millis(100)).unwrap();
        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        let err = wait_for_condition(
            &api,
            CGU_NAME,
            &succeeded_target(),
            NotFoundPolicy::Fatal,
            &config,
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout(), "unexpected: {err}");
        assert!(err.to_string().contains("cgu-upgrade"));
    }

    #[tokio::test]
    async fn test_wait_for_condition_keeps_polling_through_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(status_error(503, "ServiceUnavailable")),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(succeeded_cgu()))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        let result = wait_for_condition(
            &api,
            CGU_NAME,
            &succeeded_target(),
            NotFoundPolicy::Fatal,
            &fast_config(),
        )
        .await;

        assert!(result.is_ok(), "503 should be treated as transient: {result:?}");
    }

    #[tokio::test]
    async fn test_wait_for_condition_fails_on_malformed_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(cgu(json!("Succeeded"))))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        let err = wait_for_condition(
            &api,
            CGU_NAME,
            &succeeded_target(),
            NotFoundPolicy::Fatal,
            &fast_config(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Probe { .. }), "unexpected: {err}");
        assert!(format!("{err:#}").contains("malformed status.conditions"));
        assert_eq!(requests_with_method(&server, "GET").await, 1);
    }

    #[tokio::test]
    async fn test_wait_for_condition_fails_fast_on_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(status_error(403, "Forbidden")))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        let err = wait_for_condition(
            &api,
            CGU_NAME,
            &succeeded_target(),
            NotFoundPolicy::Pending,
            &fast_config(),
        )
        .await
        .unwrap_err();

        assert!(err.probe_error().is_some(), "unexpected: {err}");
        assert_eq!(requests_with_method(&server, "GET").await, 1);
    }

    #[tokio::test]
    async fn test_wait_for_object_with_predicate() {
        let server = MockServer::start().await;
        let bmh_path = format!("{BMH_LIST_PATH}/worker-0");
        Mock::given(method("GET"))
            .and(path(bmh_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(bmh("worker-0", "provisioning")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(bmh_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(bmh("worker-0", "provisioned")))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::BareMetalHost, Some(NAMESPACE));
        let host = wait_for_object(
            &api,
            "worker-0",
            NotFoundPolicy::Fatal,
            &fast_config(),
            |host: &DynamicObject| {
                host.data.pointer("/status/provisioning/state") == Some(&json!("provisioned"))
            },
        )
        .await
        .unwrap();

        assert_eq!(host.metadata.name.as_deref(), Some("worker-0"));
    }

    #[tokio::test]
    async fn test_wait_until_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(succeeded_cgu()))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(status_error(404, "NotFound")))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        wait_until_deleted(&api, CGU_NAME, &fast_config()).await.unwrap();

        assert_eq!(requests_with_method(&server, "GET").await, 3);
    }

    #[tokio::test]
    async fn test_wait_for_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BMH_LIST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(bmh_list(json!([
                bmh("worker-0", "provisioned"),
                bmh("worker-1", "inspecting")
            ]))))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(BMH_LIST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(bmh_list(json!([
                bmh("worker-0", "provisioned"),
                bmh("worker-1", "provisioned")
            ]))))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::BareMetalHost, Some(NAMESPACE));
        let provisioned = wait_for_count(
            &api,
            &ListParams::default().labels("cluster=spoke1"),
            2,
            &fast_config(),
            |host: &DynamicObject| {
                host.data.pointer("/status/provisioning/state") == Some(&json!("provisioned"))
            },
        )
        .await
        .unwrap();

        assert_eq!(provisioned.len(), 2);
        assert_eq!(requests_with_method(&server, "GET").await, 2);
    }

    #[test]
    fn test_is_compliant() {
        assert!(is_compliant(&policy("a", POLICY_COMPLIANT)).unwrap());
        assert!(!is_compliant(&policy("a", POLICY_NON_COMPLIANT)).unwrap());
        assert!(!is_compliant(&json!({"metadata": {"name": "no-status"}})).unwrap());
    }

    #[tokio::test]
    async fn test_wait_until_compliant() {
        let server = MockServer::start().await;
        let first = format!("{POLICY_BASE}/ztp-common.common-config-policy");
        let second = format!("{POLICY_BASE}/ztp-group.group-du-sno-config-policy");

        Mock::given(method("GET"))
            .and(path(first.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(policy(
                "ztp-common.common-config-policy",
                POLICY_COMPLIANT,
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(second.as_str()))
            .respond_with(ResponseTemplate::new(404).set_body_json(status_error(404, "NotFound")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(second.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(policy(
                "ztp-group.group-du-sno-config-policy",
                POLICY_NON_COMPLIANT,
            )))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(second.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(policy(
                "ztp-group.group-du-sno-config-policy",
                POLICY_COMPLIANT,
            )))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::Policy, Some(NAMESPACE));
        wait_until_compliant(
            &api,
            &[
                "ztp-common.common-config-policy",
                "ztp-group.group-du-sno-config-policy",
            ],
            &fast_config(),
        )
        .await
        .unwrap();

        // Three rounds, two policies each
        assert_eq!(requests_with_method(&server, "GET").await, 6);
    }

    #[tokio::test]
    async fn test_update_with_conflict_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(progressing_cgu()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(409).set_body_json(status_error(409, "Conflict")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(progressing_cgu()))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        update_with_conflict_retry(&api, CGU_NAME, |obj: &mut DynamicObject| {
            obj.data["spec"]["enable"] = json!(false);
        })
        .await
        .unwrap();

        assert_eq!(requests_with_method(&server, "GET").await, 2);
        assert_eq!(requests_with_method(&server, "PUT").await, 2);
    }

    #[tokio::test]
    async fn test_update_with_conflict_retry_fails_on_other_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(progressing_cgu()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(CGU_PATH))
            .respond_with(ResponseTemplate::new(422).set_body_json(status_error(422, "Invalid")))
            .mount(&server)
            .await;

        let api = dynamic_api(mock_client(&server), RanKind::ClusterGroupUpgrade, Some(NAMESPACE));
        let err = update_with_conflict_retry(&api, CGU_NAME, |_: &mut DynamicObject| {})
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::Permanent(_)));
        assert_eq!(requests_with_method(&server, "PUT").await, 1);
    }
}
