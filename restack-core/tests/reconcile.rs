//! End-to-end reconciliation tests over the scripted and in-memory stack
//! clients.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use restack_core::config::{DeployConfig, TEMPLATE_SHA_KEY};
use restack_core::test_util::{
    description, InMemoryStackService, MockResult, MockStackClient, RecordedCall,
};
use restack_core::{
    fingerprint, DeployRunner, HostEnv, Outcome, Parameter, StackError, StackReconciler,
    StatusPoller,
};

const STACK: &str = "web-prod-resources";

fn template() -> Value {
    json!({"Resources": {"Bucket": {"Type": "X"}}})
}

fn fast_config() -> DeployConfig {
    DeployConfig {
        poll_interval: Duration::from_millis(1),
        ..DeployConfig::default()
    }
}

#[tokio::test]
async fn create_path_sends_fingerprint_and_polls_to_terminal() {
    let template = template();
    let digest = fingerprint(&template);

    let client = MockStackClient::new();
    client.push_describe(Some(description(STACK, "CREATE_IN_PROGRESS", Some(&digest))));
    client.push_describe(Some(description(STACK, "CREATE_COMPLETE", Some(&digest))));

    let reconciler = StackReconciler::new(client, &fast_config());
    let outcome = reconciler.reconcile(STACK, &template, None).await.unwrap();
    assert_eq!(outcome, Outcome::Created("CREATE_COMPLETE".to_string()));

    let mutating = reconciler.client().mutating_calls();
    assert_eq!(mutating.len(), 1);
    match &mutating[0] {
        RecordedCall::Create { name, parameters, .. } => {
            assert_eq!(name, STACK);
            assert_eq!(
                parameters,
                &vec![Parameter::new(TEMPLATE_SHA_KEY, digest)]
            );
        }
        other => panic!("expected a create call, got {:?}", other),
    }
}

#[tokio::test]
async fn poller_retries_twice_then_resolves() {
    let client = MockStackClient::new();
    client.push_describe(Some(description(STACK, "CREATE_IN_PROGRESS", None)));
    client.push_describe(Some(description(STACK, "CREATE_IN_PROGRESS", None)));
    client.push_describe(Some(description(STACK, "CREATE_COMPLETE", None)));

    let poller = StatusPoller::new(
        Duration::from_millis(1),
        vec!["_COMPLETE".to_string(), "_FAILED".to_string()],
    );
    let status = poller.wait_until_terminal(&client, STACK, None).await.unwrap();

    assert_eq!(status, "CREATE_COMPLETE");
    // Two not-yet-terminal reads, each followed by a suspend, then the
    // terminal one.
    assert_eq!(client.describe_count(), 3);
}

#[tokio::test]
async fn poller_treats_missing_stack_as_fatal() {
    let client = MockStackClient::new();
    client.push_describe(None);

    let poller = StatusPoller::new(Duration::from_millis(1), vec!["_COMPLETE".to_string()]);
    let err = poller.wait_until_terminal(&client, STACK, None).await.unwrap_err();

    assert!(matches!(err, StackError::UnknownStack(_)));
    assert_eq!(client.describe_count(), 1);
}

#[tokio::test]
async fn second_run_with_unchanged_template_mutates_nothing() {
    let template = template();
    let service = InMemoryStackService::new();
    let reconciler = StackReconciler::new(service, &fast_config());

    let first = reconciler.reconcile(STACK, &template, None).await.unwrap();
    assert_eq!(first, Outcome::Created("CREATE_COMPLETE".to_string()));

    let second = reconciler.reconcile(STACK, &template, None).await.unwrap();
    assert_eq!(second, Outcome::Unchanged);

    assert_eq!(reconciler.client().created(), 1);
    assert_eq!(reconciler.client().updated(), 0);
}

#[tokio::test]
async fn changed_template_updates_with_new_fingerprint() {
    let service = InMemoryStackService::new();
    let reconciler = StackReconciler::new(service, &fast_config());

    let v1 = template();
    let v2 = json!({"Resources": {"Bucket": {"Type": "Y"}}});

    reconciler.reconcile(STACK, &v1, None).await.unwrap();
    let outcome = reconciler.reconcile(STACK, &v2, None).await.unwrap();
    assert_eq!(outcome, Outcome::Updated("UPDATE_COMPLETE".to_string()));

    assert_eq!(reconciler.client().created(), 1);
    assert_eq!(reconciler.client().updated(), 1);
    let stored = reconciler.client().get(STACK).unwrap();
    assert_eq!(stored.parameter(TEMPLATE_SHA_KEY), Some(fingerprint(&v2).as_str()));
}

#[tokio::test]
async fn conflict_then_missing_stack_is_an_inconsistency() {
    // Create reports a collision, describe finds nothing: fatal, no update.
    let client = MockStackClient::new().with_create_result(MockResult::Conflict);

    let reconciler = StackReconciler::new(client, &fast_config());
    let err = reconciler.reconcile(STACK, &template(), None).await.unwrap_err();

    assert!(matches!(err, StackError::UnknownStack(_)));
    let mutating = reconciler.client().mutating_calls();
    assert_eq!(mutating.len(), 1, "no update may follow the inconsistency");
    assert!(matches!(mutating[0], RecordedCall::Create { .. }));
}

#[tokio::test]
async fn create_failure_propagates_unchanged() {
    let client = MockStackClient::new().with_create_result(MockResult::Failure);

    let reconciler = StackReconciler::new(client, &fast_config());
    let err = reconciler.reconcile(STACK, &template(), None).await.unwrap_err();

    assert!(matches!(err, StackError::Remote(_)));
    assert_eq!(reconciler.client().describe_count(), 0);
}

#[tokio::test]
async fn shutdown_signal_aborts_the_poll_loop() {
    let client = MockStackClient::new();
    client.repeat_describe(Some(description(STACK, "CREATE_IN_PROGRESS", None)));

    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
    stop_tx.send(()).await.unwrap();

    let reconciler = StackReconciler::new(client, &fast_config());
    let err = reconciler
        .reconcile(STACK, &template(), Some(&mut stop_rx))
        .await
        .unwrap_err();

    assert!(matches!(err, StackError::Aborted));
}

struct TestHost {
    provider: &'static str,
    emulation: bool,
}

impl HostEnv for TestHost {
    fn provider(&self) -> &str {
        self.provider
    }

    fn deployment_name(&self) -> &str {
        "web-prod"
    }

    fn emulation_tooling_active(&self) -> bool {
        self.emulation
    }
}

#[tokio::test]
async fn deploy_run_derives_stack_name_from_deployment_name() {
    let host = TestHost { provider: "aws", emulation: true };
    let runner = DeployRunner::new(InMemoryStackService::new(), &fast_config());

    let outcome = runner.run(&host, &template(), None).await.unwrap();
    assert_eq!(outcome, Outcome::Created("CREATE_COMPLETE".to_string()));
    assert!(runner.client().get("web-prod-resources").is_some());
}

#[tokio::test]
async fn precondition_failure_skips_without_remote_calls() {
    let host = TestHost { provider: "aws", emulation: true };
    let runner = DeployRunner::new(MockStackClient::new(), &fast_config());

    let outcome = runner.run(&host, &json!({}), None).await.unwrap();
    assert!(matches!(outcome, Outcome::Skipped(_)));
    assert!(runner.client().calls().is_empty());
}

#[tokio::test]
async fn inactive_emulation_tooling_skips_unless_allowed() {
    let host = TestHost { provider: "aws", emulation: false };

    let strict = DeployRunner::new(InMemoryStackService::new(), &fast_config());
    let outcome = strict.run(&host, &template(), None).await.unwrap();
    assert!(matches!(outcome, Outcome::Skipped(_)));
    assert_eq!(strict.client().created(), 0);

    let relaxed = DeployRunner::new(InMemoryStackService::new(), &fast_config())
        .allow_without_emulation();
    let outcome = relaxed.run(&host, &template(), None).await.unwrap();
    assert_eq!(outcome, Outcome::Created("CREATE_COMPLETE".to_string()));
}
