use std::sync::Arc;
use std::time::Duration;

use api_types::PodInfo;
use api_types::PodInfoSpec;
use podinfo_controller::dispatcher::Dispatcher;
use podinfo_controller::dispatcher::DispatcherConfig;
use podinfo_controller::domain::mock::node;
use podinfo_controller::domain::mock::MockPodInfoStore;
use podinfo_controller::domain::mock::MockPodSource;
use podinfo_controller::domain::mock::PodBuilder;
use podinfo_controller::domain::mock::StoreCall;
use podinfo_controller::domain::IdentityCache;
use podinfo_controller::domain::PodInfoReconciler;
use podinfo_controller::domain::PodKey;
use podinfo_controller::domain::ReconcileError;
use podinfo_controller::domain::ReconcileOutcome;
use podinfo_controller::domain::ReconcilerSettings;
use similar_asserts::assert_eq;
use test_log::test;

type MockReconciler = PodInfoReconciler<MockPodSource, MockPodInfoStore>;

fn reconciler() -> MockReconciler {
    let pods = MockPodSource::new();
    pods.put_node(node("n1", false));
    pods.put_node(node("cp-1", true));
    PodInfoReconciler::new(
        pods,
        MockPodInfoStore::new("default"),
        Arc::new(IdentityCache::new()),
        ReconcilerSettings::default(),
    )
}

fn key(name: &str) -> PodKey {
    PodKey::new("default", name)
}

fn p1() -> PodBuilder {
    PodBuilder::new("default", "p1")
        .node("n1")
        .scheduler("default-scheduler")
        .cpu_limit("2")
        .cpu_request("2")
        .phase("Running")
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition was not reached in time");
}

#[test(tokio::test)]
async fn pod_lifecycle_creates_then_deletes_its_record() {
    let r = reconciler();
    r.pods().put_pod(p1().build());

    let outcome = r.reconcile(&key("p1")).await.expect("first reconcile");
    assert_eq!(
        outcome,
        ReconcileOutcome::Created {
            record: "podinfo-p1".to_string()
        }
    );

    let records = r.store().records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.record_name(), "podinfo-p1");
    assert_eq!(record.spec.pod_name, "p1");
    assert_eq!(record.spec.node_name, "n1");
    assert_eq!(record.spec.cpu_limit, 2);
    assert_eq!(record.spec.cpu_request, 2);
    assert_eq!(r.cache().get("p1").as_ref(), Some(record));

    // duplicate event
    r.reconcile(&key("p1")).await.expect("second reconcile");
    assert_eq!(r.store().mutating_calls().len(), 1);

    r.pods().remove_pod(&key("p1"));
    r.store().clear_calls();
    let err = r.reconcile(&key("p1")).await.unwrap_err();

    assert!(matches!(err.current_context(), ReconcileError::PodNotFound { .. }));
    assert_eq!(
        r.store().mutating_calls(),
        vec![StoreCall::Delete("podinfo-p1".to_string())]
    );
    assert!(r.cache().get("p1").is_none());
    assert!(r.store().records().is_empty());
}

#[test(tokio::test)]
async fn alternate_scheduler_pod_never_reaches_the_store() {
    let r = reconciler();
    r.pods().put_pod(
        PodBuilder::new("default", "p2")
            .node("n1")
            .scheduler("scheduling-plugin")
            .cpu_limit("1")
            .build(),
    );

    for _ in 0..3 {
        r.reconcile(&key("p2")).await.expect("reconcile");
    }

    assert!(r.store().calls().is_empty());
    assert!(r.cache().is_empty());
}

#[test(tokio::test)]
async fn dispatcher_drives_the_reconciler_to_convergence() {
    let dispatcher = Dispatcher::new(
        reconciler(),
        DispatcherConfig {
            workers: 2,
            requeue_base_delay: Duration::from_millis(1),
            requeue_max_delay: Duration::from_millis(20),
        },
    );
    let r = dispatcher.handler();
    r.pods().put_pod(p1().build());
    r.pods().put_pod(
        PodBuilder::new("default", "p3")
            .node("cp-1")
            .cpu_limit("1")
            .build(),
    );

    // the first attempt fails and is retried
    r.store().set_create_error_mode(true);
    for _ in 0..3 {
        dispatcher.dispatch(key("p1"));
    }
    dispatcher.dispatch(key("p3"));
    eventually(|| !r.store().calls().is_empty()).await;
    r.store().set_create_error_mode(false);

    eventually(|| r.cache().contains("p1")).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let records = r.store().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_name(), "podinfo-p1");
    assert!(!r.cache().contains("p3"));
}

#[test(tokio::test)]
async fn startup_resync_removes_records_of_vanished_pods() {
    let r = reconciler();
    r.pods().put_pod(p1().build());
    let seeded = [
        ("p1", Some("default")),
        ("gone", Some("default")),
        ("legacy", None),
    ];
    for (pod_name, pod_namespace) in seeded {
        r.store().seed(PodInfo::for_pod(
            "default",
            PodInfoSpec {
                pod_name: pod_name.to_string(),
                pod_namespace: pod_namespace.map(str::to_string),
                node_name: "n1".to_string(),
                cpu_limit: 2,
                cpu_request: 2,
            },
        ));
    }

    let keys = r.warm_cache().await.expect("warm cache");
    assert_eq!(keys, vec![key("gone"), key("p1")]);
    assert_eq!(r.cache().len(), 3);

    for key in &keys {
        let _ = r.reconcile(key).await;
    }

    assert_eq!(
        r.store().mutating_calls(),
        vec![StoreCall::Delete("podinfo-gone".to_string())]
    );
    assert!(r.cache().contains("p1"));
    assert!(r.cache().contains("legacy"));
    assert!(!r.cache().contains("gone"));
}
