//! Concurrent routing against a shared policy
//!
//! A parsed policy is shared across requests. The first labelled lookups race
//! to build the category cache; every request must still see the full cache.


use futures::future::join_all;
use llmroute::testing::mocks::{MockClassifier, MockOutcome};
use llmroute::{
    Category, DeploymentPolicy, EndpointRef, Environment, PolicyRouter, RoutingPolicy,
};
use std::sync::Arc;
use test_helpers::production_policy;

const CATEGORY_COUNT: usize = 32;

fn wide_policy() -> RoutingPolicy {
    let categories = (0..CATEGORY_COUNT)
        .map(|i| Category::new(format!("Category{i:02}"), format!("m{i}"), format!("ep-{i:02}")))
        .collect();
    production_policy(
        DeploymentPolicy::new(Some(EndpointRef::new("m-default", "ep-default")), categories),
        1,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_first_lookups_see_complete_cache() {
    let policy = Arc::new(wide_policy());

    let tasks = (0..256).map(|i| {
        let policy = Arc::clone(&policy);
        tokio::spawn(async move {
            let label = format!("Category{:02}", i % CATEGORY_COUNT);
            let router = PolicyRouter::new(Arc::new(MockClassifier::returning(label.clone())));
            let decision = router
                .route(&policy, Environment::Production, Some("request"))
                .await;
            (label, decision)
        })
    });

    for result in join_all(tasks).await {
        let (label, decision) = result.unwrap();
        let expected = format!("ep-{}", &label["Category".len()..]);
        assert_eq!(decision.target_endpoint(), expected, "label {label}");
        assert_eq!(decision.suspend_duration_millis(), Some(1000));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_router_handles_interleaved_requests() {
    let policy = Arc::new(wide_policy());
    let script = (0..CATEGORY_COUNT)
        .map(|i| MockOutcome::Label(format!("category{i:02}")))
        .collect();
    let classifier = Arc::new(MockClassifier::new(script));
    let router = Arc::new(PolicyRouter::new(classifier.clone()));

    let tasks = (0..CATEGORY_COUNT).map(|_| {
        let policy = Arc::clone(&policy);
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            router
                .route(&policy, Environment::Production, Some("request"))
                .await
        })
    });

    let mut endpoints: Vec<String> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().target_endpoint().to_string())
        .collect();
    endpoints.sort();

    let expected: Vec<String> = (0..CATEGORY_COUNT).map(|i| format!("ep-{i:02}")).collect();
    assert_eq!(endpoints, expected);
    assert_eq!(classifier.call_count(), CATEGORY_COUNT);
}

#[test]
fn test_concurrent_select_endpoint_from_threads() {
    let policy = Arc::new(wide_policy());

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let policy = Arc::clone(&policy);
            std::thread::spawn(move || {
                let deployment = policy.deployment(Environment::Production).unwrap();
                (0..CATEGORY_COUNT)
                    .map(|i| {
                        let idx = (i + t) % CATEGORY_COUNT;
                        deployment
                            .select_endpoint(Some(&format!("Category{idx:02}")))
                            .map(|e| e.endpoint_id.clone())
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for (t, handle) in handles.into_iter().enumerate() {
        let results = handle.join().unwrap();
        for (i, endpoint) in results.into_iter().enumerate() {
            let idx = (i + t) % CATEGORY_COUNT;
            assert_eq!(endpoint, Some(format!("ep-{idx:02}")));
        }
    }
}
