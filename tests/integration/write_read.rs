//! Integration test: routed writes and reads across a group.

use drift_integration_tests::{IntegrationCluster, test_object};
use drift_types::{PlacementStrategy, compute_content_id};
use serde_json::json;

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_routed_round_trip_on_every_strategy() {
    for placement in [
        PlacementStrategy::Naive,
        PlacementStrategy::Consistent,
        PlacementStrategy::Rendezvous,
    ] {
        let c = IntegrationCluster::new(4, placement);
        let mut objects = Vec::new();
        for i in 0..100 {
            let key = format!("user/{i}");
            c.put(&key, test_object(i)).await.unwrap();
            objects.push((key, test_object(i)));
        }
        c.assert_placed(&objects).await;
        assert_eq!(c.total_objects().await, 100);
    }
}

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_objects_spread_over_members() {
    let c = IntegrationCluster::new(3, PlacementStrategy::Rendezvous);
    for i in 0..300 {
        c.put(&format!("k{i}"), json!(i)).await.unwrap();
    }
    for index in 0..c.node_count() {
        let held = c.node(index).keys().await.unwrap().len();
        assert!(held > 50, "node {index} holds only {held} of 300 keys");
    }
}

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_content_addressed_writes_deduplicate() {
    let c = IntegrationCluster::new(3, PlacementStrategy::Consistent);
    let first = c.put_content(json!({"b": 2, "a": 1})).await.unwrap();
    let second = c.put_content(json!({"a": 1, "b": 2})).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, compute_content_id(&json!({"a": 1, "b": 2})));
    assert_eq!(c.holders(&first).await.len(), 1);
    assert_eq!(c.total_objects().await, 1);
}

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_delete_removes_from_owner_only() {
    let c = IntegrationCluster::new(3, PlacementStrategy::Consistent);
    for i in 0..20 {
        c.put(&format!("k{i}"), json!(i)).await.unwrap();
    }

    assert_eq!(c.del("k7").await.unwrap(), json!(7));
    assert!(c.holders("k7").await.is_empty());
    assert!(c.del("k7").await.unwrap_err().is_not_found());
    assert_eq!(c.total_objects().await, 19);
}

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_concurrent_routed_writes() {
    let c = std::sync::Arc::new(IntegrationCluster::new(3, PlacementStrategy::Consistent));
    let mut handles = Vec::new();
    for i in 0..50 {
        let c = std::sync::Arc::clone(&c);
        handles.push(tokio::spawn(async move {
            c.put(&format!("obj-{i}"), test_object(i)).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    for i in 0..50 {
        assert_eq!(c.get(&format!("obj-{i}")).await.unwrap(), test_object(i));
    }
}
