//! Integration test: rebalancing between file-backed nodes.

use drift_group::GetResult;
use drift_integration_tests::{IntegrationCluster, test_object};
use drift_store::{FileStore, StorageBackend, encode_key};
use drift_types::PlacementStrategy;
use serde_json::json;

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_file_nodes_rebalance_without_loss() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = IntegrationCluster::with_files(2, PlacementStrategy::Consistent, dir.path());

    let mut objects = Vec::new();
    for i in 0..80 {
        // Keys that would collide under a lossy filename scheme.
        let key = if i % 2 == 0 {
            format!("dir/obj.{i}")
        } else {
            format!("dir_obj_{i}")
        };
        c.put(&key, test_object(i)).await.unwrap();
        objects.push((key, test_object(i)));
    }

    let old = c.view().clone();
    c.add_node();
    let reports = c.rebalance(&old).await;
    assert!(reports.iter().all(|r| r.is_complete()));
    assert_eq!(c.total_objects().await, objects.len());
    c.assert_placed(&objects).await;
}

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_file_layout_is_per_node_and_group() {
    let dir = tempfile::tempdir().unwrap();
    let c = IntegrationCluster::with_files(2, PlacementStrategy::Rendezvous, dir.path());
    c.put("hello", json!({"greeting": "world"})).await.unwrap();

    let owner = c.owner("hello");
    let port = owner.local().port;
    let group_dir = dir
        .path()
        .join(port.to_string())
        .join(encode_key(&owner.config().gid));
    assert!(group_dir.join(format!("{}.json", encode_key("hello"))).is_file());

    // The data survives reopening the directory.
    let reopened = FileStore::new(&group_dir).unwrap();
    assert_eq!(
        reopened.get("hello").await.unwrap(),
        Some(json!({"greeting": "world"}))
    );
}

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_listing_after_rebalance_matches_content() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = IntegrationCluster::with_files(1, PlacementStrategy::Rendezvous, dir.path());
    for i in 0..30 {
        c.put(&format!("k{i}"), json!(i)).await.unwrap();
    }
    let old = c.view().clone();
    let added = c.add_node();
    c.rebalance(&old).await;

    let mut seen = 0;
    for index in [0, added] {
        let GetResult::Keys(keys) = c.node(index).get(None).await.unwrap() else {
            panic!("expected a key listing");
        };
        for key in keys {
            assert_eq!(c.owner(&key).local_id(), c.node(index).local_id());
            seen += 1;
        }
    }
    assert_eq!(seen, 30);
}
