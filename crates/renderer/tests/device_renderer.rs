//! Device renderer integration tests
//!
//! Exercises path setup, teardown and rollback against the in-memory device.

use otn_orch_common::{DeviceOperation, DevicePath, Fault};
use otn_renderer::{
    DeviceRenderer, DeviceRendererConfig, NodeInterfaceRecord, RollbackHistory,
    REQUEST_PROCESSED,
};
use otn_test::{
    empty_tp_path, hop_with_roles, roadm_path, single_node_path, DeviceTestEnv, DeviceVerifier,
    ALL_ROLES, SERVICE_NAME,
};
use otn_types::{Channel, Direction, NodeId, ServicePath, TerminationPointRole};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn renderer(env: &DeviceTestEnv) -> DeviceRenderer {
    DeviceRenderer::new(env.transactions(), DeviceRendererConfig::default())
}

#[tokio::test]
async fn test_setup_single_roadm_node() {
    let env = DeviceTestEnv::with_nodes(["node1"]);
    let renderer = renderer(&env);

    let outcome = renderer
        .setup_service_path(&single_node_path("node1"), Direction::AToZ)
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(
        outcome.result,
        "Roadm-connection successfully created for nodes: node1"
    );
    assert_eq!(outcome.node_interfaces.len(), 1);

    let record = &outcome.node_interfaces[0];
    assert_eq!(record.node_id(), &NodeId::from("node1"));
    assert!(record.contains_interface("src-PP-1"));
    assert!(record.contains_interface("dst-PP-1"));
    assert_eq!(record.connection_ids(), &["src-PP-1-x-dst-PP-1".to_string()]);

    let verifier = DeviceVerifier::new(env.device());
    verifier.assert_interface_exists("node1", "src-PP-1").unwrap();
    verifier
        .assert_connection_exists("node1", "src-PP-1-x-dst-PP-1")
        .unwrap();
}

#[tokio::test]
async fn test_success_message_lists_nodes_in_path_order() {
    let env = DeviceTestEnv::with_nodes(["node1", "node2", "node3"]);
    let renderer = renderer(&env);

    let outcome = renderer
        .setup_service_path(&roadm_path(&["node3", "node1", "node2"]), Direction::AToZ)
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(
        outcome.result,
        "Roadm-connection successfully created for nodes: node3, node1, node2"
    );
    let nodes: Vec<_> = outcome
        .node_interfaces
        .iter()
        .map(|r| r.node_id().to_string())
        .collect();
    assert_eq!(nodes, vec!["node3", "node1", "node2"]);
}

#[tokio::test]
async fn test_unmounted_node_fails_both_directions_without_writes() {
    let env = DeviceTestEnv::with_nodes(["node1"]);
    let renderer = renderer(&env);
    let path = single_node_path("node2");

    for (path, direction) in [
        (path.clone(), Direction::AToZ),
        (path.reversed(), Direction::ZToA),
    ] {
        let outcome = renderer.setup_service_path(&path, direction).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.result, "node2 is not mounted on the controller");
        assert!(outcome.node_interfaces.is_empty());
    }

    DeviceVerifier::new(env.device()).assert_no_writes().unwrap();
}

#[tokio::test]
async fn test_several_unmounted_nodes_are_all_reported() {
    let env = DeviceTestEnv::with_nodes(["node2"]);
    let renderer = renderer(&env);

    let outcome = renderer
        .setup_service_path(&roadm_path(&["node1", "node2", "node3"]), Direction::AToZ)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(
        outcome.result,
        "node1 is not mounted on the controller\nnode3 is not mounted on the controller"
    );
    DeviceVerifier::new(env.device()).assert_no_writes().unwrap();
}

#[tokio::test]
async fn test_cross_connect_only_between_roadm_ports() {
    for src in ALL_ROLES {
        for dst in ALL_ROLES {
            let env = DeviceTestEnv::with_nodes(["node1"]);
            let renderer = renderer(&env);
            let path = ServicePath::new(
                SERVICE_NAME,
                Channel::Wavelength(1),
                vec![hop_with_roles("node1", src, dst)],
            );

            let outcome = renderer
                .setup_service_path(&path, Direction::AToZ)
                .await
                .unwrap();
            assert!(outcome.success, "pair ({}, {}): {}", src, dst, outcome.result);

            let expected = usize::from(src.is_roadm() && dst.is_roadm());
            assert_eq!(
                outcome.node_interfaces[0].connection_ids().len(),
                expected,
                "pair ({}, {})",
                src,
                dst
            );
        }
    }
}

#[tokio::test]
async fn test_network_port_gets_three_interfaces() {
    let env = DeviceTestEnv::with_nodes(["XPDR-A1"]);
    let renderer = renderer(&env);
    let path = ServicePath::new(
        SERVICE_NAME,
        Channel::Wavelength(5),
        vec![hop_with_roles(
            "XPDR-A1",
            TerminationPointRole::Client,
            TerminationPointRole::Network,
        )],
    );

    let outcome = renderer
        .setup_service_path(&path, Direction::AToZ)
        .await
        .unwrap();
    let names: Vec<_> = outcome.node_interfaces[0]
        .interfaces()
        .iter()
        .map(|i| i.name.clone())
        .collect();
    assert_eq!(
        names,
        vec![
            "XPDR1-CLIENT1-ETHERNET",
            "XPDR1-NETWORK1-5",
            "XPDR1-NETWORK1-OTU",
            "XPDR1-NETWORK1-ODU"
        ]
    );
}

#[tokio::test]
async fn test_empty_tps_need_no_device_calls() {
    let env = DeviceTestEnv::with_nodes(["node1", "node2"]);
    let renderer = renderer(&env);

    let outcome = renderer
        .setup_service_path(&empty_tp_path(&["node1", "node2", "node3"]), Direction::AToZ)
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.result, REQUEST_PROCESSED);
    assert!(outcome.node_interfaces.is_empty());
    assert_eq!(env.device().call_count(), 0);
}

#[tokio::test]
async fn test_rollback_of_existing_cross_connect() {
    let env = DeviceTestEnv::with_nodes(["node1"]);
    let renderer = renderer(&env);
    let node = NodeId::from("node1");
    env.device().preload(
        &node,
        DevicePath::roadm_connection("src-PP-1-x-dst-PP-1"),
        serde_json::json!({}),
    );

    let mut record = NodeInterfaceRecord::new("node1");
    record.push_connection("src-PP-1-x-dst-PP-1");
    let outcome = renderer
        .renderer_rollback(RollbackHistory::from(vec![record]))
        .await;

    assert!(outcome.success);
    assert!(outcome.failed_to_rollback.is_empty());
    DeviceVerifier::new(env.device())
        .assert_node_clean("node1")
        .unwrap();
}

#[tokio::test]
async fn test_rollback_of_undeletable_cross_connect() {
    let env = DeviceTestEnv::with_nodes(["node1"]);
    let renderer = renderer(&env);

    let mut record = NodeInterfaceRecord::new("node1");
    record.push_connection("src-PP-1-x-dst-PP-1");
    let outcome = renderer
        .renderer_rollback(RollbackHistory::from(vec![record]))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.failed_to_rollback.len(), 1);
    let failed = &outcome.failed_to_rollback[0];
    assert_eq!(failed.node_id, NodeId::from("node1"));
    assert!(!failed.interfaces.is_empty());
    assert_eq!(failed.interfaces, vec!["src-PP-1-x-dst-PP-1".to_string()]);
}

#[tokio::test]
async fn test_failed_setup_is_fully_compensated() {
    let env = DeviceTestEnv::with_nodes(["node1", "node2", "node3"]);
    env.device().inject_fault(
        Fault::on(DeviceOperation::Write)
            .for_node("node2")
            .matching("roadm-connections/"),
    );
    let renderer = renderer(&env);

    let outcome = renderer
        .setup_service_path(&roadm_path(&["node1", "node2", "node3"]), Direction::AToZ)
        .await
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.node_interfaces.len(), 3);

    // node2 got its interfaces but no cross-connect
    let partial = &outcome.node_interfaces[1];
    assert_eq!(partial.interfaces().len(), 2);
    assert!(partial.connection_ids().is_empty());

    let rollback = renderer
        .renderer_rollback(RollbackHistory::from(outcome.node_interfaces))
        .await;
    assert!(rollback.success);

    let verifier = DeviceVerifier::new(env.device());
    for node in ["node1", "node2", "node3"] {
        verifier.assert_node_clean(node).unwrap();
    }
}

#[tokio::test]
async fn test_delete_service_path_removes_everything() {
    let env = DeviceTestEnv::with_nodes(["node1", "node2"]);
    let renderer = renderer(&env);
    let path = roadm_path(&["node1", "node2"]);

    assert!(renderer
        .setup_service_path(&path, Direction::AToZ)
        .await
        .unwrap()
        .success);

    let outcome = renderer.delete_service_path(&path).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.result, REQUEST_PROCESSED);

    let verifier = DeviceVerifier::new(env.device());
    verifier.assert_node_clean("node1").unwrap();
    verifier.assert_node_clean("node2").unwrap();
}

#[tokio::test]
async fn test_delete_service_path_reports_failed_interface_deletes() {
    let env = DeviceTestEnv::with_nodes(["node1"]);
    let renderer = renderer(&env);
    let path = single_node_path("node1");

    assert!(renderer
        .setup_service_path(&path, Direction::AToZ)
        .await
        .unwrap()
        .success);

    env.device()
        .inject_fault(Fault::on(DeviceOperation::Delete).matching("interface/"));
    let outcome = renderer.delete_service_path(&path).await.unwrap();

    assert!(!outcome.success);
    assert_ne!(outcome.result, REQUEST_PROCESSED);
    assert!(outcome.result.contains("src-PP-1"));
    assert!(outcome.result.contains("dst-PP-1"));
}

#[tokio::test]
async fn test_device_timeout_is_a_failure() {
    let env = DeviceTestEnv::with_timeout(["node1"], Duration::from_millis(50));
    env.device()
        .set_latency(&NodeId::from("node1"), Duration::from_millis(300));
    let renderer = renderer(&env);

    let outcome = renderer
        .setup_service_path(&single_node_path("node1"), Direction::AToZ)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.result.contains("timed out"), "{}", outcome.result);
}

#[tokio::test]
async fn test_bounded_pool_still_provisions_every_node() {
    let env = DeviceTestEnv::with_nodes(["n1", "n2", "n3", "n4", "n5"]);
    let renderer = DeviceRenderer::new(
        env.transactions(),
        DeviceRendererConfig {
            max_parallel_nodes: 2,
        },
    );

    let outcome = renderer
        .setup_service_path(&roadm_path(&["n1", "n2", "n3", "n4", "n5"]), Direction::AToZ)
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.node_interfaces.len(), 5);
    let verifier = DeviceVerifier::new(env.device());
    for node in ["n1", "n2", "n3", "n4", "n5"] {
        assert_eq!(verifier.object_count(node), 3);
    }
}
