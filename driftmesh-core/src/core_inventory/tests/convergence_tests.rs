//! Multi-node convergence scenarios
//!
//! Two services wired back-to-back over channel pumps standing in for the
//! transport. Each pump forwards one node's NetCommand frames to the other
//! node as NetEvent frames on the shared connection.

use crate::config::SyncConfig;
use crate::core_crypto::Keypair;
use crate::core_inventory::service::InventoryService;
use crate::core_net::{ConnectionId, NetCommand, NetEvent};
use crate::core_storage::{
    AddEntry, Entry, Metadata, Payload, RefreshEntry, RemoveEntry, StoreRegistry,
};
use tokio::sync::mpsc;

fn node(metadata: Metadata) -> (InventoryService, mpsc::Receiver<NetCommand>) {
    let registry = StoreRegistry::new();
    registry.register(metadata);
    let (net_tx, net_rx) = mpsc::channel(64);
    let service = InventoryService::new(SyncConfig::default(), registry, net_tx);
    (service, net_rx)
}

fn pump(mut out: mpsc::Receiver<NetCommand>, peer: InventoryService) {
    tokio::spawn(async move {
        while let Some(NetCommand::Send { connection, frame }) = out.recv().await {
            peer.handle_net_event(NetEvent::Frame {
                connection,
                bytes: frame,
            })
            .await;
        }
    });
}

async fn link(a: &InventoryService, b: &InventoryService) -> ConnectionId {
    let connection = ConnectionId::new(1);
    a.handle_net_event(NetEvent::Opened(connection)).await;
    b.handle_net_event(NetEvent::Opened(connection)).await;
    connection
}

fn signed_add(kp: &Keypair, data: &[u8], seq: i64) -> AddEntry {
    AddEntry::sign(Payload::new("offer", data.to_vec()), seq, kp)
}

#[tokio::test]
async fn test_fresh_node_catches_up_in_one_round() {
    let (node_a, a_out) = node(Metadata::new("offer"));
    let (node_b, b_out) = node(Metadata::new("offer"));
    link(&node_a, &node_b).await;
    pump(a_out, node_b.clone());
    pump(b_out, node_a.clone());

    let kp = Keypair::generate();
    for i in 0..5u8 {
        node_a
            .registry()
            .apply("offer", Entry::Add(signed_add(&kp, &[i], 0)))
            .unwrap();
    }

    let stats = node_b.run_round("offer").await.unwrap();
    assert_eq!(stats.queried, 1);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(node_b.registry().get("offer").unwrap().len(), 5);

    // a second round is a no-op delta
    let stats = node_b.run_round("offer").await.unwrap();
    assert_eq!(stats.succeeded, 1);
    assert_eq!(node_b.registry().get("offer").unwrap().len(), 5);
}

#[tokio::test]
async fn test_refresh_and_remove_propagate() {
    let (node_a, a_out) = node(Metadata::new("offer"));
    let (node_b, b_out) = node(Metadata::new("offer"));
    link(&node_a, &node_b).await;
    pump(a_out, node_b.clone());
    pump(b_out, node_a.clone());

    let kp = Keypair::generate();
    let kept = signed_add(&kp, b"kept", 0);
    let doomed = signed_add(&kp, b"doomed", 0);
    let kept_hash = kept.hash();
    let doomed_hash = doomed.hash();

    for entry in [kept.clone(), doomed.clone()] {
        node_a
            .registry()
            .apply("offer", Entry::Add(entry.clone()))
            .unwrap();
        node_b.registry().apply("offer", Entry::Add(entry)).unwrap();
    }

    // node A moves on: one refresh, one remove
    node_a
        .registry()
        .apply("offer", Entry::Refresh(RefreshEntry::sign(kept_hash, 1, &kp)))
        .unwrap();
    node_a
        .registry()
        .apply("offer", Entry::Remove(RemoveEntry::sign(doomed_hash, 1, &kp)))
        .unwrap();

    let stats = node_b.run_round("offer").await.unwrap();
    assert_eq!(stats.succeeded, 1);

    let store_b = node_b.registry().get("offer").unwrap();
    assert_eq!(store_b.sequence_number(&kept_hash), Some(1));
    assert_eq!(store_b.sequence_number(&doomed_hash), Some(1));

    // the tombstone arrived: refreshing the removed hash fails on B too
    let revive = RefreshEntry::sign(doomed_hash, 2, &kp);
    assert!(store_b.refresh(revive).is_err());
}

#[tokio::test]
async fn test_truncated_store_converges_over_repeated_rounds() {
    // responder caps each inventory at 2 entries; the requester's filter
    // grows every round until nothing is missing
    let (node_a, a_out) = node(Metadata::new("offer").with_max_entries(2));
    let (node_b, b_out) = node(Metadata::new("offer").with_max_entries(2));
    link(&node_a, &node_b).await;
    pump(a_out, node_b.clone());
    pump(b_out, node_a.clone());

    let kp = Keypair::generate();
    for i in 0..5u8 {
        node_a
            .registry()
            .apply("offer", Entry::Add(signed_add(&kp, &[i], 0)))
            .unwrap();
    }

    for _ in 0..3 {
        let stats = node_b.run_round("offer").await.unwrap();
        assert_eq!(stats.succeeded, 1);
    }
    assert_eq!(node_b.registry().get("offer").unwrap().len(), 5);
}

#[tokio::test]
async fn test_divergent_nodes_converge_both_ways() {
    let (node_a, a_out) = node(Metadata::new("offer"));
    let (node_b, b_out) = node(Metadata::new("offer"));
    link(&node_a, &node_b).await;
    pump(a_out, node_b.clone());
    pump(b_out, node_a.clone());

    let kp = Keypair::generate();
    node_a
        .registry()
        .apply("offer", Entry::Add(signed_add(&kp, b"only-on-a", 0)))
        .unwrap();
    node_b
        .registry()
        .apply("offer", Entry::Add(signed_add(&kp, b"only-on-b", 0)))
        .unwrap();

    node_a.run_round("offer").await.unwrap();
    node_b.run_round("offer").await.unwrap();

    assert_eq!(node_a.registry().get("offer").unwrap().len(), 2);
    assert_eq!(node_b.registry().get("offer").unwrap().len(), 2);
}
