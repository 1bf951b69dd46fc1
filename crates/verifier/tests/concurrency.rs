//! Concurrent submissions must not slip a replay past the counter check.

use std::sync::Arc;

use anchor_verifier::{
    AnchorVerifier, AttestationReceipt, ExecutionHash, FirmwareMeasurement, HardwareIdentity,
    Registry, Rejection,
};

const FIRMWARE: [u8; 32] = [0x42; 32];

async fn verifier_with_nodes(nodes: &[HardwareIdentity]) -> Arc<AnchorVerifier> {
    let registry = Registry::new();
    for (i, node) in nodes.iter().enumerate() {
        registry
            .register_node(&node.to_hex(), format!("node-{i}"))
            .await
            .unwrap();
    }
    registry
        .approve_firmware(&FirmwareMeasurement::new(FIRMWARE).to_hex())
        .unwrap();

    Arc::new(AnchorVerifier::new(registry))
}

fn receipt(node: HardwareIdentity, counter: u64) -> AttestationReceipt {
    AttestationReceipt::seal(
        node,
        FirmwareMeasurement::new(FIRMWARE),
        ExecutionHash::new([0x07; 32]),
        counter,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_counter_accepted_exactly_once() {
    let node = HardwareIdentity::new([0x01; 32]);
    let verifier = verifier_with_nodes(&[node]).await;
    let receipt = receipt(node, 1);

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            let receipt = receipt.clone();
            tokio::spawn(async move { verifier.verify_receipt(&receipt).await })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(rejection) => assert!(matches!(rejection, Rejection::ReplayDetected { .. })),
        }
    }

    assert_eq!(accepted, 1);
    let record = verifier.registry().node(&node).await.unwrap();
    assert_eq!(record.last_counter(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_identities_progress_independently() {
    let nodes: Vec<_> = (1..=8u8).map(|i| HardwareIdentity::new([i; 32])).collect();
    let verifier = verifier_with_nodes(&nodes).await;

    let handles: Vec<_> = nodes
        .iter()
        .map(|node| {
            let verifier = Arc::clone(&verifier);
            let node = *node;
            tokio::spawn(async move {
                for counter in 1..=50 {
                    verifier
                        .verify_receipt(&receipt(node, counter))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    for node in &nodes {
        let record = verifier.registry().node(node).await.unwrap();
        assert_eq!(record.last_counter(), 50);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_counters_end_at_maximum() {
    let node = HardwareIdentity::new([0x02; 32]);
    let verifier = verifier_with_nodes(&[node]).await;

    let handles: Vec<_> = (1..=64u64)
        .map(|counter| {
            let verifier = Arc::clone(&verifier);
            tokio::spawn(async move { verifier.verify_receipt(&receipt(node, counter)).await })
        })
        .collect();

    let mut accepted = Vec::new();
    for handle in handles {
        if let Ok(accept) = handle.await.unwrap() {
            accepted.push((accept.previous_counter, accept.counter));
        }
    }

    // Each accept observed a distinct previous counter and moved past it.
    assert!(accepted.iter().all(|(previous, counter)| counter > previous));
    let mut previous: Vec<u64> = accepted.iter().map(|(previous, _)| *previous).collect();
    previous.sort_unstable();
    assert!(previous.windows(2).all(|pair| pair[0] < pair[1]));

    let highest = accepted.iter().map(|(_, counter)| *counter).max().unwrap();
    let record = verifier.registry().node(&node).await.unwrap();
    assert_eq!(record.last_counter(), highest);
}
