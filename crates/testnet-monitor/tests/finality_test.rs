//! Finality waits: plain finality, execution finality and finalization of
//! the current epoch.

mod common;

use common::{START_SLOT, monitor, monitor_with, network, slots, ticks_since};
use proven_beacon_client::{
    BeaconState, ChainSpec, Checkpoint, Error as ClientError, FinalityCheckpoints, Fork,
    VersionedBlock,
};
use proven_beacon_client_mock::{block, execution_hash, finalized, root};
use proven_testnet_monitor::{Error, WaitContext};
use tokio::time::Instant;
use tracing_test::traced_test;

fn not_finalized() -> FinalityCheckpoints {
    FinalityCheckpoints::default()
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_finality_waits_for_slowest_node() {
    let network = network(4, Fork::Capella);

    // Node 0 finalizes at tick 5 and moves on to the next epoch at tick 7.
    let first = network.get(0);
    for _ in 0..4 {
        first.consensus.push_finality(Ok(not_finalized()));
    }
    first.consensus.push_finality(Ok(finalized(8, 0xa8)));
    first.consensus.push_finality(Ok(finalized(8, 0xa8)));
    first.consensus.push_finality(Ok(finalized(9, 0xa9)));

    // The others only finalize at tick 7.
    for node in &network.nodes()[1..] {
        for _ in 0..6 {
            node.consensus.push_finality(Ok(not_finalized()));
        }
        node.consensus.push_finality(Ok(finalized(9, 0xa9)));
    }

    let monitor = monitor(&network);
    let start = Instant::now();
    let checkpoint = monitor
        .wait_for_finality(&WaitContext::new())
        .await
        .unwrap();

    assert_eq!(checkpoint, Checkpoint::new(9, root(0xa9)));
    assert_eq!(ticks_since(start), 7);
    for node in network.nodes() {
        assert_eq!(node.consensus.finality_calls(), 7);
        assert_eq!(node.consensus.head_calls(), 7);
    }
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_lagging_node_is_fatal_even_when_others_are_done() {
    let network = network(3, Fork::Capella);
    network.set_finality_everywhere(finalized(8, 1));
    network
        .get(1)
        .consensus
        .set_head(block(Fork::Capella, START_SLOT - 40, 2));

    let err = monitor(&network)
        .wait_for_finality(&WaitContext::new())
        .await
        .unwrap_err();

    match err {
        Error::EpochNotSynced {
            node,
            clock_slot,
            slot,
        } => {
            assert_eq!(node, 1);
            assert_eq!(slot, START_SLOT - 40);
            assert!(clock_slot > START_SLOT);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_unresponsive_node_exhausts_error_budget() {
    let network = network(3, Fork::Capella);
    for _ in 0..3 {
        network
            .get(2)
            .consensus
            .push_finality(Err(ClientError::request("connection refused")));
    }

    let start = Instant::now();
    let err = monitor(&network)
        .wait_for_finality(&WaitContext::new())
        .await
        .unwrap_err();

    match err {
        Error::NodeUnresponsive { node, errors, last } => {
            assert_eq!(node, 2);
            assert_eq!(errors, 3);
            assert!(last.contains("failed to poll finality checkpoint"));
            assert!(last.contains("connection refused"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ticks_since(start), 3);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_successful_tick_resets_error_budget() {
    let network = network(3, Fork::Capella);
    network.set_finality_everywhere(finalized(8, 1));

    let flaky = network.get(1);
    let refused = || Err(ClientError::request("connection refused"));
    flaky.consensus.push_finality(refused());
    flaky.consensus.push_finality(refused());
    flaky.consensus.push_finality(Ok(not_finalized()));
    flaky.consensus.push_finality(refused());
    flaky.consensus.push_finality(refused());
    flaky.consensus.push_finality(Ok(finalized(8, 1)));

    let start = Instant::now();
    let checkpoint = monitor(&network)
        .wait_for_finality(&WaitContext::new())
        .await
        .unwrap();

    assert_eq!(checkpoint.epoch, 8);
    assert_eq!(ticks_since(start), 6);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_zero_error_budget_fails_on_first_error() {
    let network = network(2, Fork::Capella);
    network
        .get(0)
        .consensus
        .push_head(Err(ClientError::Unavailable("syncing".to_string())));

    let err = monitor_with(&network, ChainSpec::default(), 0)
        .wait_for_finality(&WaitContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NodeUnresponsive { node: 0, errors: 1, .. }));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_stopped_nodes_are_not_polled() {
    let network = network(3, Fork::Capella);
    network.set_finality_everywhere(finalized(4, 7));
    let stopped = network.get(2);
    stopped.consensus.set_finality(not_finalized());
    stopped.stop();

    let checkpoint = monitor(&network)
        .wait_for_finality(&WaitContext::new())
        .await
        .unwrap();

    assert_eq!(checkpoint, Checkpoint::new(4, root(7)));
    assert_eq!(stopped.consensus.finality_calls(), 0);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_finality_deadline() {
    let network = network(2, Fork::Capella);
    let monitor = monitor(&network);
    let ctx = monitor.spec_clock().slot_deadline(&WaitContext::new(), 3);

    let start = Instant::now();
    let err = monitor.wait_for_finality(&ctx).await.unwrap_err();

    assert!(matches!(err, Error::DeadlineExceeded));
    assert!(start.elapsed() >= slots(5));
    assert!(start.elapsed() < slots(6));
}

fn finalized_block(exec: Option<u8>) -> VersionedBlock {
    VersionedBlock {
        execution_hash: exec.map(execution_hash),
        ..block(Fork::Bellatrix, START_SLOT - 64, 0x55)
    }
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_execution_finality() {
    let network = network(2, Fork::Bellatrix);
    network.set_finality_everywhere(finalized(7, 0x55));
    for node in network.nodes() {
        node.consensus.insert_block(finalized_block(None));
    }

    let monitor = monitor(&network);
    let ctx = WaitContext::new();
    let wait = monitor.wait_for_execution_finality(&ctx);
    tokio::pin!(wait);

    // Nothing converges while the finalized block predates the merge.
    tokio::select! {
        _ = &mut wait => panic!("converged without an execution payload"),
        () = tokio::time::sleep(slots(3)) => {}
    }

    for node in network.nodes() {
        node.consensus.insert_block(finalized_block(Some(0xee)));
    }
    let checkpoint = wait.await.unwrap();
    assert_eq!(checkpoint, Checkpoint::new(7, root(0x55)));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_execution_finality_missing_block_counts_as_error() {
    let network = network(2, Fork::Bellatrix);
    network.set_finality_everywhere(finalized(7, 0x55));
    network
        .get(0)
        .consensus
        .insert_block(finalized_block(Some(0xee)));

    let err = monitor(&network)
        .wait_for_execution_finality(&WaitContext::new())
        .await
        .unwrap_err();

    match err {
        Error::NodeUnresponsive { node, last, .. } => {
            assert_eq!(node, 1);
            assert!(last.contains("failed to retrieve block"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_current_epoch_finalization() {
    // The wall clock is at slot 300, epoch 9.
    let network = network(2, Fork::Deneb);
    network.set_finality_everywhere(finalized(8, 8));
    for node in network.nodes() {
        node.consensus.push_finality(Ok(finalized(8, 8)));
        node.consensus.push_finality(Ok(finalized(8, 8)));
        node.consensus.push_finality(Ok(finalized(9, 9)));
    }

    let start = Instant::now();
    let checkpoint = monitor(&network)
        .wait_for_current_epoch_finalization(&WaitContext::new())
        .await
        .unwrap();

    assert_eq!(checkpoint, Checkpoint::new(9, root(9)));
    assert_eq!(ticks_since(start), 3);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_status_lines_carry_health() {
    let network = network(2, Fork::Capella);
    network.set_finality_everywhere(finalized(8, 3));
    network.get(0).consensus.set_head_state(BeaconState {
        fork: Fork::Capella,
        slot: START_SLOT,
        current_epoch_participation: Some(vec![7, 7, 7, 0]),
        validators: vec![],
    });
    network
        .get(1)
        .consensus
        .fail_states(ClientError::Unavailable("state pruned".to_string()));

    let checkpoint = monitor(&network)
        .wait_for_finality(&WaitContext::new())
        .await
        .unwrap();

    // A node whose health cannot be computed still counts towards finality.
    assert_eq!(checkpoint, Checkpoint::new(8, root(3)));
    assert!(logs_contain("node 0:"));
    assert!(logs_contain("health=0.75"));
    assert!(logs_contain("health=0.00"));
}
