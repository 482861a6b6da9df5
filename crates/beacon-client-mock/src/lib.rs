//! Scriptable in-memory beacon and execution clients for testing purposes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod script;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use num_bigint::BigUint;
use parking_lot::Mutex;
use proven_beacon_client::{
    BeaconState, BlockId, BlockNumber, Checkpoint, ConsensusClient, Error, ExecutionClient,
    ExecutionHash, FinalityCheckpoints, Fork, Gwei, Node, NodeProvider, Result, Root, Slot,
    StateId, ValidatorBalance, ValidatorIndex, VersionedBlock,
};
use script::Script;

#[derive(Debug, Default)]
struct ConsensusState {
    head: Script<VersionedBlock>,
    finality: Script<FinalityCheckpoints>,
    blocks: HashMap<Root, VersionedBlock>,
    states: HashMap<Slot, BeaconState>,
    head_state: Option<BeaconState>,
    balances: HashMap<Slot, Vec<Gwei>>,
    state_error: Option<Error>,
}

/// Mock beacon node.
///
/// Head and finality answers are scripted: queued responses are served one
/// per call, after which the last successful answer keeps being returned.
/// Clones share state, so a test keeps a handle while the monitor queries.
#[derive(Clone, Debug, Default)]
pub struct MockConsensusClient {
    state: Arc<Mutex<ConsensusState>>,
}

impl MockConsensusClient {
    /// Create a mock with no data; every query fails with `NotFound`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the head block returned once the queue is drained.
    pub fn set_head(&self, block: VersionedBlock) {
        self.state.lock().head.set(block);
    }

    /// Queue a head block response.
    pub fn push_head(&self, response: Result<VersionedBlock>) {
        self.state.lock().head.push(response);
    }

    /// Set the finality checkpoints returned once the queue is drained.
    pub fn set_finality(&self, checkpoints: FinalityCheckpoints) {
        self.state.lock().finality.set(checkpoints);
    }

    /// Queue a finality checkpoints response.
    pub fn push_finality(&self, response: Result<FinalityCheckpoints>) {
        self.state.lock().finality.push(response);
    }

    /// Make a block available for lookup by root.
    pub fn insert_block(&self, block: VersionedBlock) {
        self.state.lock().blocks.insert(block.root, block);
    }

    /// Set the state served for `StateId::Slot(slot)`.
    pub fn set_state(&self, slot: Slot, state: BeaconState) {
        self.state.lock().states.insert(slot, state);
    }

    /// Set the state served for `StateId::Head` and for slots without an
    /// explicit state.
    pub fn set_head_state(&self, state: BeaconState) {
        self.state.lock().head_state = Some(state);
    }

    /// Make every state query fail with `error`.
    pub fn fail_states(&self, error: Error) {
        self.state.lock().state_error = Some(error);
    }

    /// Set the balances, indexed by validator index, at `slot`.
    pub fn set_balances(&self, slot: Slot, balances: Vec<Gwei>) {
        self.state.lock().balances.insert(slot, balances);
    }

    /// Number of head block queries served so far.
    #[must_use]
    pub fn head_calls(&self) -> usize {
        self.state.lock().head.calls()
    }

    /// Number of finality checkpoint queries served so far.
    #[must_use]
    pub fn finality_calls(&self) -> usize {
        self.state.lock().finality.calls()
    }
}

#[async_trait]
impl ConsensusClient for MockConsensusClient {
    async fn head_block(&self, block: BlockId) -> Result<VersionedBlock> {
        let mut state = self.state.lock();
        match block {
            BlockId::Head => state.head.next("head block"),
            BlockId::Root(root) => state
                .blocks
                .get(&root)
                .copied()
                .ok_or_else(|| Error::not_found(format!("block {root}"))),
            other => Err(Error::not_found(format!("block {other}"))),
        }
    }

    async fn finality_checkpoints(&self, _state: StateId) -> Result<FinalityCheckpoints> {
        self.state.lock().finality.next("finality checkpoints")
    }

    async fn state(&self, id: StateId) -> Result<BeaconState> {
        let state = self.state.lock();
        if let Some(error) = &state.state_error {
            return Err(error.clone());
        }
        let found = match id {
            StateId::Slot(slot) => state.states.get(&slot).or(state.head_state.as_ref()),
            StateId::Head | StateId::Finalized => state.head_state.as_ref(),
        };
        found
            .cloned()
            .ok_or_else(|| Error::not_found(format!("state {id}")))
    }

    async fn validator_balances(
        &self,
        id: StateId,
        ids: &[ValidatorIndex],
    ) -> Result<Vec<ValidatorBalance>> {
        let StateId::Slot(slot) = id else {
            return Err(Error::not_found(format!("balances at {id}")));
        };
        let state = self.state.lock();
        let balances = state
            .balances
            .get(&slot)
            .ok_or_else(|| Error::not_found(format!("balances at {id}")))?;
        ids.iter()
            .map(|&index| {
                usize::try_from(index)
                    .ok()
                    .and_then(|i| balances.get(i))
                    .map(|&balance| ValidatorBalance { index, balance })
                    .ok_or_else(|| Error::not_found(format!("validator {index}")))
            })
            .collect()
    }
}

/// Mock execution node.
#[derive(Clone, Debug, Default)]
pub struct MockExecutionClient {
    total_difficulty: Arc<Mutex<Script<BigUint>>>,
}

impl MockExecutionClient {
    /// Create a mock whose total difficulty is unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total difficulty returned once the queue is drained.
    pub fn set_total_difficulty(&self, td: impl Into<BigUint>) {
        self.total_difficulty.lock().set(td.into());
    }

    /// Queue a total difficulty response.
    pub fn push_total_difficulty(&self, response: Result<BigUint>) {
        self.total_difficulty.lock().push(response);
    }

    /// Number of total difficulty queries served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.total_difficulty.lock().calls()
    }
}

#[async_trait]
impl ExecutionClient for MockExecutionClient {
    async fn total_difficulty(&self, _block: BlockNumber) -> Result<BigUint> {
        self.total_difficulty.lock().next("total difficulty")
    }
}

/// Handles to the mocks behind one node of a [`MockNetwork`].
#[derive(Clone, Debug)]
pub struct MockNode {
    /// The beacon node.
    pub consensus: MockConsensusClient,

    /// The execution node.
    pub execution: MockExecutionClient,

    running: Arc<AtomicBool>,
    node: Node,
}

impl MockNode {
    /// Stop the node: it disappears from `running_nodes`.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Start the node again.
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }
}

/// A set of mock nodes implementing [`NodeProvider`].
#[derive(Clone, Debug, Default)]
pub struct MockNetwork {
    nodes: Vec<MockNode>,
}

impl MockNetwork {
    /// Create a network of `count` running nodes with empty mocks.
    #[must_use]
    pub fn new(count: usize) -> Self {
        let mut network = Self::default();
        for _ in 0..count {
            network.add_node();
        }
        network
    }

    /// Add a running node and return its handles.
    pub fn add_node(&mut self) -> MockNode {
        let index = self.nodes.len();
        let consensus = MockConsensusClient::new();
        let execution = MockExecutionClient::new();
        let node = Node::new(index, format!("mock-{index}"), Arc::new(consensus.clone()))
            .with_execution(Arc::new(execution.clone()));
        let handle = MockNode {
            consensus,
            execution,
            running: Arc::new(AtomicBool::new(true)),
            node,
        };
        self.nodes.push(handle.clone());
        handle
    }

    /// Handles of the node at `index`.
    ///
    /// # Panics
    ///
    /// Panics if there is no node at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> &MockNode {
        &self.nodes[index]
    }

    /// Handles of every node, running or not.
    #[must_use]
    pub fn nodes(&self) -> &[MockNode] {
        &self.nodes
    }

    /// Set the same head block on every node.
    pub fn set_head_everywhere(&self, block: VersionedBlock) {
        for node in &self.nodes {
            node.consensus.set_head(block);
        }
    }

    /// Set the same finality checkpoints on every node.
    pub fn set_finality_everywhere(&self, checkpoints: FinalityCheckpoints) {
        for node in &self.nodes {
            node.consensus.set_finality(checkpoints);
        }
    }
}

impl NodeProvider for MockNetwork {
    fn running_nodes(&self) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|n| n.running.load(Ordering::SeqCst))
            .map(|n| n.node.clone())
            .collect()
    }
}

/// Build a root whose bytes are all `byte`.
#[must_use]
pub const fn root(byte: u8) -> Root {
    Root([byte; 32])
}

/// Build an execution hash whose bytes are all `byte`.
#[must_use]
pub const fn execution_hash(byte: u8) -> ExecutionHash {
    ExecutionHash([byte; 32])
}

/// Build a head block summary without an execution payload.
#[must_use]
pub const fn block(fork: Fork, slot: Slot, root_byte: u8) -> VersionedBlock {
    VersionedBlock {
        fork,
        slot,
        root: root(root_byte),
        execution_hash: None,
    }
}

/// Build finality checkpoints with only a finalized checkpoint.
#[must_use]
pub const fn finalized(epoch: u64, root_byte: u8) -> FinalityCheckpoints {
    FinalityCheckpoints {
        current_justified: Some(Checkpoint::new(epoch + 1, root(root_byte))),
        finalized: Some(Checkpoint::new(epoch, root(root_byte))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_consensus_client() {
        let client = MockConsensusClient::new();
        assert!(client.head_block(BlockId::Head).await.is_err());

        client.set_head(block(Fork::Capella, 10, 1));
        client.push_head(Err(Error::request("connection refused")));
        client.push_head(Ok(block(Fork::Capella, 11, 2)));

        assert!(client.head_block(BlockId::Head).await.is_err());
        assert_eq!(client.head_block(BlockId::Head).await.unwrap().slot, 11);
        assert_eq!(client.head_block(BlockId::Head).await.unwrap().slot, 11);
        assert_eq!(client.head_calls(), 4);
    }

    #[tokio::test]
    async fn test_mock_balances_by_index() {
        let client = MockConsensusClient::new();
        client.set_balances(32, vec![10, 20, 30]);

        let balances = client
            .validator_balances(StateId::Slot(32), &[0, 2])
            .await
            .unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[1].balance, 30);

        assert!(
            client
                .validator_balances(StateId::Slot(32), &[7])
                .await
                .is_err()
        );
        assert!(
            client
                .validator_balances(StateId::Slot(64), &[0])
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_mock_network_running_nodes() {
        let network = MockNetwork::new(3);
        assert_eq!(network.running_nodes().len(), 3);

        network.get(1).stop();
        let running = network.running_nodes();
        assert_eq!(running.len(), 2);
        assert_eq!(running[1].index(), 2);

        network.get(1).start();
        assert_eq!(network.running_nodes().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_execution_client() {
        let client = MockExecutionClient::new();
        client.set_total_difficulty(100u32);
        client.push_total_difficulty(Err(Error::request("timeout")));

        assert!(client.total_difficulty(BlockNumber::Latest).await.is_err());
        assert_eq!(
            client.total_difficulty(BlockNumber::Latest).await.unwrap(),
            BigUint::from(100u32)
        );
    }
}
