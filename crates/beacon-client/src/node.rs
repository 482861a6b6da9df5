use std::fmt;
use std::sync::Arc;

use crate::{ConsensusClient, ExecutionClient};

/// A node of the network under test: a beacon node, optionally paired with
/// the execution node behind it.
///
/// The monitor borrows nodes for the duration of a wait; their lifecycle is
/// owned elsewhere.
#[derive(Clone)]
pub struct Node {
    index: usize,
    name: String,
    consensus: Arc<dyn ConsensusClient>,
    execution: Option<Arc<dyn ExecutionClient>>,
}

impl Node {
    /// Creates a node with only a consensus client.
    pub fn new(index: usize, name: impl Into<String>, consensus: Arc<dyn ConsensusClient>) -> Self {
        Self {
            index,
            name: name.into(),
            consensus,
            execution: None,
        }
    }

    /// Attaches the execution client.
    #[must_use]
    pub fn with_execution(mut self, execution: Arc<dyn ExecutionClient>) -> Self {
        self.execution = Some(execution);
        self
    }

    /// Index of the node in the testnet definition.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Human readable name, e.g. the client pair.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The beacon node query capability.
    #[must_use]
    pub fn consensus(&self) -> &dyn ConsensusClient {
        self.consensus.as_ref()
    }

    /// The execution node query capability, if any.
    #[must_use]
    pub fn execution(&self) -> Option<&dyn ExecutionClient> {
        self.execution.as_deref()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("execution", &self.execution.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} ({})", self.index, self.name)
    }
}

/// Supplies the set of nodes currently running.
///
/// The order must be stable across calls made during one wait.
pub trait NodeProvider: Send + Sync {
    /// Returns the running nodes, in node order.
    fn running_nodes(&self) -> Vec<Node>;
}

impl NodeProvider for Vec<Node> {
    fn running_nodes(&self) -> Vec<Node> {
        self.clone()
    }
}

impl<P: NodeProvider + ?Sized> NodeProvider for Arc<P> {
    fn running_nodes(&self) -> Vec<Node> {
        self.as_ref().running_nodes()
    }
}
