//! Opaque graph snapshots
//!
//! The core defines the snapshot schema so an external persistence backend
//! can store and reload conversations across restarts; the storage engine
//! itself lives outside this crate. Snapshots are versioned bincode blobs.

use serde::{Deserialize, Serialize};

use crate::edge::{EdgeKey, MemoryEdge};
use crate::error::{MemoryError, Result};
use crate::graph::{GraphConfig, MemoryGraph};
use crate::node::{MemoryId, MemoryNode};

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable record of one conversation's memory graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u32,
    pub nodes: Vec<MemoryNode>,
    pub edges: Vec<MemoryEdge>,
    pub insertion_order: Vec<MemoryId>,
    pub sweep_cursor: usize,
}

impl GraphSnapshot {
    /// Capture a graph's state
    pub fn from_graph(graph: &MemoryGraph) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            nodes: graph.nodes.values().cloned().collect(),
            edges: graph.edges.values().cloned().collect(),
            insertion_order: graph.insertion_order.clone(),
            sweep_cursor: graph.sweep_cursor,
        }
    }

    /// Rebuild a graph under the given runtime config. The adjacency index
    /// is derived from the edge list, never persisted.
    pub fn into_graph(self, config: GraphConfig) -> Result<MemoryGraph> {
        if self.version != SNAPSHOT_VERSION {
            return Err(MemoryError::other(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }

        let mut graph = MemoryGraph::new(config);
        for node in self.nodes {
            graph.dims.get_or_insert(node.embedding.len());
            graph.nodes.insert(node.id, node);
        }
        for edge in self.edges {
            let key = EdgeKey::new(edge.source, edge.target, edge.kind)?;
            graph.upsert_edge(key, edge.weight);
        }
        graph.insertion_order = self.insertion_order;
        graph.sweep_cursor = self.sweep_cursor;
        Ok(graph)
    }

    /// Serialize to an opaque byte blob
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from an opaque byte blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
