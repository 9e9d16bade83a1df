//! Weighted relations between memory nodes
//!
//! Similarity edges are undirected and stored under a canonical key;
//! temporal and causal edges keep their direction.

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, Result};
use crate::node::MemoryId;

/// Kind of relation between two memory nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Semantic similarity (undirected)
    Similarity,
    /// Source was created immediately before target
    TemporalSequence,
    /// Source content refers back to target
    CausalReference,
}

impl RelationKind {
    /// Whether edges of this kind are directed
    pub fn is_directed(&self) -> bool {
        !matches!(self, Self::Similarity)
    }
}

/// Canonical key identifying one edge in the adjacency map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: MemoryId,
    pub target: MemoryId,
    pub kind: RelationKind,
}

impl EdgeKey {
    /// Build a key, canonicalizing undirected kinds so (a,b) == (b,a).
    /// Self-loops are rejected.
    pub fn new(source: MemoryId, target: MemoryId, kind: RelationKind) -> Result<Self> {
        if source == target {
            return Err(MemoryError::other(format!(
                "self-loop edge rejected for node {source}"
            )));
        }
        let (source, target) = if kind.is_directed() || source <= target {
            (source, target)
        } else {
            (target, source)
        };
        Ok(Self {
            source,
            target,
            kind,
        })
    }
}

/// A weighted relation between two memory nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEdge {
    pub source: MemoryId,
    pub target: MemoryId,
    pub kind: RelationKind,
    /// Strongest evidence seen for this relation (0.0 to 1.0)
    pub weight: f32,
}

impl MemoryEdge {
    pub fn new(key: EdgeKey, weight: f32) -> Self {
        Self {
            source: key.source,
            target: key.target,
            kind: key.kind,
            weight: weight.clamp(0.0, 1.0),
        }
    }

    /// Update the weight with new evidence. Takes the max, never decreases.
    pub fn strengthen(&mut self, weight: f32) {
        self.weight = self.weight.max(weight.clamp(0.0, 1.0));
    }

    /// The node on the other end of this edge
    pub fn other(&self, id: MemoryId) -> Option<MemoryId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_key_canonical() {
        let a = MemoryId::new();
        let b = MemoryId::new();

        let k1 = EdgeKey::new(a, b, RelationKind::Similarity).unwrap();
        let k2 = EdgeKey::new(b, a, RelationKind::Similarity).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_directed_key_preserves_order() {
        let a = MemoryId::new();
        let b = MemoryId::new();

        let k1 = EdgeKey::new(a, b, RelationKind::TemporalSequence).unwrap();
        let k2 = EdgeKey::new(b, a, RelationKind::TemporalSequence).unwrap();
        assert_ne!(k1, k2);
        assert_eq!(k1.source, a);
        assert_eq!(k2.source, b);
    }

    #[test]
    fn test_self_loop_rejected() {
        let a = MemoryId::new();
        assert!(EdgeKey::new(a, a, RelationKind::Similarity).is_err());
        assert!(EdgeKey::new(a, a, RelationKind::CausalReference).is_err());
    }

    #[test]
    fn test_strengthen_takes_max() {
        let a = MemoryId::new();
        let b = MemoryId::new();
        let key = EdgeKey::new(a, b, RelationKind::Similarity).unwrap();
        let mut edge = MemoryEdge::new(key, 0.6);

        edge.strengthen(0.4);
        assert_eq!(edge.weight, 0.6);

        edge.strengthen(0.9);
        assert_eq!(edge.weight, 0.9);

        edge.strengthen(2.0);
        assert_eq!(edge.weight, 1.0);
    }

    #[test]
    fn test_other_endpoint() {
        let a = MemoryId::new();
        let b = MemoryId::new();
        let key = EdgeKey::new(a, b, RelationKind::Similarity).unwrap();
        let edge = MemoryEdge::new(key, 0.5);

        assert_eq!(edge.other(edge.source), Some(edge.target));
        assert_eq!(edge.other(edge.target), Some(edge.source));
        assert_eq!(edge.other(MemoryId::new()), None);
    }
}
