//! Per-conversation memory graph store
//!
//! Arena-and-index representation: nodes live in an id-keyed map, edges in a
//! canonical-key map with an adjacency index. No embedded ownership between
//! nodes, so similarity cycles are harmless.
//!
//! One `MemoryGraph` belongs to exactly one conversation; callers serialize
//! mutations per conversation (see the orchestrator in `reverie-engine`).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::edge::{EdgeKey, MemoryEdge, RelationKind};
use crate::embedding::cosine_similarity;
use crate::error::{MemoryError, Result};
use crate::node::{EdgeTouch, MemoryId, MemoryNode, MemoryUpdate, NodeStatus};

/// Graph store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Minimum cosine similarity for a similarity edge
    pub similarity_floor: f32,
    /// Similarity at or above which content reinforces an existing node
    /// instead of creating a duplicate
    pub duplicate_ceiling: f32,
    /// Maximum queryable nodes per conversation
    pub max_nodes: usize,
    /// Relevance scans collect at most `limit * candidate_factor` candidates
    pub candidate_factor: usize,
    /// Weight of semantic similarity in relevance ranking
    pub similarity_weight: f32,
    /// Weight of effective importance in relevance ranking
    pub importance_weight: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            similarity_floor: 0.55,
            duplicate_ceiling: 0.995,
            max_nodes: 4096,
            candidate_factor: 3,
            similarity_weight: 0.65,
            importance_weight: 0.35,
        }
    }
}

/// One conversation's memory graph
#[derive(Debug, Clone)]
pub struct MemoryGraph {
    config: GraphConfig,
    /// Embedding dimensionality, fixed by the first integration
    pub(crate) dims: Option<usize>,
    pub(crate) nodes: HashMap<MemoryId, MemoryNode>,
    pub(crate) edges: HashMap<EdgeKey, MemoryEdge>,
    pub(crate) adjacency: HashMap<MemoryId, HashSet<MemoryId>>,
    /// Creation order, oldest first. Pruned ids stay in place and are
    /// skipped on read; the sweep cursor indexes into this.
    pub(crate) insertion_order: Vec<MemoryId>,
    pub(crate) sweep_cursor: usize,
}

impl MemoryGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            dims: None,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            adjacency: HashMap::new(),
            insertion_order: Vec::new(),
            sweep_cursor: 0,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Number of queryable (non-pruned) nodes
    pub fn len(&self) -> usize {
        self.nodes.values().filter(|n| n.is_queryable()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a node by id, if queryable
    pub fn get(&self, id: MemoryId) -> Option<&MemoryNode> {
        self.nodes.get(&id).filter(|n| n.is_queryable())
    }

    /// Queryable neighbors of a node, with the connecting edges
    pub fn neighbors(&self, id: MemoryId) -> Vec<(&MemoryNode, &MemoryEdge)> {
        let Some(adjacent) = self.adjacency.get(&id) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for &other in adjacent {
            let Some(node) = self.get(other) else { continue };
            for kind in [
                RelationKind::Similarity,
                RelationKind::TemporalSequence,
                RelationKind::CausalReference,
            ] {
                for key in [EdgeKey::new(id, other, kind), EdgeKey::new(other, id, kind)]
                    .into_iter()
                    .flatten()
                {
                    if let Some(edge) = self.edges.get(&key) {
                        out.push((node, edge));
                        break;
                    }
                }
            }
        }
        out
    }

    /// Integrate scored content into the graph.
    ///
    /// Content that is effectively identical to an existing node (similarity
    /// at or above the duplicate ceiling) reinforces that node instead of
    /// creating a new one. Otherwise a new active node is created and linked
    /// by similarity to every queryable node above the similarity floor,
    /// plus a temporal-sequence edge from the previously newest node.
    pub fn integrate(
        &mut self,
        content: &str,
        embedding: Vec<f32>,
        salience: f32,
        source_message_id: &str,
    ) -> Result<MemoryUpdate> {
        if content.trim().is_empty() {
            return Err(MemoryError::invalid_content("content must not be empty"));
        }
        if let Some(dims) = self.dims {
            if embedding.len() != dims {
                return Err(MemoryError::DimensionMismatch {
                    expected: dims,
                    actual: embedding.len(),
                });
            }
        }

        let now = Utc::now();
        let salience = salience.clamp(0.0, 1.0);

        // Similarity against all queryable nodes, tracking the best match
        let mut similar: Vec<(MemoryId, f32)> = Vec::new();
        let mut best: Option<(MemoryId, f32)> = None;
        for node in self.nodes.values().filter(|n| n.is_queryable()) {
            let sim = cosine_similarity(&embedding, &node.embedding);
            if sim >= self.config.similarity_floor {
                similar.push((node.id, sim));
            }
            if best.map_or(true, |(_, s)| sim > s) {
                best = Some((node.id, sim));
            }
        }

        // Duplicate policy: treat as an access, not a new memory
        if let Some((dup_id, sim)) = best {
            if sim >= self.config.duplicate_ceiling {
                let node = self
                    .nodes
                    .get_mut(&dup_id)
                    .ok_or_else(|| MemoryError::not_found(dup_id.to_string()))?;
                node.record_access(now);
                node.base_salience = node.base_salience.max(salience);
                node.effective_importance = node.effective_importance.max(salience);
                node.provenance.insert(source_message_id.to_string());
                log::debug!("integrate reinforced existing node {dup_id} (sim {sim:.3})");

                return Ok(MemoryUpdate {
                    node_id: dup_id,
                    created: false,
                    salience,
                    edges_touched: Vec::new(),
                });
            }
        }

        if self.len() >= self.config.max_nodes {
            return Err(MemoryError::capacity(format!(
                "conversation graph full at {} nodes",
                self.config.max_nodes
            )));
        }

        let previous_newest = self.newest_queryable_id();

        let node = MemoryNode::new(content, embedding, salience, source_message_id, now);
        let node_id = node.id;
        self.dims.get_or_insert(node.embedding.len());
        self.nodes.insert(node_id, node);
        self.insertion_order.push(node_id);

        let mut edges_touched = Vec::new();
        for (other, sim) in similar {
            let key = EdgeKey::new(node_id, other, RelationKind::Similarity)?;
            edges_touched.push(self.upsert_edge(key, sim));
        }
        if let Some(prev) = previous_newest {
            let key = EdgeKey::new(prev, node_id, RelationKind::TemporalSequence)?;
            edges_touched.push(self.upsert_edge(key, 1.0));
        }

        Ok(MemoryUpdate {
            node_id,
            created: true,
            salience,
            edges_touched,
        })
    }

    /// Record an explicit causal reference between two nodes
    pub fn link_causal(&mut self, source: MemoryId, target: MemoryId, weight: f32) -> Result<()> {
        if self.get(source).is_none() {
            return Err(MemoryError::not_found(source.to_string()));
        }
        if self.get(target).is_none() {
            return Err(MemoryError::not_found(target.to_string()));
        }
        let key = EdgeKey::new(source, target, RelationKind::CausalReference)?;
        self.upsert_edge(key, weight);
        Ok(())
    }

    /// Rank queryable nodes by similarity and effective importance.
    ///
    /// Ties break toward the more recently accessed node. The scan walks
    /// newest-first and short-circuits once `limit * candidate_factor`
    /// strong candidates (similarity at or above the similarity floor) are
    /// collected; weak nodes are still ranked but never stop the scan, so
    /// an old exact match is found even behind a run of unrelated recent
    /// nodes. Returned nodes are recorded as accessed: a relevance read is
    /// itself evidence of renewed importance.
    pub fn find_relevant(&mut self, query_embedding: &[f32], limit: usize) -> Vec<MemoryNode> {
        if limit == 0 {
            return Vec::new();
        }
        let candidate_cap = limit.saturating_mul(self.config.candidate_factor.max(1));

        let mut candidates: Vec<(MemoryId, f32, DateTime<Utc>)> = Vec::new();
        let mut strong = 0usize;
        for &id in self.insertion_order.iter().rev() {
            let Some(node) = self.nodes.get(&id).filter(|n| n.is_queryable()) else {
                continue;
            };
            let sim = cosine_similarity(query_embedding, &node.embedding);
            let relevance = self.config.similarity_weight * sim
                + self.config.importance_weight * node.effective_importance;
            candidates.push((id, relevance, node.last_accessed));
            if sim >= self.config.similarity_floor {
                strong += 1;
                if strong >= candidate_cap {
                    break;
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.2.cmp(&a.2))
        });
        candidates.truncate(limit);

        let now = Utc::now();
        let mut results = Vec::with_capacity(candidates.len());
        for (id, _, _) in candidates {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.record_access(now);
                results.push(node.clone());
            }
        }
        results
    }

    /// Most recently created queryable nodes, newest first.
    ///
    /// A cheap recency lookup: unlike `find_relevant` this does not count as
    /// reinforcement and leaves access state untouched.
    pub fn recent_exchanges(&self, limit: usize) -> Vec<MemoryNode> {
        self.insertion_order
            .iter()
            .rev()
            .filter_map(|id| self.nodes.get(id))
            .filter(|n| n.is_queryable())
            .take(limit)
            .cloned()
            .collect()
    }

    /// Mark a node pruned and drop its edges. Provenance stays on the node
    /// record for bookkeeping; queries will never see it again.
    pub(crate) fn mark_pruned(&mut self, id: MemoryId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.status = NodeStatus::Pruned;
        }
        self.drop_edges_of(id);
    }

    pub(crate) fn drop_edges_of(&mut self, id: MemoryId) {
        if let Some(adjacent) = self.adjacency.remove(&id) {
            for other in adjacent {
                if let Some(set) = self.adjacency.get_mut(&other) {
                    set.remove(&id);
                }
            }
        }
        self.edges
            .retain(|key, _| key.source != id && key.target != id);
    }

    pub(crate) fn upsert_edge(&mut self, key: EdgeKey, weight: f32) -> EdgeTouch {
        let edge = self
            .edges
            .entry(key)
            .and_modify(|e| e.strengthen(weight))
            .or_insert_with(|| MemoryEdge::new(key, weight));
        let touch = EdgeTouch {
            source: edge.source,
            target: edge.target,
            kind: edge.kind,
            weight: edge.weight,
        };
        self.adjacency.entry(key.source).or_default().insert(key.target);
        self.adjacency.entry(key.target).or_default().insert(key.source);
        touch
    }

    fn newest_queryable_id(&self) -> Option<MemoryId> {
        self.insertion_order
            .iter()
            .rev()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.is_queryable()))
            .copied()
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dim: usize, at: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; dim];
        v[at] = 1.0;
        v
    }

    #[test]
    fn test_integrate_creates_node() {
        let mut graph = MemoryGraph::default();
        let update = graph
            .integrate("book flights to tokyo", unit(8, 0), 0.8, "msg-1")
            .unwrap();

        assert!(update.created);
        assert_eq!(graph.len(), 1);
        let node = graph.get(update.node_id).unwrap();
        assert_eq!(node.access_count, 1);
        assert!(node.provenance.contains("msg-1"));
    }

    #[test]
    fn test_empty_content_rejected_before_mutation() {
        let mut graph = MemoryGraph::default();
        let result = graph.integrate("", unit(8, 0), 0.5, "msg-1");
        assert!(matches!(result, Err(MemoryError::InvalidContent(_))));
        assert_eq!(graph.len(), 0);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut graph = MemoryGraph::default();
        graph.integrate("first", unit(8, 0), 0.5, "m1").unwrap();
        let result = graph.integrate("second", unit(4, 0), 0.5, "m2");
        assert!(matches!(
            result,
            Err(MemoryError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_duplicate_reinforces_instead_of_creating() {
        let mut graph = MemoryGraph::default();
        let first = graph
            .integrate("same thing", unit(8, 0), 0.5, "m1")
            .unwrap();
        let second = graph
            .integrate("same thing", unit(8, 0), 0.7, "m2")
            .unwrap();

        assert!(!second.created);
        assert_eq!(second.node_id, first.node_id);
        assert_eq!(graph.len(), 1);

        let node = graph.get(first.node_id).unwrap();
        assert_eq!(node.access_count, 2);
        // Reinforcement lifts salience to the stronger evidence
        assert_eq!(node.base_salience, 0.7);
        assert!(node.provenance.contains("m1"));
        assert!(node.provenance.contains("m2"));
    }

    #[test]
    fn test_similarity_edges_created_above_floor() {
        let mut graph = MemoryGraph::default();
        let a = graph.integrate("alpha", unit(4, 0), 0.5, "m1").unwrap();

        // Close to a (cos = ~0.93), far from orthogonal
        let mut close = unit(4, 0);
        close[1] = 0.37;
        let norm: f32 = close.iter().map(|x| x * x).sum::<f32>().sqrt();
        close.iter_mut().for_each(|x| *x /= norm);

        let b = graph.integrate("beta", close, 0.5, "m2").unwrap();
        let touched: Vec<_> = b
            .edges_touched
            .iter()
            .filter(|t| t.kind == RelationKind::Similarity)
            .collect();
        assert_eq!(touched.len(), 1);
        assert!(touched[0].weight > 0.9);

        let neighbors = graph.neighbors(a.node_id);
        assert!(neighbors.iter().any(|(n, _)| n.id == b.node_id));
    }

    #[test]
    fn test_temporal_edge_links_sequence() {
        let mut graph = MemoryGraph::default();
        let a = graph.integrate("first", unit(4, 0), 0.5, "m1").unwrap();
        let b = graph.integrate("second", unit(4, 1), 0.5, "m2").unwrap();

        let temporal: Vec<_> = b
            .edges_touched
            .iter()
            .filter(|t| t.kind == RelationKind::TemporalSequence)
            .collect();
        assert_eq!(temporal.len(), 1);
        assert_eq!(temporal[0].source, a.node_id);
        assert_eq!(temporal[0].target, b.node_id);
    }

    #[test]
    fn test_find_relevant_returns_just_created_first() {
        let mut graph = MemoryGraph::default();
        graph.integrate("grocery list", unit(8, 1), 0.4, "m1").unwrap();
        let update = graph
            .integrate("flights to tokyo", unit(8, 0), 0.8, "m2")
            .unwrap();

        let results = graph.find_relevant(&unit(8, 0), 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, update.node_id);
    }

    #[test]
    fn test_find_relevant_reaches_past_newer_weak_nodes() {
        let mut graph = MemoryGraph::default();
        let target = graph
            .integrate("flights to tokyo", unit(16, 0), 0.8, "m0")
            .unwrap();

        // Bury the match under more unrelated nodes than the candidate cap
        for i in 0..10 {
            graph
                .integrate(&format!("unrelated {i}"), unit(16, i + 1), 0.5, &format!("m{}", i + 1))
                .unwrap();
        }

        let results = graph.find_relevant(&unit(16, 0), 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, target.node_id);
    }

    #[test]
    fn test_find_relevant_records_access() {
        let mut graph = MemoryGraph::default();
        let update = graph.integrate("thing", unit(8, 0), 0.5, "m1").unwrap();

        graph.find_relevant(&unit(8, 0), 1);
        let node = graph.get(update.node_id).unwrap();
        assert_eq!(node.access_count, 2);
    }

    #[test]
    fn test_recent_exchanges_no_side_effect() {
        let mut graph = MemoryGraph::default();
        let a = graph.integrate("first", unit(8, 0), 0.5, "m1").unwrap();
        let b = graph.integrate("second", unit(8, 1), 0.5, "m2").unwrap();

        let recent = graph.recent_exchanges(2);
        assert_eq!(recent[0].id, b.node_id);
        assert_eq!(recent[1].id, a.node_id);

        // No reinforcement from the recency lookup
        assert_eq!(graph.get(a.node_id).unwrap().access_count, 1);
        assert_eq!(graph.get(b.node_id).unwrap().access_count, 1);
    }

    #[test]
    fn test_pruned_never_returned() {
        let mut graph = MemoryGraph::default();
        let a = graph.integrate("first", unit(8, 0), 0.5, "m1").unwrap();
        graph.integrate("second", unit(8, 1), 0.5, "m2").unwrap();

        graph.mark_pruned(a.node_id);
        assert!(graph.get(a.node_id).is_none());
        assert_eq!(graph.len(), 1);
        assert!(graph
            .find_relevant(&unit(8, 0), 10)
            .iter()
            .all(|n| n.id != a.node_id));
        assert!(graph
            .recent_exchanges(10)
            .iter()
            .all(|n| n.id != a.node_id));
    }

    #[test]
    fn test_capacity_exceeded() {
        let config = GraphConfig {
            max_nodes: 2,
            ..GraphConfig::default()
        };
        let mut graph = MemoryGraph::new(config);
        graph.integrate("one", unit(8, 0), 0.5, "m1").unwrap();
        graph.integrate("two", unit(8, 1), 0.5, "m2").unwrap();

        let result = graph.integrate("three", unit(8, 2), 0.5, "m3");
        assert!(matches!(result, Err(MemoryError::CapacityExceeded(_))));
    }

    #[test]
    fn test_link_causal() {
        let mut graph = MemoryGraph::default();
        let a = graph.integrate("cause", unit(8, 0), 0.5, "m1").unwrap();
        let b = graph.integrate("effect", unit(8, 1), 0.5, "m2").unwrap();

        graph.link_causal(b.node_id, a.node_id, 0.8).unwrap();
        let neighbors = graph.neighbors(b.node_id);
        assert!(neighbors
            .iter()
            .any(|(n, e)| n.id == a.node_id && e.kind == RelationKind::CausalReference));

        let missing = MemoryId::new();
        assert!(graph.link_causal(missing, a.node_id, 0.8).is_err());
    }

    #[test]
    fn test_find_relevant_limit_zero() {
        let mut graph = MemoryGraph::default();
        graph.integrate("thing", unit(8, 0), 0.5, "m1").unwrap();
        assert!(graph.find_relevant(&unit(8, 0), 0).is_empty());
    }
}
