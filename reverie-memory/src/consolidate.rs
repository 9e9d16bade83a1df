//! Consolidation of near-duplicate memories
//!
//! Scans a conversation's active nodes for clusters of strongly related
//! content and replaces each cluster with a single consolidated summary
//! node. Summary text generation is delegated to an injected `Summarizer`;
//! this engine only decides what to merge and keeps provenance intact.
//!
//! Constituents stay in the graph until ordinary decay removes them; the
//! decay engine protects the last surviving constituent of an important
//! summary as its provenance anchor.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::edge::RelationKind;
use crate::embedding::cosine_similarity;
use crate::graph::MemoryGraph;
use crate::node::{MemoryId, MemoryNode, NodeStatus};

/// Consolidation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Pairwise similarity at or above which nodes join a cluster
    pub merge_threshold: f32,
    /// Minimum cluster size worth merging
    pub min_cluster: usize,
    /// Maximum clusters merged per invocation (bounded work per call)
    pub max_clusters_per_run: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 0.88,
            min_cluster: 3,
            max_clusters_per_run: 4,
        }
    }
}

/// External capability that produces summary text for merged content
pub trait Summarizer: Send + Sync {
    fn summarize(&self, contents: &[&str]) -> String;
}

/// Placeholder summarizer: joins constituent content. Real deployments
/// inject a language-model-backed implementation.
#[derive(Debug, Clone, Default)]
pub struct JoinSummarizer;

impl Summarizer for JoinSummarizer {
    fn summarize(&self, contents: &[&str]) -> String {
        contents.join(" / ")
    }
}

/// Report from one consolidation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub clusters_merged: usize,
    pub nodes_merged: usize,
    /// Clusters found but left for a later run (work bound reached)
    pub deferred: usize,
}

/// Merges clusters of near-duplicate nodes into summary nodes
#[derive(Debug, Clone, Default)]
pub struct ConsolidationEngine {
    config: ConsolidationConfig,
}

impl ConsolidationEngine {
    pub fn new(config: ConsolidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    /// Run one bounded consolidation pass over a single conversation's graph
    pub fn consolidate(
        &self,
        graph: &mut MemoryGraph,
        summarizer: &dyn Summarizer,
    ) -> ConsolidationReport {
        let mut report = ConsolidationReport::default();
        let clusters = self.find_clusters(graph);

        for cluster in clusters {
            if report.clusters_merged >= self.config.max_clusters_per_run {
                report.deferred += 1;
                continue;
            }
            report.nodes_merged += cluster.len();
            self.merge_cluster(graph, &cluster, summarizer);
            report.clusters_merged += 1;
        }

        if report.clusters_merged > 0 {
            log::debug!(
                "consolidation merged {} clusters ({} nodes)",
                report.clusters_merged,
                report.nodes_merged
            );
        }
        report
    }

    /// Greedy single-link clustering over active nodes. Each node seeds at
    /// most one cluster; members are not revisited.
    fn find_clusters(&self, graph: &MemoryGraph) -> Vec<Vec<MemoryId>> {
        let active: Vec<&MemoryNode> = graph
            .insertion_order
            .iter()
            .filter_map(|id| graph.nodes.get(id))
            .filter(|n| n.status == NodeStatus::Active)
            .collect();

        let mut taken: HashSet<MemoryId> = HashSet::new();
        let mut clusters = Vec::new();

        for seed in &active {
            if taken.contains(&seed.id) {
                continue;
            }
            let mut cluster = vec![seed.id];
            for other in &active {
                if other.id == seed.id || taken.contains(&other.id) {
                    continue;
                }
                let sim = cosine_similarity(&seed.embedding, &other.embedding);
                if sim >= self.config.merge_threshold {
                    cluster.push(other.id);
                }
            }
            if cluster.len() >= self.config.min_cluster {
                taken.extend(cluster.iter().copied());
                clusters.push(cluster);
            }
        }
        clusters
    }

    fn merge_cluster(
        &self,
        graph: &mut MemoryGraph,
        cluster: &[MemoryId],
        summarizer: &dyn Summarizer,
    ) {
        let members: Vec<MemoryNode> = cluster
            .iter()
            .filter_map(|id| graph.nodes.get(id).cloned())
            .collect();
        if members.is_empty() {
            return;
        }

        let contents: Vec<&str> = members.iter().map(|m| m.content.as_str()).collect();
        let summary_text = summarizer.summarize(&contents);

        // Base salience is the strongest constituent's; provenance is the
        // union, so it is never smaller than any single member's set
        let base_salience = members
            .iter()
            .map(|m| m.base_salience)
            .fold(0.0f32, f32::max);
        let now = Utc::now();
        let mut summary = MemoryNode::new(
            summary_text,
            centroid(&members),
            base_salience,
            "",
            now,
        );
        summary.provenance.clear();
        for member in &members {
            summary.provenance.extend(member.provenance.iter().cloned());
        }
        summary.status = NodeStatus::Consolidated;
        summary.merged_from = cluster.to_vec();
        let summary_id = summary.id;

        graph.insertion_order.push(summary_id);
        graph.nodes.insert(summary_id, summary);

        // Re-point all incident edges to the summary, collapsing duplicates
        // by max weight; edges internal to the cluster disappear
        let member_set: HashSet<MemoryId> = cluster.iter().copied().collect();
        let incident: Vec<(crate::edge::EdgeKey, f32)> = graph
            .edges
            .iter()
            .filter(|(key, _)| {
                member_set.contains(&key.source) || member_set.contains(&key.target)
            })
            .map(|(key, edge)| (*key, edge.weight))
            .collect();

        for (key, weight) in incident {
            let source_in = member_set.contains(&key.source);
            let target_in = member_set.contains(&key.target);
            let rewired = if source_in && target_in {
                None
            } else if source_in {
                crate::edge::EdgeKey::new(summary_id, key.target, key.kind).ok()
            } else {
                crate::edge::EdgeKey::new(key.source, summary_id, key.kind).ok()
            };
            if let Some(new_key) = rewired {
                graph.upsert_edge(new_key, weight);
            }
        }
        for &member in cluster {
            graph.drop_edges_of(member);
            // The summary tracks which nodes it absorbed
            if let Ok(key) =
                crate::edge::EdgeKey::new(summary_id, member, RelationKind::Similarity)
            {
                graph.upsert_edge(key, 1.0);
            }
        }
    }
}

/// Normalized centroid of the member embeddings
fn centroid(members: &[MemoryNode]) -> Vec<f32> {
    let dims = members[0].embedding.len();
    let mut acc = vec![0.0f32; dims];
    for member in members {
        for (slot, value) in acc.iter_mut().zip(member.embedding.iter()) {
            *slot += value;
        }
    }
    let norm: f32 = acc.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        acc.iter_mut().for_each(|x| *x /= norm);
    }
    acc
}
