//! Memory node types
//!
//! Core types for representing units of conversational memory.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::edge::RelationKind;

/// Unique identifier for memory nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Create a new random MemoryId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MemoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle status of a memory node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Normal node, participates in all queries
    Active,
    /// Summary node produced by consolidation; queryable
    Consolidated,
    /// Removed by decay; never returned by any query
    Pruned,
}

/// A single unit of conversational memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    /// Unique identifier
    pub id: MemoryId,
    /// Semantic content
    pub content: String,
    /// Embedding vector for the content
    pub embedding: Vec<f32>,
    /// When the node was created
    pub created_at: DateTime<Utc>,
    /// When the node was last returned by a relevance query
    pub last_accessed: DateTime<Utc>,
    /// Number of relevance accesses (creation counts as the first)
    pub access_count: u32,
    /// Importance at creation time (0.0 to 1.0)
    pub base_salience: f32,
    /// Salience adjusted by decay; recomputed by sweeps, not ground truth
    pub effective_importance: f32,
    /// Source message identifiers this node derives from
    pub provenance: BTreeSet<String>,
    /// Constituent node ids, set only on consolidated nodes
    #[serde(default)]
    pub merged_from: Vec<MemoryId>,
    /// Lifecycle status
    pub status: NodeStatus,
}

impl MemoryNode {
    /// Create a new active node from integrated content
    pub fn new(
        content: impl Into<String>,
        embedding: Vec<f32>,
        salience: f32,
        source_message_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let salience = salience.clamp(0.0, 1.0);
        let mut provenance = BTreeSet::new();
        provenance.insert(source_message_id.into());

        Self {
            id: MemoryId::new(),
            content: content.into(),
            embedding,
            created_at: now,
            last_accessed: now,
            access_count: 1,
            base_salience: salience,
            effective_importance: salience,
            provenance,
            merged_from: Vec::new(),
            status: NodeStatus::Active,
        }
    }

    /// Record a relevance access: bumps count and recency
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = now;
    }

    /// Whether queries may return this node
    pub fn is_queryable(&self) -> bool {
        matches!(self.status, NodeStatus::Active | NodeStatus::Consolidated)
    }

    /// Age since the last access (or creation, if never re-accessed)
    pub fn idle_duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_accessed
    }
}

/// An edge touched during integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeTouch {
    pub source: MemoryId,
    pub target: MemoryId,
    pub kind: RelationKind,
    pub weight: f32,
}

/// Result of integrating one piece of content into the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUpdate {
    /// The node that absorbed the content
    pub node_id: MemoryId,
    /// True if a new node was created, false if an existing node was reinforced
    pub created: bool,
    /// Salience the content was integrated with
    pub salience: f32,
    /// Edges created or strengthened
    pub edges_touched: Vec<EdgeTouch>,
}
