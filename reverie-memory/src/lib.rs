//! Reverie Memory Core
//!
//! Salience-weighted conversational memory with decay-based forgetting
//! and periodic consolidation of related memories into summaries.
//!
//! ## Features
//!
//! - **Salience scoring** - Novelty, explicit markers, and contextual references decide what is worth keeping
//! - **Typed memory graph** - Similarity, temporal, and causal edges over an in-memory node arena
//! - **Decay with reinforcement** - Exponential forgetting slowed by repeated access, pruning below a floor
//! - **Consolidation** - Clusters of near-duplicate memories merge into provenance-preserving summaries
//! - **Snapshots** - Versioned bincode blobs for external persistence backends
//!
//! ## Example
//!
//! ```ignore
//! use reverie_memory::{GraphConfig, MemoryGraph, SalienceScorer};
//!
//! let scorer = SalienceScorer::default();
//! let mut graph = MemoryGraph::new(GraphConfig::default());
//!
//! let salience = scorer.score(content, &embedding, &context)?;
//! let update = graph.integrate(content, embedding, salience, message_id)?;
//! ```

pub mod consolidate;
pub mod decay;
pub mod edge;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod node;
pub mod salience;
pub mod snapshot;

// Re-exports for convenience
pub use consolidate::{
    ConsolidationConfig, ConsolidationEngine, ConsolidationReport, JoinSummarizer, Summarizer,
};
pub use decay::{DecayConfig, DecayEngine, SweepReport, SweepTrigger};
pub use edge::{EdgeKey, MemoryEdge, RelationKind};
pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use error::{MemoryError, Result};
pub use graph::{GraphConfig, MemoryGraph};
pub use node::{EdgeTouch, MemoryId, MemoryNode, MemoryUpdate, NodeStatus};
pub use salience::{SalienceConfig, SalienceScorer};
pub use snapshot::GraphSnapshot;
