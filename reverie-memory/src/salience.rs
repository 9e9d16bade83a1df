//! Salience scoring
//!
//! Computes the importance of a unit of content before it enters the graph.
//! Combines novelty against the recent window, lexical markers of explicit
//! requests or commitments, and recency-weighted references back into the
//! window. Pure: never mutates the store.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::embedding::cosine_similarity;
use crate::error::{MemoryError, Result};
use crate::node::MemoryNode;

/// Weights for the salience combination. Tunable policy, not correctness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalienceConfig {
    /// Weight of novelty (inverse similarity to the closest existing node)
    pub novelty_weight: f32,
    /// Weight of explicit request/commitment markers
    pub marker_weight: f32,
    /// Weight of recency-weighted references into the context window
    pub reference_weight: f32,
}

impl Default for SalienceConfig {
    fn default() -> Self {
        Self {
            novelty_weight: 0.5,
            marker_weight: 0.3,
            reference_weight: 0.2,
        }
    }
}

/// A marker class with its strength contribution
struct MarkerClass {
    pattern: &'static Regex,
    strength: f32,
}

fn request_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(could you|can you|would you|please|i need|we need|help me)\b")
            .expect("request marker regex")
    })
}

fn commitment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(i will|i'll|we will|we'll|remind me|don't forget|i promise)\b")
            .expect("commitment marker regex")
    })
}

fn question_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\?|\b(what|when|where|which|how much|how many)\b)")
            .expect("question marker regex")
    })
}

fn marker_classes() -> [MarkerClass; 3] {
    [
        MarkerClass {
            pattern: request_re(),
            strength: 1.0,
        },
        MarkerClass {
            pattern: commitment_re(),
            strength: 0.9,
        },
        MarkerClass {
            pattern: question_re(),
            strength: 0.6,
        },
    ]
}

/// Scores importance of content given its embedding and recent context
#[derive(Debug, Clone, Default)]
pub struct SalienceScorer {
    config: SalienceConfig,
}

impl SalienceScorer {
    pub fn new(config: SalienceConfig) -> Self {
        Self { config }
    }

    /// Score content in [0,1]. `context` is the recent window of prior
    /// memory nodes, most recent first; it may be empty.
    ///
    /// Deterministic given identical embedding output. Errors with
    /// `InvalidContent` on empty content before anything else.
    pub fn score(&self, content: &str, embedding: &[f32], context: &[MemoryNode]) -> Result<f32> {
        if content.trim().is_empty() {
            return Err(MemoryError::invalid_content("content must not be empty"));
        }

        let novelty = self.novelty(embedding, context);
        let marker = Self::marker_strength(content);
        let reference = Self::reference_score(content, context);

        let score = self.config.novelty_weight * novelty
            + self.config.marker_weight * marker
            + self.config.reference_weight * reference;

        Ok(score.clamp(0.0, 1.0))
    }

    /// Inverse similarity to the most similar context node. Empty context
    /// means everything is novel.
    fn novelty(&self, embedding: &[f32], context: &[MemoryNode]) -> f32 {
        let max_sim = context
            .iter()
            .map(|node| cosine_similarity(embedding, &node.embedding))
            .fold(0.0f32, f32::max);
        (1.0 - max_sim).clamp(0.0, 1.0)
    }

    /// Strongest matched marker class, 0.0 when none match
    fn marker_strength(content: &str) -> f32 {
        marker_classes()
            .iter()
            .filter(|class| class.pattern.is_match(content))
            .map(|class| class.strength)
            .fold(0.0f32, f32::max)
    }

    /// Recency-weighted lexical overlap with the context window.
    /// The i-th most recent node contributes with weight 1/(i+1).
    fn reference_score(content: &str, context: &[MemoryNode]) -> f32 {
        if context.is_empty() {
            return 0.0;
        }

        let tokens: Vec<String> = tokenize(content);
        if tokens.is_empty() {
            return 0.0;
        }

        let mut weighted = 0.0f32;
        let mut total_weight = 0.0f32;
        for (i, node) in context.iter().enumerate() {
            let weight = 1.0 / (i as f32 + 1.0);
            total_weight += weight;

            let node_tokens = tokenize(&node.content);
            let overlap = tokens.iter().filter(|t| node_tokens.contains(t)).count();
            if overlap > 0 {
                weighted += weight * (overlap as f32 / tokens.len() as f32).min(1.0);
            }
        }

        (weighted / total_weight).clamp(0.0, 1.0)
    }
}

/// Tokenize text into lowercase terms, dropping short words
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() > 2)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(content: &str, embedding: Vec<f32>) -> MemoryNode {
        MemoryNode::new(content, embedding, 0.5, "msg", Utc::now())
    }

    #[test]
    fn test_empty_content_rejected() {
        let scorer = SalienceScorer::default();
        let result = scorer.score("   ", &[1.0, 0.0], &[]);
        assert!(matches!(result, Err(MemoryError::InvalidContent(_))));
    }

    #[test]
    fn test_explicit_request_scores_upper_half() {
        let scorer = SalienceScorer::default();
        let score = scorer
            .score(
                "Could you check flights to Tokyo next week?",
                &[1.0, 0.0, 0.0],
                &[],
            )
            .unwrap();
        // Full novelty (empty context) plus a request marker
        assert!(score >= 0.5, "expected upper half, got {score}");
    }

    #[test]
    fn test_novelty_drops_with_similar_context() {
        let scorer = SalienceScorer::default();
        let embedding = vec![1.0, 0.0, 0.0];

        let fresh = scorer.score("something new entirely", &embedding, &[]).unwrap();
        let context = vec![node("something new entirely", embedding.clone())];
        let repeat = scorer
            .score("something new entirely", &embedding, &context)
            .unwrap();

        // Identical embedding in context kills novelty; reference overlap
        // contributes less than novelty did
        assert!(repeat < fresh);
    }

    #[test]
    fn test_monotone_in_marker_strength() {
        let scorer = SalienceScorer::default();
        let embedding = vec![0.0, 1.0];

        let plain = scorer.score("the sky is blue today", &embedding, &[]).unwrap();
        let request = scorer
            .score("please tell me the sky is blue today", &embedding, &[])
            .unwrap();
        assert!(request > plain);
    }

    #[test]
    fn test_marker_strength_classes() {
        assert_eq!(SalienceScorer::marker_strength("could you book it"), 1.0);
        assert_eq!(SalienceScorer::marker_strength("I'll send the report"), 0.9);
        assert_eq!(SalienceScorer::marker_strength("when does it open"), 0.6);
        assert_eq!(SalienceScorer::marker_strength("nice weather"), 0.0);
    }

    #[test]
    fn test_reference_score_recency_weighted() {
        let recent = vec![
            node("tokyo flights schedule", vec![1.0, 0.0]),
            node("unrelated grocery list", vec![0.0, 1.0]),
        ];
        let older_first = vec![
            node("unrelated grocery list", vec![0.0, 1.0]),
            node("tokyo flights schedule", vec![1.0, 0.0]),
        ];

        let near = SalienceScorer::reference_score("tokyo flights", &recent);
        let far = SalienceScorer::reference_score("tokyo flights", &older_first);
        assert!(near > far);
    }

    #[test]
    fn test_score_bounded() {
        let scorer = SalienceScorer::default();
        let score = scorer
            .score("could you please help me, I'll remind me?", &[1.0], &[])
            .unwrap();
        assert!((0.0..=1.0).contains(&score));
    }
}
