//! Embedding provider contract
//!
//! Embedding computation is an injected capability. Providers are assumed
//! deterministic and content-addressable (same text, same vector), which the
//! duplicate-detection policy in the graph store relies on.

use crate::error::Result;

/// Converts text into a fixed-length numeric vector
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a piece of text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of the vectors this provider produces
    fn dimensions(&self) -> usize;
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Deterministic embedding provider for tests.
///
/// Hashes whitespace-separated tokens into a fixed number of buckets and
/// normalizes. Identical text always maps to an identical vector; texts
/// sharing tokens land near each other.
pub mod testing {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use super::EmbeddingProvider;
    use crate::error::Result;

    pub struct HashEmbedder {
        dims: usize,
    }

    impl HashEmbedder {
        pub fn new(dims: usize) -> Self {
            Self { dims }
        }
    }

    impl Default for HashEmbedder {
        fn default() -> Self {
            Self::new(64)
        }
    }

    impl EmbeddingProvider for HashEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; self.dims];
            for token in text
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
            {
                let mut hasher = DefaultHasher::new();
                token.hash(&mut hasher);
                let bucket = (hasher.finish() as usize) % self.dims;
                v[bucket] += 1.0;
            }

            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                v.iter_mut().for_each(|x| *x /= norm);
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }
}
