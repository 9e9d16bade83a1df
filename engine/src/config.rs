//! Engine configuration
//!
//! Aggregates the tuning knobs of every subsystem into one deserializable
//! document so deployments can ship a single config file.

use serde::{Deserialize, Serialize};

use reverie_memory::{ConsolidationConfig, DecayConfig, GraphConfig, SalienceConfig};

use crate::intent::IntentConfig;

/// Full engine configuration with sensible defaults for every field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub graph: GraphConfig,
    pub salience: SalienceConfig,
    pub decay: DecayConfig,
    pub consolidation: ConsolidationConfig,
    pub intent: IntentConfig,
    /// Recent-window size fed to salience scoring and intent corroboration
    pub context_window: usize,
    /// How many relevant memories the response hook receives
    pub response_memory_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            salience: SalienceConfig::default(),
            decay: DecayConfig::default(),
            consolidation: ConsolidationConfig::default(),
            intent: IntentConfig::default(),
            context_window: 8,
            response_memory_limit: 4,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
