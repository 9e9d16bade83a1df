//! Importance decay and pruning
//!
//! Effective importance is recomputed, never stored as ground truth:
//! `effective = base_salience * decay_factor(age, access_count)` where the
//! factor is exponential in idle time with a retrieval-extended time constant
//! (each access multiplies the constant by `ltp_multiplier`). The factor is
//! bounded in (0,1], so accumulated access history can never push effective
//! importance above base salience.
//!
//! Sweeps are amortized: each invocation walks at most `sweep_budget` nodes
//! from a wrap-around cursor, so no caller ever pays for the whole graph.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::MemoryGraph;
use crate::node::{MemoryId, NodeStatus};

/// Decay engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Base decay time constant in seconds (default: 3 days)
    pub base_tau_secs: u64,
    /// Each recorded access multiplies the time constant by this factor
    pub ltp_multiplier: f32,
    /// Nodes with effective importance below this are pruned
    pub prune_floor: f32,
    /// Sweep after this many integrations
    pub sweep_every_integrations: u32,
    /// Sweep after this much elapsed time in seconds, whichever fires first
    pub sweep_interval_secs: u64,
    /// Maximum nodes examined per sweep invocation
    pub sweep_budget: usize,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            base_tau_secs: 3 * 24 * 3600,
            ltp_multiplier: 1.4,
            prune_floor: 0.05,
            sweep_every_integrations: 16,
            sweep_interval_secs: 60,
            sweep_budget: 128,
        }
    }
}

/// Report from one sweep invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    /// Nodes examined
    pub scanned: usize,
    /// Nodes whose effective importance was recomputed
    pub refreshed: usize,
    /// Nodes marked pruned
    pub pruned: usize,
    /// Nodes that could not be processed (counted, never silently dropped)
    pub skipped: usize,
}

/// Decides when an opportunistic sweep is due
#[derive(Debug, Clone)]
pub struct SweepTrigger {
    integrations: u32,
    last_sweep: DateTime<Utc>,
}

impl SweepTrigger {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            integrations: 0,
            last_sweep: now,
        }
    }

    pub fn record_integration(&mut self) {
        self.integrations = self.integrations.saturating_add(1);
    }

    /// Whichever configured trigger fires first
    pub fn is_due(&self, config: &DecayConfig, now: DateTime<Utc>) -> bool {
        self.integrations >= config.sweep_every_integrations
            || (now - self.last_sweep) >= Duration::seconds(config.sweep_interval_secs as i64)
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.integrations = 0;
        self.last_sweep = now;
    }
}

/// Recomputes effective importance and prunes below-floor nodes
#[derive(Debug, Clone, Default)]
pub struct DecayEngine {
    config: DecayConfig,
}

impl DecayEngine {
    pub fn new(config: DecayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    /// Decay factor in (0,1]: monotonically decreasing in idle time,
    /// monotonically increasing in access count.
    pub fn decay_factor(&self, idle: Duration, access_count: u32) -> f32 {
        let idle_secs = idle.num_seconds().max(0) as f32;
        // Accesses beyond the first extend the time constant
        let boosts = access_count.saturating_sub(1).min(32);
        let tau = self.config.base_tau_secs as f32 * self.config.ltp_multiplier.powi(boosts as i32);
        (-idle_secs / tau).exp().clamp(f32::MIN_POSITIVE, 1.0)
    }

    /// Effective importance of a node at `now`. Never exceeds base salience.
    pub fn effective_importance(
        &self,
        base_salience: f32,
        last_accessed: DateTime<Utc>,
        access_count: u32,
        now: DateTime<Utc>,
    ) -> f32 {
        base_salience * self.decay_factor(now - last_accessed, access_count)
    }

    /// Budgeted sweep: refresh effective importance and prune below-floor
    /// nodes, resuming from the graph's cursor. Individual node failures are
    /// counted as skipped and never abort the rest of the sweep.
    pub fn sweep(&self, graph: &mut MemoryGraph, now: DateTime<Utc>) -> SweepReport {
        self.sweep_inner(graph, self.config.prune_floor, self.config.sweep_budget, now)
    }

    /// Full prune pass over the entire graph, with an optional threshold
    /// override. Returns the number of nodes removed.
    pub fn prune(
        &self,
        graph: &mut MemoryGraph,
        threshold_override: Option<f32>,
        now: DateTime<Utc>,
    ) -> usize {
        let threshold = threshold_override.unwrap_or(self.config.prune_floor);
        let total = graph.insertion_order.len();
        self.sweep_inner(graph, threshold, total, now).pruned
    }

    fn sweep_inner(
        &self,
        graph: &mut MemoryGraph,
        threshold: f32,
        budget: usize,
        now: DateTime<Utc>,
    ) -> SweepReport {
        let mut report = SweepReport::default();
        let total = graph.insertion_order.len();
        if total == 0 || budget == 0 {
            return report;
        }

        let steps = budget.min(total);
        let mut to_prune: Vec<MemoryId> = Vec::new();
        let mut cursor = graph.sweep_cursor % total;

        for _ in 0..steps {
            let id = graph.insertion_order[cursor];
            cursor = (cursor + 1) % total;
            report.scanned += 1;

            let Some(node) = graph.nodes.get_mut(&id) else {
                // Dangling id in the order list; count it, keep going
                report.skipped += 1;
                continue;
            };
            if !node.is_queryable() {
                continue;
            }

            let effective = self.effective_importance(
                node.base_salience,
                node.last_accessed,
                node.access_count,
                now,
            );
            node.effective_importance = effective;
            report.refreshed += 1;

            if effective < threshold && node.status == NodeStatus::Active {
                to_prune.push(id);
            }
        }
        graph.sweep_cursor = cursor;

        for id in to_prune {
            if self.is_provenance_anchor(graph, id, threshold) {
                report.skipped += 1;
                continue;
            }
            graph.mark_pruned(id);
            report.pruned += 1;
        }

        if report.pruned > 0 {
            log::debug!(
                "decay sweep pruned {} of {} scanned nodes",
                report.pruned,
                report.scanned
            );
        }
        report
    }

    /// A node is protected when it is the sole surviving constituent of a
    /// consolidated node that itself still clears the threshold. Pruning it
    /// would orphan the summary's referenced history.
    fn is_provenance_anchor(&self, graph: &MemoryGraph, id: MemoryId, threshold: f32) -> bool {
        graph
            .nodes
            .values()
            .filter(|n| n.status == NodeStatus::Consolidated && n.effective_importance >= threshold)
            .any(|summary| {
                summary.merged_from.contains(&id)
                    && summary
                        .merged_from
                        .iter()
                        .filter(|m| {
                            graph
                                .nodes
                                .get(m)
                                .is_some_and(|n| n.status == NodeStatus::Active)
                        })
                        .count()
                        <= 1
            })
    }
}
