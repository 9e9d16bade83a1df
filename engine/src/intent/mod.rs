//! Probabilistic intent tracking
//!
//! Maintains a per-conversation distribution over open-vocabulary intent
//! labels. Mass not assigned to any label is implicit "unknown"; new labels
//! buy in from that residual. Updates are Bayesian-style reweightings driven
//! by extracted evidence, with confidence reported separately from raw
//! probability via a pluggable calibrator.

pub mod calibrate;
pub mod evidence;

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use calibrate::{ConfidenceCalibrator, VolatilityCalibrator};
pub use evidence::EvidenceSignal;

/// Tuning knobs for the intent tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Hard cap on tracked labels; lowest-mass labels evict back to unknown
    pub max_labels: usize,
    /// Bounded update history length, also the volatility window
    pub history_window: usize,
    /// Base admission threshold for evidence signals
    pub evidence_floor: f32,
    /// Mass a newly seen label borrows from the unknown residual
    pub new_label_seed: f32,
    /// Per-flip confidence discount applied by the default calibrator
    pub volatility_penalty: f32,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            max_labels: 16,
            history_window: 8,
            evidence_floor: 0.25,
            new_label_seed: 0.05,
            volatility_penalty: 0.12,
        }
    }
}

/// Point-in-time view of the tracker for callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentEstimate {
    /// Current top label, None while everything is unknown
    pub label: Option<String>,
    /// Raw probability mass held by the top label
    pub probability: f32,
    /// Calibrated trust in that probability, never above it
    pub confidence: f32,
    /// Top-label flips within the history window
    pub volatility: u32,
}

/// Whether an update changed the distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    Updated,
    /// No admissible evidence; state untouched. Not an error.
    InsufficientEvidence,
}

/// Result of feeding one message to the tracker
#[derive(Debug, Clone)]
pub struct IntentUpdate {
    pub outcome: IntentOutcome,
    pub estimate: IntentEstimate,
    pub signals: Vec<EvidenceSignal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryEntry {
    timestamp: DateTime<Utc>,
    top_label: Option<String>,
    signals: Vec<EvidenceSignal>,
}

/// Per-conversation intent distribution with bounded history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentState {
    /// Label mass; total stays <= 1, residual is implicit unknown
    distribution: BTreeMap<String, f32>,
    /// Labels in first-seen order, for eviction tie-breaks
    first_seen: Vec<String>,
    history: VecDeque<HistoryEntry>,
    confidence: f32,
}

impl IntentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mass not assigned to any tracked label
    pub fn unknown_mass(&self) -> f32 {
        (1.0 - self.distribution.values().sum::<f32>()).max(0.0)
    }

    /// Probability mass for one label
    pub fn probability(&self, label: &str) -> f32 {
        self.distribution.get(label).copied().unwrap_or(0.0)
    }

    pub fn tracked_labels(&self) -> usize {
        self.distribution.len()
    }

    /// Top-label flips among consecutive history entries
    pub fn volatility(&self) -> u32 {
        self.history
            .iter()
            .zip(self.history.iter().skip(1))
            .filter(|(a, b)| a.top_label != b.top_label)
            .count() as u32
    }

    /// Current view without mutating anything
    pub fn estimate(&self) -> IntentEstimate {
        let top = self
            .distribution
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));

        IntentEstimate {
            label: top.map(|(label, _)| label.clone()),
            probability: top.map(|(_, mass)| *mass).unwrap_or(0.0),
            confidence: self.confidence,
            volatility: self.volatility(),
        }
    }

    /// Feed one message's content to the tracker.
    ///
    /// `recent_window` is the recent memory context used for corroboration,
    /// most recent first. Insufficient evidence is a normal outcome and
    /// leaves the distribution, history, and confidence untouched.
    pub fn update(
        &mut self,
        content: &str,
        recent_window: &[reverie_memory::MemoryNode],
        sensitivity: f32,
        config: &IntentConfig,
        calibrator: &dyn ConfidenceCalibrator,
        now: DateTime<Utc>,
    ) -> IntentUpdate {
        let signals = evidence::extract(content, recent_window, config.evidence_floor, sensitivity);
        if signals.is_empty() {
            return IntentUpdate {
                outcome: IntentOutcome::InsufficientEvidence,
                estimate: self.estimate(),
                signals,
            };
        }

        // New labels buy in from the unknown residual
        let mut unknown = self.unknown_mass();
        for signal in &signals {
            if !self.distribution.contains_key(&signal.label) {
                let seed = config.new_label_seed.min(unknown).max(1e-4);
                unknown = (unknown - seed).max(0.0);
                self.distribution.insert(signal.label.clone(), seed);
                self.first_seen.push(signal.label.clone());
            }
        }

        // Posterior proportional to prior times (1 + evidence strength)
        let mut total = unknown;
        let mut posterior: BTreeMap<String, f32> = BTreeMap::new();
        for (label, mass) in &self.distribution {
            let boost: f32 = signals
                .iter()
                .filter(|s| &s.label == label)
                .map(|s| s.strength)
                .sum();
            let weighted = mass * (1.0 + boost);
            total += weighted;
            posterior.insert(label.clone(), weighted);
        }
        if total > 0.0 {
            for mass in posterior.values_mut() {
                *mass /= total;
            }
        }
        self.distribution = posterior;

        self.enforce_label_cap(config.max_labels);

        let top_label = self.estimate().label;
        self.history.push_back(HistoryEntry {
            timestamp: now,
            top_label: top_label.clone(),
            signals: signals.clone(),
        });
        while self.history.len() > config.history_window {
            self.history.pop_front();
        }

        let raw = self.estimate().probability;
        self.confidence =
            calibrator.calibrate(raw, self.volatility(), top_label.as_deref(), &signals);

        IntentUpdate {
            outcome: IntentOutcome::Updated,
            estimate: self.estimate(),
            signals,
        }
    }

    /// Forget the learned distribution: retained labels share mass
    /// uniformly with the unknown residual, history and volatility clear.
    pub fn reset(&mut self) {
        let n = self.distribution.len();
        if n > 0 {
            let share = 1.0 / (n as f32 + 1.0);
            for mass in self.distribution.values_mut() {
                *mass = share;
            }
        }
        self.history.clear();
        self.confidence = 0.0;
    }

    /// Evict lowest-mass labels back into unknown until under the cap.
    /// Ties evict the label seen longest ago.
    fn enforce_label_cap(&mut self, max_labels: usize) {
        while self.distribution.len() > max_labels {
            let victim = self
                .first_seen
                .iter()
                .filter(|label| self.distribution.contains_key(*label))
                .min_by(|a, b| {
                    self.probability(a)
                        .partial_cmp(&self.probability(b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .cloned();

            match victim {
                Some(label) => {
                    self.distribution.remove(&label);
                    self.first_seen.retain(|l| l != &label);
                }
                None => break,
            }
        }
    }
}
