//! Confidence calibration
//!
//! Separates "how much mass the top label holds" from "how much the caller
//! should trust that number". Calibration is pluggable so deployments can
//! swap in learned calibrators; the default discounts for recent top-label
//! churn and caps at the strength of the evidence behind the top label.

use super::evidence::EvidenceSignal;

/// Maps a raw top-label probability to a trust score
pub trait ConfidenceCalibrator: Send + Sync {
    /// `signals` is the evidence from the update being calibrated and
    /// `top_label` the label currently holding the most mass.
    /// Must never return a value above `raw`.
    fn calibrate(
        &self,
        raw: f32,
        volatility: u32,
        top_label: Option<&str>,
        signals: &[EvidenceSignal],
    ) -> f32;
}

/// Default calibrator: multiplicative volatility discount, capped by the
/// weakest signal supporting the top label. Corroborated signals carry
/// boosted strength, so corroboration loosens the cap on its own.
#[derive(Debug, Clone)]
pub struct VolatilityCalibrator {
    pub volatility_penalty: f32,
}

impl VolatilityCalibrator {
    pub fn new(volatility_penalty: f32) -> Self {
        Self {
            volatility_penalty: volatility_penalty.clamp(0.0, 1.0),
        }
    }
}

impl Default for VolatilityCalibrator {
    fn default() -> Self {
        Self::new(0.12)
    }
}

impl ConfidenceCalibrator for VolatilityCalibrator {
    fn calibrate(
        &self,
        raw: f32,
        volatility: u32,
        top_label: Option<&str>,
        signals: &[EvidenceSignal],
    ) -> f32 {
        let discount = (1.0 - self.volatility_penalty).powi(volatility.min(16) as i32);
        let mut confidence = raw * discount;

        // This update cannot justify more confidence in the top label than
        // its weakest supporting signal
        if let Some(label) = top_label {
            let weakest = signals
                .iter()
                .filter(|s| s.label == label)
                .map(|s| s.strength)
                .fold(f32::INFINITY, f32::min);
            if weakest.is_finite() {
                confidence = confidence.min(weakest);
            }
        }

        confidence.clamp(0.0, raw.clamp(0.0, 1.0))
    }
}
