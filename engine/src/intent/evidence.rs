//! Evidence extraction for intent tracking
//!
//! Scans message text against a table of labeled signal patterns. A signal
//! gains a corroboration boost when the recent memory window matches the
//! same pattern, and must clear an admission threshold before the tracker
//! sees it. Purely lexical; embedding-based intent models plug in above
//! this layer by emitting their own signals.

use std::sync::OnceLock;

use regex::Regex;
use reverie_memory::MemoryNode;
use serde::{Deserialize, Serialize};

/// Boost applied when the recent window corroborates a signal
const CORROBORATION_BOOST: f32 = 0.15;

/// How strongly sensitivity shifts the admission threshold
const SENSITIVITY_GAIN: f32 = 0.2;

/// One piece of evidence for an intent label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSignal {
    pub label: String,
    /// Strength in (0, 1]
    pub strength: f32,
}

struct SignalClass {
    label: &'static str,
    strength: f32,
    pattern: fn() -> &'static Regex,
}

macro_rules! signal_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("signal regex"))
        }
    };
}

signal_regex!(
    travel_re,
    r"(?i)\b(flight|flights|hotel|hotels|itinerary|trip|travel|layover|visa)\b"
);
signal_regex!(
    scheduling_re,
    r"(?i)\b(schedule|reschedule|meeting|calendar|appointment|availability)\b"
);
signal_regex!(
    purchase_re,
    r"(?i)\b(buy|purchase|order|checkout|cart|pricing|price|quote)\b"
);
signal_regex!(
    support_re,
    r"(?i)\b(broken|crash|crashes|not working|error|bug|issue|troubleshoot)\b"
);
signal_regex!(
    info_re,
    r"(?i)\b(what is|what are|how do|how does|tell me about|explain|difference between)\b"
);
signal_regex!(
    commitment_re,
    r"(?i)\b(i will|i'll|we will|we'll|remind me|don't forget)\b"
);
signal_regex!(cancel_re, r"(?i)\b(cancel|cancellation|refund|call off)\b");
signal_regex!(
    smalltalk_re,
    r"(?i)\b(hello|hi there|good morning|good evening|thanks|thank you|how are you)\b"
);

fn signal_table() -> &'static [SignalClass] {
    static TABLE: &[SignalClass] = &[
        SignalClass {
            label: "travel-inquiry",
            strength: 0.8,
            pattern: travel_re,
        },
        SignalClass {
            label: "scheduling",
            strength: 0.75,
            pattern: scheduling_re,
        },
        SignalClass {
            label: "purchase",
            strength: 0.7,
            pattern: purchase_re,
        },
        SignalClass {
            label: "support-request",
            strength: 0.75,
            pattern: support_re,
        },
        SignalClass {
            label: "information-seeking",
            strength: 0.5,
            pattern: info_re,
        },
        SignalClass {
            label: "commitment",
            strength: 0.65,
            pattern: commitment_re,
        },
        SignalClass {
            label: "cancellation",
            strength: 0.8,
            pattern: cancel_re,
        },
        SignalClass {
            label: "smalltalk",
            strength: 0.3,
            pattern: smalltalk_re,
        },
    ];
    TABLE
}

/// Admission threshold after the sensitivity shift. Positive sensitivity
/// admits weaker evidence, negative demands stronger.
pub fn admission_threshold(evidence_floor: f32, sensitivity: f32) -> f32 {
    (evidence_floor - SENSITIVITY_GAIN * sensitivity).clamp(0.05, 0.95)
}

/// Extract admissible evidence from a message given the recent memory window
pub fn extract(
    content: &str,
    recent_window: &[MemoryNode],
    evidence_floor: f32,
    sensitivity: f32,
) -> Vec<EvidenceSignal> {
    let threshold = admission_threshold(evidence_floor, sensitivity);

    signal_table()
        .iter()
        .filter(|class| (class.pattern)().is_match(content))
        .map(|class| {
            let corroborated = recent_window
                .iter()
                .any(|node| (class.pattern)().is_match(&node.content));
            let strength = if corroborated {
                (class.strength + CORROBORATION_BOOST).min(1.0)
            } else {
                class.strength
            };
            EvidenceSignal {
                label: class.label.to_string(),
                strength,
            }
        })
        .filter(|signal| signal.strength >= threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(content: &str) -> MemoryNode {
        MemoryNode::new(content, vec![1.0, 0.0], 0.5, "msg", Utc::now())
    }

    #[test]
    fn test_travel_signal_extracted() {
        let signals = extract("could you check flights to Tokyo next week?", &[], 0.25, 0.0);
        assert!(signals.iter().any(|s| s.label == "travel-inquiry"));
    }

    #[test]
    fn test_no_signal_from_neutral_text() {
        let signals = extract("the weather was fine yesterday", &[], 0.25, 0.0);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_corroboration_boosts_strength() {
        let bare = extract("any cheap flights in may?", &[], 0.25, 0.0);
        let window = vec![node("we talked about flights to Osaka")];
        let boosted = extract("any cheap flights in may?", &window, 0.25, 0.0);

        let bare_strength = bare[0].strength;
        let boosted_strength = boosted[0].strength;
        assert!(boosted_strength > bare_strength);
        assert!(boosted_strength <= 1.0);
    }

    #[test]
    fn test_sensitivity_shifts_admission() {
        // smalltalk strength 0.3 clears the default floor but not a
        // negative-sensitivity one
        let default = extract("hello, thanks for earlier", &[], 0.25, 0.0);
        assert!(default.iter().any(|s| s.label == "smalltalk"));

        let strict = extract("hello, thanks for earlier", &[], 0.25, -1.0);
        assert!(strict.is_empty());
    }

    #[test]
    fn test_multiple_labels_from_one_message() {
        let signals = extract(
            "cancel my hotel and refund the order please",
            &[],
            0.25,
            0.0,
        );
        let labels: Vec<&str> = signals.iter().map(|s| s.label.as_str()).collect();
        assert!(labels.contains(&"cancellation"));
        assert!(labels.contains(&"travel-inquiry"));
        assert!(labels.contains(&"purchase"));
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(admission_threshold(0.25, 10.0) >= 0.05);
        assert!(admission_threshold(0.25, -10.0) <= 0.95);
    }
}
