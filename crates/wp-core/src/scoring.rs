//! Keyword heuristic for scoring incident descriptions.

use serde::{Deserialize, Serialize};

use crate::incident::Severity;

const CRITICAL_INDICATORS: [&str; 4] = ["ransomware", "exfiltration", "domain admin", "c2"];
const HIGH_INDICATORS: [&str; 3] = ["phishing", "malware", "lateral movement"];

/// How much the heuristic trusts its own verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Result of scoring a free-text description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub severity: Severity,
    pub confidence: Confidence,
    pub rationale: String,
}

/// Scores a description by case-insensitive substring match.
///
/// High-impact indicators win over suspicious-behaviour indicators; anything
/// else falls back to medium severity with low confidence.
pub fn assess(description: &str) -> ThreatAssessment {
    let lowered = description.to_lowercase();

    if CRITICAL_INDICATORS.iter().any(|k| lowered.contains(k)) {
        return ThreatAssessment {
            severity: Severity::Critical,
            confidence: Confidence::Medium,
            rationale: "Keyword heuristic detected high-impact threat indicators.".to_string(),
        };
    }

    if HIGH_INDICATORS.iter().any(|k| lowered.contains(k)) {
        return ThreatAssessment {
            severity: Severity::High,
            confidence: Confidence::Medium,
            rationale: "Heuristic rules matched known suspicious behavior.".to_string(),
        };
    }

    ThreatAssessment {
        severity: Severity::Medium,
        confidence: Confidence::Low,
        rationale: "Insufficient signal for elevated severity; defaulting to medium."
            .to_string(),
    }
}
