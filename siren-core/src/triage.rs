//! Triage classification policy.
//!
//! Maps a transcript and an emotion label to a priority tier (1 = critical,
//! 4 = low). The policy is an ordered keyword scan with first match winning;
//! emotional escalation sits between the high and medium tiers.

use serde::{Deserialize, Deserializer, Serialize};

/// Emotional state derived from the call audio.
///
/// The emotion collaborator never fails: anything it cannot classify comes
/// back as `Calm`, which is also the deserialization fallback for labels
/// outside the closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Emotion {
    #[serde(rename = "PANIC")]
    Panic,
    #[serde(rename = "DISTRESS")]
    Distress,
    #[default]
    #[serde(rename = "CALM")]
    Calm,
}

impl<'de> Deserialize<'de> for Emotion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Lossy on purpose: unknown labels degrade to CALM instead of
        // rejecting the enclosing payload.
        let label = String::deserialize(deserializer)?;
        Ok(Emotion::parse_lossy(&label))
    }
}

impl Emotion {
    /// Whether this emotion escalates an otherwise low-tier incident.
    pub fn is_escalating(self) -> bool {
        matches!(self, Emotion::Panic | Emotion::Distress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Panic => "PANIC",
            Emotion::Distress => "DISTRESS",
            Emotion::Calm => "CALM",
        }
    }

    /// Parse a label, falling back to `Calm` for anything unknown.
    pub fn parse_lossy(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "PANIC" => Emotion::Panic,
            "DISTRESS" => Emotion::Distress,
            _ => Emotion::Calm,
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords that force priority 1 regardless of emotion.
const CRITICAL_KEYWORDS: &[&str] = &[
    "fire",
    "shooting",
    "explosion",
    "heart attack",
    "stroke",
    "bleeding",
    "unconscious",
    "dying",
    "weapon",
    "gun",
];

/// Keywords mapping to priority 2.
const HIGH_KEYWORDS: &[&str] = &[
    "accident",
    "injury",
    "assault",
    "robbery",
    "burglary",
    "chest pain",
    "difficulty breathing",
    "severe pain",
];

/// Keywords mapping to priority 3 when no higher rule fires.
const MEDIUM_KEYWORDS: &[&str] = &[
    "theft",
    "suspicious",
    "noise complaint",
    "minor injury",
    "disturbance",
];

/// Classify an incident into a priority tier 1–4.
///
/// Matching is substring containment on the lower-cased transcript, not
/// tokenized: a keyword embedded inside a longer word still matches. That is
/// a known quirk of the policy, kept deliberately.
pub fn classify(transcript: &str, emotion: Emotion) -> u8 {
    let text = transcript.to_lowercase();

    if CRITICAL_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return 1;
    }
    if HIGH_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return 2;
    }
    if emotion.is_escalating() {
        return 2;
    }
    if MEDIUM_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return 3;
    }
    4
}

/// Human-readable label for a priority tier.
pub fn priority_label(priority: u8) -> &'static str {
    match priority {
        1 => "CRITICAL",
        2 => "HIGH",
        3 => "MEDIUM",
        _ => "LOW",
    }
}
