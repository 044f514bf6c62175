//! Entity extraction collaborator.
//!
//! The default provider is a keyword/pattern extractor: good enough to route
//! incidents without a model dependency, and pluggable behind the trait for
//! anything smarter.

use regex::Regex;

use super::ExtractedEntities;

/// Entity extraction contract: transcript text in, routing entities out.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> ExtractedEntities;
}

/// Emergency type keyword table, first category hit wins.
const EMERGENCY_TYPES: &[(&str, &[&str])] = &[
    ("fire", &["fire", "burning", "smoke", "flames"]),
    (
        "medical",
        &[
            "heart attack",
            "stroke",
            "injury",
            "injured",
            "bleeding",
            "unconscious",
            "breathing",
            "chest pain",
            "ambulance",
        ],
    ),
    (
        "crime",
        &[
            "robbery", "theft", "assault", "shooting", "gun", "weapon", "attack", "violence",
            "break in",
        ],
    ),
    ("accident", &["accident", "crash", "collision", "hit", "vehicle"]),
    (
        "disturbance",
        &["disturbance", "noise", "fight", "argument", "suspicious"],
    ),
];

const CRITICAL_LEVEL_KEYWORDS: &[&str] = &[
    "fire",
    "shooting",
    "explosion",
    "heart attack",
    "stroke",
    "dying",
    "unconscious",
    "severe bleeding",
];

const HIGH_LEVEL_KEYWORDS: &[&str] = &["accident", "injury", "assault", "robbery", "chest pain"];

/// Keyword and pattern based entity extractor.
pub struct KeywordEntityExtractor {
    address_pattern: Regex,
    place_pattern: Regex,
}

impl Default for KeywordEntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordEntityExtractor {
    pub fn new() -> Self {
        // Street addresses like "123 Main Street" or "45 Oak Ave".
        let address_pattern = Regex::new(
            r"(?i)\d+\s+[\w\s]+?(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct)\b",
        )
        .expect("address pattern is valid");

        // Capitalized place names following a locative preposition, e.g.
        // "at Springfield, Illinois" or "near Lake View".
        let place_pattern = Regex::new(
            r"\b(?:at|in|near)\s+([A-Z][\w']*(?:(?:,\s*|\s+)[A-Z][\w']*)*)",
        )
        .expect("place pattern is valid");

        Self {
            address_pattern,
            place_pattern,
        }
    }

    fn extract_location(&self, text: &str) -> Option<String> {
        if let Some(caps) = self.place_pattern.captures(text) {
            return Some(caps[1].trim().to_string());
        }
        self.address_pattern
            .find(text)
            .map(|m| m.as_str().trim().to_string())
    }

    fn extract_emergency_type(text_lower: &str) -> Option<String> {
        for (emergency_type, keywords) in EMERGENCY_TYPES {
            if keywords.iter().any(|kw| text_lower.contains(kw)) {
                return Some((*emergency_type).to_string());
            }
        }
        None
    }

    fn extract_priority_level(text_lower: &str) -> String {
        if CRITICAL_LEVEL_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
            "Critical".to_string()
        } else if HIGH_LEVEL_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
            "High".to_string()
        } else {
            "Medium".to_string()
        }
    }
}

impl EntityExtractor for KeywordEntityExtractor {
    fn extract(&self, text: &str) -> ExtractedEntities {
        let text_lower = text.to_lowercase();

        ExtractedEntities {
            emergency_type: Self::extract_emergency_type(&text_lower),
            location: self.extract_location(text),
            priority_level: Some(Self::extract_priority_level(&text_lower)),
        }
    }
}

/// Fixed-output extractor for tests.
pub struct MockEntityExtractor {
    entities: ExtractedEntities,
}

impl MockEntityExtractor {
    pub fn new(entities: ExtractedEntities) -> Self {
        Self { entities }
    }

    /// Convenience for tests that only care about the extracted location.
    pub fn with_location(location: impl Into<String>) -> Self {
        Self::new(ExtractedEntities {
            location: Some(location.into()),
            ..Default::default()
        })
    }
}

impl EntityExtractor for MockEntityExtractor {
    fn extract(&self, _text: &str) -> ExtractedEntities {
        self.entities.clone()
    }
}
