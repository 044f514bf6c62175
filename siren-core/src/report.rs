//! Incident report payload delivered to response centers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::ExtractedEntities;
use crate::triage::{priority_label, Emotion};

/// Maximum transcript excerpt length in the notification body.
const EXCERPT_LEN: usize = 100;

/// The notification pushed to matched centers and logged in the alert
/// history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentReport {
    pub title: String,
    pub body: String,
    pub priority: u8,
    pub priority_text: String,
    pub emergency_type: Option<String>,
    pub location: Option<String>,
    pub emotion: Emotion,
    pub transcript: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
}

impl IncidentReport {
    /// Build a report from one analysis outcome.
    pub fn new(
        transcript: &str,
        emotion: Emotion,
        entities: &ExtractedEntities,
        priority: u8,
        filename: &str,
    ) -> Self {
        let priority_text = priority_label(priority).to_string();
        let type_title = entities
            .emergency_type
            .as_deref()
            .map(title_case)
            .unwrap_or_else(|| "Unknown".to_string());

        let title = format!("{priority_text} Emergency - {type_title}");
        let body = format!(
            "Location: {}\nType: {}\nEmotion: {}\n\"{}\"",
            entities.location.as_deref().unwrap_or("Not specified"),
            type_title,
            emotion,
            excerpt(transcript),
        );

        Self {
            title,
            body,
            priority,
            priority_text,
            emergency_type: entities.emergency_type.clone(),
            location: entities.location.clone(),
            emotion,
            transcript: transcript.to_string(),
            filename: filename.to_string(),
            timestamp: Utc::now(),
        }
    }
}

fn excerpt(transcript: &str) -> String {
    if transcript.chars().count() <= EXCERPT_LEN {
        transcript.to_string()
    } else {
        let cut: String = transcript.chars().take(EXCERPT_LEN).collect();
        format!("{cut}...")
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
