//! Fingerprint-keyed store of analysis results.
//!
//! One record per unique audio content hash. A resubmission of identical
//! bytes is served from this store instead of re-running the analysis
//! collaborators; only the routing-outcome columns are refreshed.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use siren_core::{Emotion, ExtractedEntities};

use super::StoreError;

/// Cached analysis and routing outcome for one unique audio content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// SHA3-256 content fingerprint, hex-encoded
    pub content_hash: String,
    /// Filename of the first submission seen for this content
    pub filename: String,
    pub transcript: String,
    pub emotion: Emotion,
    pub entities: ExtractedEntities,
    /// Triage priority, 1 (critical) to 4 (low)
    pub priority: u8,
    /// Whether the most recent routing pass dispatched an alert
    pub alert_sent: bool,
    /// Centers matched by the most recent routing pass
    pub notified_centers: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AnalysisRow {
    content_hash: String,
    filename: String,
    transcript: String,
    emotion: String,
    entities: serde_json::Value,
    priority: i16,
    alert_sent: bool,
    notified_centers: Vec<String>,
    processed_at: DateTime<Utc>,
}

impl From<AnalysisRow> for AnalysisRecord {
    fn from(row: AnalysisRow) -> Self {
        Self {
            content_hash: row.content_hash,
            filename: row.filename,
            transcript: row.transcript,
            emotion: Emotion::parse_lossy(&row.emotion),
            entities: serde_json::from_value(row.entities).unwrap_or_default(),
            priority: row.priority.clamp(1, 4) as u8,
            alert_sent: row.alert_sent,
            notified_centers: row.notified_centers,
            processed_at: row.processed_at,
        }
    }
}

/// Dedup cache of analysis results keyed by content hash.
pub enum FingerprintStore {
    Postgres(PgPool),
    Memory(DashMap<String, AnalysisRecord>),
}

impl FingerprintStore {
    /// Create an in-memory store (tests, no `DATABASE_URL`).
    pub fn memory() -> Self {
        Self::Memory(DashMap::new())
    }

    /// Create a PostgreSQL-backed store from an existing pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }

    /// Look up the cached record for a content hash.
    pub async fn get(&self, content_hash: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => {
                let row: Option<AnalysisRow> = sqlx::query_as(
                    r#"
                    SELECT content_hash, filename, transcript, emotion, entities,
                           priority, alert_sent, notified_centers, processed_at
                    FROM analysis_results
                    WHERE content_hash = $1
                    "#,
                )
                .bind(content_hash)
                .fetch_optional(pool)
                .await?;

                Ok(row.map(Into::into))
            }
            Self::Memory(map) => Ok(map.get(content_hash).map(|e| e.value().clone())),
        }
    }

    /// Insert a record, or refresh the routing outcome of an existing one.
    ///
    /// On conflict only `alert_sent` and `notified_centers` change; the
    /// analysis columns and the original filename stay as first seen.
    pub async fn put(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO analysis_results
                        (content_hash, filename, transcript, emotion, entities,
                         priority, alert_sent, notified_centers, processed_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (content_hash) DO UPDATE SET
                        alert_sent = EXCLUDED.alert_sent,
                        notified_centers = EXCLUDED.notified_centers
                    "#,
                )
                .bind(&record.content_hash)
                .bind(&record.filename)
                .bind(&record.transcript)
                .bind(record.emotion.as_str())
                .bind(serde_json::to_value(&record.entities).unwrap_or_default())
                .bind(record.priority as i16)
                .bind(record.alert_sent)
                .bind(&record.notified_centers)
                .bind(record.processed_at)
                .execute(pool)
                .await?;

                tracing::debug!(content_hash = %record.content_hash, "Stored analysis record");
                Ok(())
            }
            Self::Memory(map) => {
                match map.get_mut(&record.content_hash) {
                    Some(mut existing) => {
                        existing.alert_sent = record.alert_sent;
                        existing.notified_centers = record.notified_centers.clone();
                    }
                    None => {
                        map.insert(record.content_hash.clone(), record.clone());
                    }
                }
                Ok(())
            }
        }
    }

    /// Count cached records.
    pub async fn count(&self) -> Result<i64, StoreError> {
        match self {
            Self::Postgres(pool) => {
                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analysis_results")
                    .fetch_one(pool)
                    .await?;
                Ok(count)
            }
            Self::Memory(map) => Ok(map.len() as i64),
        }
    }
}
