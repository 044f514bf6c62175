//! Session-scoped alert history.
//!
//! Every dispatched alert is appended here. Reads only return alerts raised
//! since this server process started, so a center dashboard coming online
//! never replays stale alerts from a previous run.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tokio::sync::Mutex;

use siren_core::IncidentReport;

use super::StoreError;

/// Maximum alerts either backend retains; older rows are dropped on append.
const RETENTION: usize = 100;

/// Default number of alerts returned by a history query.
pub const QUERY_LIMIT: usize = 20;

/// One logged alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEntry {
    pub id: i64,
    pub report: IncidentReport,
    pub matched_centers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AlertRow {
    id: i64,
    report: serde_json::Value,
    matched_centers: Vec<String>,
    created_at: DateTime<Utc>,
}

enum HistoryBackend {
    Postgres(PgPool),
    Memory {
        alerts: Mutex<VecDeque<AlertEntry>>,
        next_id: AtomicI64,
    },
}

/// Append-only alert log with session-scoped reads.
pub struct AlertHistory {
    backend: HistoryBackend,
    session_start: DateTime<Utc>,
}

impl AlertHistory {
    /// Create an in-memory history (tests, no `DATABASE_URL`).
    pub fn memory() -> Self {
        Self {
            backend: HistoryBackend::Memory {
                alerts: Mutex::new(VecDeque::new()),
                next_id: AtomicI64::new(1),
            },
            session_start: Utc::now(),
        }
    }

    /// Create a PostgreSQL-backed history from an existing pool.
    ///
    /// The session boundary is the moment of construction; older rows stay
    /// in the table but are invisible to `recent`.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            backend: HistoryBackend::Postgres(pool),
            session_start: Utc::now(),
        }
    }

    /// When this history session began.
    pub fn session_start(&self) -> DateTime<Utc> {
        self.session_start
    }

    /// Append one dispatched alert.
    pub async fn append(
        &self,
        report: &IncidentReport,
        matched_centers: &[String],
    ) -> Result<AlertEntry, StoreError> {
        match &self.backend {
            HistoryBackend::Postgres(pool) => {
                let report_json =
                    serde_json::to_value(report).unwrap_or(serde_json::Value::Null);
                let row: AlertRow = sqlx::query_as(
                    r#"
                    INSERT INTO alerts (report, matched_centers)
                    VALUES ($1, $2)
                    RETURNING id, report, matched_centers, created_at
                    "#,
                )
                .bind(&report_json)
                .bind(matched_centers)
                .fetch_one(pool)
                .await?;

                // Trim past the retention cap, same as the memory backend.
                sqlx::query(
                    r#"
                    DELETE FROM alerts
                    WHERE id NOT IN (
                        SELECT id FROM alerts
                        ORDER BY created_at DESC, id DESC
                        LIMIT $1
                    )
                    "#,
                )
                .bind(RETENTION as i64)
                .execute(pool)
                .await?;

                Ok(AlertEntry {
                    id: row.id,
                    report: report.clone(),
                    matched_centers: row.matched_centers,
                    created_at: row.created_at,
                })
            }
            HistoryBackend::Memory { alerts, next_id } => {
                let entry = AlertEntry {
                    id: next_id.fetch_add(1, Ordering::Relaxed),
                    report: report.clone(),
                    matched_centers: matched_centers.to_vec(),
                    created_at: Utc::now(),
                };

                let mut alerts = alerts.lock().await;
                alerts.push_back(entry.clone());
                while alerts.len() > RETENTION {
                    alerts.pop_front();
                }
                Ok(entry)
            }
        }
    }

    /// The most recent alerts of this session, newest first, capped at
    /// `limit`. `center` restricts the result to alerts whose matched set
    /// contains that exact name.
    pub async fn recent(
        &self,
        center: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AlertEntry>, StoreError> {
        match &self.backend {
            HistoryBackend::Postgres(pool) => {
                let rows: Vec<AlertRow> = sqlx::query_as(
                    r#"
                    SELECT id, report, matched_centers, created_at
                    FROM alerts
                    WHERE created_at >= $1
                      AND ($2::text IS NULL OR $2 = ANY(matched_centers))
                    ORDER BY created_at DESC, id DESC
                    LIMIT $3
                    "#,
                )
                .bind(self.session_start)
                .bind(center)
                .bind(limit as i64)
                .fetch_all(pool)
                .await?;

                let entries = rows
                    .into_iter()
                    .filter_map(|row| {
                        let report = serde_json::from_value(row.report).ok()?;
                        Some(AlertEntry {
                            id: row.id,
                            report,
                            matched_centers: row.matched_centers,
                            created_at: row.created_at,
                        })
                    })
                    .collect();
                Ok(entries)
            }
            HistoryBackend::Memory { alerts, .. } => {
                let alerts = alerts.lock().await;
                Ok(alerts
                    .iter()
                    .rev()
                    .filter(|a| a.created_at >= self.session_start)
                    .filter(|a| {
                        center
                            .map(|name| a.matched_centers.iter().any(|c| c == name))
                            .unwrap_or(true)
                    })
                    .take(limit)
                    .cloned()
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::{Emotion, ExtractedEntities, IncidentReport};

    fn report(transcript: &str) -> IncidentReport {
        IncidentReport::new(
            transcript,
            Emotion::Panic,
            &ExtractedEntities {
                emergency_type: Some("fire".to_string()),
                location: Some("Springfield".to_string()),
                priority_level: None,
            },
            1,
            "call.wav",
        )
    }

    #[tokio::test]
    async fn test_append_and_recent_newest_first() {
        let history = AlertHistory::memory();
        history.append(&report("first"), &[]).await.unwrap();
        history.append(&report("second"), &[]).await.unwrap();

        let recent = history.recent(None, QUERY_LIMIT).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].report.transcript, "second");
        assert_eq!(recent[1].report.transcript, "first");
    }

    #[tokio::test]
    async fn test_query_limit() {
        let history = AlertHistory::memory();
        for i in 0..30 {
            history
                .append(&report(&format!("alert {i}")), &[])
                .await
                .unwrap();
        }

        let recent = history.recent(None, QUERY_LIMIT).await.unwrap();
        assert_eq!(recent.len(), QUERY_LIMIT);
        assert_eq!(recent[0].report.transcript, "alert 29");
    }

    #[tokio::test]
    async fn test_retention_cap() {
        let history = AlertHistory::memory();
        for i in 0..150 {
            history
                .append(&report(&format!("alert {i}")), &[])
                .await
                .unwrap();
        }

        // Oldest entries are evicted past the retention cap.
        let all = history.recent(None, RETENTION * 2).await.unwrap();
        assert_eq!(all.len(), RETENTION);
        assert_eq!(all.last().unwrap().report.transcript, "alert 50");
    }

    #[tokio::test]
    async fn test_session_scoping_hides_older_records() {
        let mut history = AlertHistory::memory();
        let old = history.append(&report("before restart"), &[]).await.unwrap();

        // A restart keeps the stored rows but moves the session boundary
        // past them.
        history.session_start = old.created_at + chrono::Duration::nanoseconds(1);
        history.append(&report("after restart"), &[]).await.unwrap();

        let recent = history.recent(None, QUERY_LIMIT).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].report.transcript, "after restart");
    }

    #[tokio::test]
    async fn test_center_filter_matches_exact_name() {
        let history = AlertHistory::memory();
        history
            .append(&report("fire"), &["Central".to_string()])
            .await
            .unwrap();
        history
            .append(&report("crash"), &["North".to_string(), "Central".to_string()])
            .await
            .unwrap();
        history.append(&report("unrouted"), &[]).await.unwrap();

        let central = history.recent(Some("Central"), QUERY_LIMIT).await.unwrap();
        assert_eq!(central.len(), 2);

        let north = history.recent(Some("North"), QUERY_LIMIT).await.unwrap();
        assert_eq!(north.len(), 1);
        assert_eq!(north[0].report.transcript, "crash");

        // Exact name, not case-insensitive.
        assert!(history
            .recent(Some("central"), QUERY_LIMIT)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_matched_centers_are_logged() {
        let history = AlertHistory::memory();
        let entry = history
            .append(&report("fire"), &["Central".to_string(), "North".to_string()])
            .await
            .unwrap();
        assert_eq!(entry.matched_centers.len(), 2);
    }
}
