//! Center registry: response centers and their push subscriptions.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sqlx::error::ErrorKind;
use sqlx::{FromRow, PgPool};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::StoreError;

/// A registered response center.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Center {
    pub id: Uuid,
    pub name: String,
    /// City or locality the center covers
    pub location: String,
    /// State or region the center covers
    pub state: String,
    pub center_type: String,
    pub registered_at: DateTime<Utc>,
}

/// Input for registering a new center.
#[derive(Debug, Clone)]
pub struct NewCenter {
    pub name: String,
    pub location: String,
    pub state: String,
    pub center_type: String,
}

/// A push subscription bound to one center. An endpoint belongs to at most
/// one center; re-subscribing moves it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub endpoint: String,
    pub center_name: String,
    /// Opaque delivery credentials, stored as the client sent them
    pub credentials: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Registry of response centers and their subscriptions.
pub enum CenterRegistry {
    Postgres(PgPool),
    Memory {
        centers: Mutex<Vec<Center>>,
        subscriptions: DashMap<String, Subscription>,
    },
}

impl CenterRegistry {
    /// Create an in-memory registry (tests, no `DATABASE_URL`).
    pub fn memory() -> Self {
        Self::Memory {
            centers: Mutex::new(Vec::new()),
            subscriptions: DashMap::new(),
        }
    }

    /// Create a PostgreSQL-backed registry from an existing pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }

    /// Register a new center. Names are unique case-insensitively.
    pub async fn register(&self, input: NewCenter) -> Result<Center, StoreError> {
        let center = Center {
            id: Uuid::new_v4(),
            name: input.name,
            location: input.location,
            state: input.state,
            center_type: input.center_type,
            registered_at: Utc::now(),
        };

        match self {
            Self::Postgres(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO centers (id, name, location, state, center_type, registered_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(center.id)
                .bind(&center.name)
                .bind(&center.location)
                .bind(&center.state)
                .bind(&center.center_type)
                .bind(center.registered_at)
                .execute(pool)
                .await
                .map_err(|e| match &e {
                    sqlx::Error::Database(db) if db.kind() == ErrorKind::UniqueViolation => {
                        StoreError::DuplicateName(center.name.clone())
                    }
                    _ => StoreError::Sqlx(e),
                })?;

                tracing::info!(center = %center.name, "Registered response center");
                Ok(center)
            }
            Self::Memory { centers, .. } => {
                // Same folding as the LOWER(name) unique index in Postgres.
                let folded = center.name.to_lowercase();
                let mut centers = centers.lock().await;
                if centers.iter().any(|c| c.name.to_lowercase() == folded) {
                    return Err(StoreError::DuplicateName(center.name));
                }
                centers.push(center.clone());
                Ok(center)
            }
        }
    }

    /// List all centers in registration order.
    pub async fn list(&self) -> Result<Vec<Center>, StoreError> {
        match self {
            Self::Postgres(pool) => {
                let centers: Vec<Center> = sqlx::query_as(
                    r#"
                    SELECT id, name, location, state, center_type, registered_at
                    FROM centers
                    ORDER BY seq
                    "#,
                )
                .fetch_all(pool)
                .await?;
                Ok(centers)
            }
            Self::Memory { centers, .. } => Ok(centers.lock().await.clone()),
        }
    }

    /// Store a subscription, keyed by endpoint. Re-subscribing an existing
    /// endpoint rebinds it to the new center.
    pub async fn subscribe(
        &self,
        center_name: &str,
        endpoint: &str,
        credentials: serde_json::Value,
    ) -> Result<Subscription, StoreError> {
        let subscription = Subscription {
            endpoint: endpoint.to_string(),
            center_name: center_name.to_string(),
            credentials,
            created_at: Utc::now(),
        };

        match self {
            Self::Postgres(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO subscriptions (endpoint, center_name, credentials, created_at)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (endpoint) DO UPDATE SET
                        center_name = EXCLUDED.center_name,
                        credentials = EXCLUDED.credentials
                    "#,
                )
                .bind(&subscription.endpoint)
                .bind(&subscription.center_name)
                .bind(&subscription.credentials)
                .bind(subscription.created_at)
                .execute(pool)
                .await?;

                tracing::debug!(center = %center_name, "Stored push subscription");
                Ok(subscription)
            }
            Self::Memory { subscriptions, .. } => {
                subscriptions.insert(subscription.endpoint.clone(), subscription.clone());
                Ok(subscription)
            }
        }
    }

    /// Subscriptions bound to one center.
    pub async fn subscriptions_for(
        &self,
        center_name: &str,
    ) -> Result<Vec<Subscription>, StoreError> {
        match self {
            Self::Postgres(pool) => {
                let subs: Vec<Subscription> = sqlx::query_as(
                    r#"
                    SELECT endpoint, center_name, credentials, created_at
                    FROM subscriptions
                    WHERE center_name = $1
                    ORDER BY created_at
                    "#,
                )
                .bind(center_name)
                .fetch_all(pool)
                .await?;
                Ok(subs)
            }
            Self::Memory { subscriptions, .. } => {
                let mut subs: Vec<Subscription> = subscriptions
                    .iter()
                    .filter(|e| e.value().center_name == center_name)
                    .map(|e| e.value().clone())
                    .collect();
                subs.sort_by_key(|s| s.created_at);
                Ok(subs)
            }
        }
    }

    /// Drop a subscription whose endpoint is gone. Returns whether a row was
    /// removed.
    pub async fn remove_subscription(&self, endpoint: &str) -> Result<bool, StoreError> {
        match self {
            Self::Postgres(pool) => {
                let result = sqlx::query("DELETE FROM subscriptions WHERE endpoint = $1")
                    .bind(endpoint)
                    .execute(pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
            Self::Memory { subscriptions, .. } => Ok(subscriptions.remove(endpoint).is_some()),
        }
    }

    /// Count registered centers.
    pub async fn count(&self) -> Result<i64, StoreError> {
        match self {
            Self::Postgres(pool) => {
                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM centers")
                    .fetch_one(pool)
                    .await?;
                Ok(count)
            }
            Self::Memory { centers, .. } => Ok(centers.lock().await.len() as i64),
        }
    }
}
