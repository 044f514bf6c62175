//! Storage layer for the alert-routing engine.
//!
//! Three stores back the engine: the fingerprint store (dedup cache of
//! analysis results keyed by content hash), the center registry (response
//! centers and their push subscriptions) and the alert history (append-only
//! session log). Each store runs against PostgreSQL when `DATABASE_URL` is
//! set and falls back to a process-local in-memory backend otherwise, which
//! is also what the integration tests use.

pub mod fingerprint;
pub mod history;
pub mod registry;

pub use fingerprint::{AnalysisRecord, FingerprintStore};
pub use history::{AlertEntry, AlertHistory};
pub use registry::{Center, CenterRegistry, NewCenter, Subscription};

use std::sync::Arc;

use dashmap::DashMap;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::Mutex;

/// Storage layer error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the database
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Failed to run migrations
    #[error("Database migration error: {0}")]
    Migration(String),

    /// A center with this name is already registered
    #[error("A center named '{0}' already exists")]
    DuplicateName(String),

    /// Underlying database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Connect to PostgreSQL and apply embedded migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    tracing::info!("Database connected and migrations applied");

    Ok(pool)
}

/// Per-fingerprint async locks serializing first-seen analysis.
///
/// Two concurrent submissions of identical bytes race on the same hash; the
/// loser of the lock finds the winner's cached record and never re-runs the
/// analysis collaborators. Distinct hashes never contend.
#[derive(Default)]
pub struct HashLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl HashLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock guarding one content hash.
    pub fn lock_for(&self, content_hash: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(content_hash.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_locks_same_hash_same_lock() {
        let locks = HashLocks::new();
        let a = locks.lock_for("abc");
        let b = locks.lock_for("abc");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_hash_locks_distinct_hashes_independent() {
        let locks = HashLocks::new();
        let a = locks.lock_for("abc");
        let b = locks.lock_for("def");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_hash_lock_serializes() {
        let locks = HashLocks::new();
        let lock = locks.lock_for("abc");
        let guard = lock.lock().await;
        let second = locks.lock_for("abc");
        assert!(second.try_lock().is_err());
        drop(guard);
        assert!(second.try_lock().is_ok());
    }
}
