//! Long-term attendance metrics

use crate::models::EventCategory;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

/// Sink for per-sign-in attendance measurements
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Record one sign-in
    ///
    /// Implementations decide whether the member is eligible. Callers
    /// run this off the submission path and only log failures.
    async fn record(
        &self,
        category: EventCategory,
        user_id: &str,
        display_name: &str,
        session_id: Uuid,
        recorded_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Sink that drops every measurement
pub struct NullMetricsSink;

#[async_trait]
impl MetricsSink for NullMetricsSink {
    async fn record(
        &self,
        _category: EventCategory,
        _user_id: &str,
        _display_name: &str,
        _session_id: Uuid,
        _recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        Ok(())
    }
}

/// PostgreSQL-backed sink keyed by the member's verified email
///
/// Measurements are attributed to the local part of the verified email.
/// Unverified members are skipped: without an email there is no stable
/// identity to attribute the measurement to.
pub struct PgMetricsSink {
    pool: PgPool,
}

impl PgMetricsSink {
    /// Create a new sink over a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricsSink for PgMetricsSink {
    async fn record(
        &self,
        category: EventCategory,
        user_id: &str,
        display_name: &str,
        session_id: Uuid,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        let row = sqlx::query("SELECT email FROM verified_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            debug!("Skipping attendance metric for unverified member {}", user_id);
            return Ok(());
        };

        let email: String = row.get("email");
        let member_id = match email.split_once('@') {
            Some((local, _)) => local.to_string(),
            None => email,
        };

        sqlx::query(
            r#"
            INSERT INTO attendance_metrics
                (member_id, display_name, category, session_id, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&member_id)
        .bind(display_name)
        .bind(category.as_str())
        .bind(session_id)
        .bind(recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
