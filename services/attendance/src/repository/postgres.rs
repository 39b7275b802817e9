//! PostgreSQL-backed session storage

use super::{SessionRepository, SignInInsert};
use crate::models::{
    CategoryCount, DisplayLocator, EventCategory, NewSession, NewSignIn, Session, SignInRecord,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

/// Create the attendance tables if they do not exist yet
///
/// The unique constraint on (session_id, user_id) is what makes sign-in
/// deduplication atomic under concurrency.
pub async fn init_schema(pool: &PgPool) -> DatabaseResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_sessions (
            id UUID PRIMARY KEY,
            category TEXT NOT NULL,
            code TEXT NOT NULL,
            created_by TEXT NOT NULL,
            channel_id TEXT NOT NULL,
            message_id TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(DatabaseError::Schema)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_sign_ins (
            id UUID PRIMARY KEY,
            session_id UUID NOT NULL REFERENCES attendance_sessions(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            submitted_at TIMESTAMPTZ NOT NULL,
            UNIQUE (session_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(DatabaseError::Schema)?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_attendance_sign_ins_user_id
        ON attendance_sign_ins (user_id)
        "#,
    )
    .execute(pool)
    .await
    .map_err(DatabaseError::Schema)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verified_members (
            user_id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT,
            verified_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(DatabaseError::Schema)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_metrics (
            id BIGSERIAL PRIMARY KEY,
            member_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            category TEXT NOT NULL,
            session_id UUID NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(DatabaseError::Schema)?;

    info!("Attendance schema is in place");

    Ok(())
}

const SESSION_COLUMNS: &str =
    "id, category, code, created_by, channel_id, message_id, created_at, expires_at";

fn session_from_row(row: &PgRow) -> Result<Session> {
    let category: String = row.get("category");
    let category = EventCategory::parse(&category)
        .ok_or_else(|| anyhow::anyhow!("Unknown event category in storage: {}", category))?;

    Ok(Session {
        id: row.get("id"),
        category,
        code: row.get("code"),
        created_by: row.get("created_by"),
        locator: DisplayLocator {
            channel_id: row.get("channel_id"),
            message_id: row.get("message_id"),
        },
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    })
}

fn record_from_row(row: &PgRow) -> SignInRecord {
    SignInRecord {
        id: row.get("id"),
        session_id: row.get("session_id"),
        user_id: row.get("user_id"),
        display_name: row.get("display_name"),
        submitted_at: row.get("submitted_at"),
    }
}

/// PostgreSQL implementation of the session store
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new repository over a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create_session(&self, new_session: NewSession) -> Result<Session> {
        let row = sqlx::query(
            r#"
            INSERT INTO attendance_sessions
                (id, category, code, created_by, channel_id, message_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, category, code, created_by, channel_id, message_id, created_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_session.category.as_str())
        .bind(&new_session.code)
        .bind(&new_session.created_by)
        .bind(&new_session.locator.channel_id)
        .bind(&new_session.locator.message_id)
        .bind(new_session.created_at)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await?;

        let session = session_from_row(&row)?;
        info!("Created attendance session {}", session.id);

        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM attendance_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn sessions_expiring_after(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM attendance_sessions WHERE expires_at > $1 ORDER BY expires_at",
            SESSION_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(session_from_row).collect()
    }

    async fn insert_sign_in(&self, new_sign_in: NewSignIn) -> Result<SignInInsert> {
        // ON CONFLICT DO NOTHING returns no row for a duplicate pair
        let row = sqlx::query(
            r#"
            INSERT INTO attendance_sign_ins (id, session_id, user_id, display_name, submitted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (session_id, user_id) DO NOTHING
            RETURNING id, session_id, user_id, display_name, submitted_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_sign_in.session_id)
        .bind(&new_sign_in.user_id)
        .bind(&new_sign_in.display_name)
        .bind(new_sign_in.submitted_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(SignInInsert::Recorded(record_from_row(&row))),
            None => Ok(SignInInsert::Duplicate),
        }
    }

    async fn count_sign_ins(&self, session_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS sign_in_count FROM attendance_sign_ins WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("sign_in_count"))
    }

    async fn list_sign_ins(&self, session_id: Uuid) -> Result<Vec<SignInRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, user_id, display_name, submitted_at
            FROM attendance_sign_ins
            WHERE session_id = $1
            ORDER BY submitted_at, id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn attendance_history(&self, user_id: &str) -> Result<Vec<CategoryCount>> {
        let rows = sqlx::query(
            r#"
            SELECT s.category AS category, COUNT(*) AS sign_in_count
            FROM attendance_sign_ins si
            JOIN attendance_sessions s ON s.id = si.session_id
            WHERE si.user_id = $1
            GROUP BY s.category
            ORDER BY s.category
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let category: String = row.get("category");
                let category = EventCategory::parse(&category).ok_or_else(|| {
                    anyhow::anyhow!("Unknown event category in storage: {}", category)
                })?;
                Ok(CategoryCount {
                    category,
                    count: row.get("sign_in_count"),
                })
            })
            .collect()
    }
}
