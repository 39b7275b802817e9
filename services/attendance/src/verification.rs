//! Verified-member lookup and linking

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Gate consulted before a sign-in is accepted
#[async_trait]
pub trait VerificationGate: Send + Sync {
    /// Whether the member has completed verification
    async fn is_verified(&self, user_id: &str) -> Result<bool>;
}

/// Result of linking a member to an email
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedUpsert {
    /// The member is now linked to the email
    Linked,
    /// The email already belongs to a different member
    EmailTaken,
}

/// Directory of verified members
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Link a member to an email
    ///
    /// A member may re-verify and update their own link; an email held
    /// by a different member is rejected as `EmailTaken`.
    async fn mark_verified(
        &self,
        user_id: &str,
        email: &str,
        full_name: Option<&str>,
        verified_at: DateTime<Utc>,
    ) -> Result<VerifiedUpsert>;

    /// Email the member verified with, if any
    async fn member_email(&self, user_id: &str) -> Result<Option<String>>;
}

/// PostgreSQL-backed member directory
#[derive(Clone)]
pub struct PgMemberDirectory {
    pool: PgPool,
}

impl PgMemberDirectory {
    /// Create a new directory over a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationGate for PgMemberDirectory {
    async fn is_verified(&self, user_id: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM verified_members WHERE user_id = $1) AS verified",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("verified"))
    }
}

#[async_trait]
impl MemberDirectory for PgMemberDirectory {
    async fn mark_verified(
        &self,
        user_id: &str,
        email: &str,
        full_name: Option<&str>,
        verified_at: DateTime<Utc>,
    ) -> Result<VerifiedUpsert> {
        // Re-verification by the same member updates their row. An email
        // held by someone else trips the unique index instead.
        let result = sqlx::query(
            r#"
            INSERT INTO verified_members (user_id, email, full_name, verified_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET email = EXCLUDED.email,
                full_name = EXCLUDED.full_name,
                verified_at = EXCLUDED.verified_at
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(full_name)
        .bind(verified_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(VerifiedUpsert::Linked),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(VerifiedUpsert::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn member_email(&self, user_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT email FROM verified_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("email")))
    }
}

/// In-memory member directory for tests
///
/// Keeps only the member-to-email link.
#[derive(Default)]
pub struct MemoryMemberDirectory {
    members: Mutex<HashMap<String, String>>,
}

impl MemoryMemberDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationGate for MemoryMemberDirectory {
    async fn is_verified(&self, user_id: &str) -> Result<bool> {
        let members = self.members.lock().await;
        Ok(members.contains_key(user_id))
    }
}

#[async_trait]
impl MemberDirectory for MemoryMemberDirectory {
    async fn mark_verified(
        &self,
        user_id: &str,
        email: &str,
        _full_name: Option<&str>,
        _verified_at: DateTime<Utc>,
    ) -> Result<VerifiedUpsert> {
        let mut members = self.members.lock().await;

        let taken = members
            .iter()
            .any(|(uid, em)| em == email && uid != user_id);
        if taken {
            return Ok(VerifiedUpsert::EmailTaken);
        }

        members.insert(user_id.to_string(), email.to_string());
        Ok(VerifiedUpsert::Linked)
    }

    async fn member_email(&self, user_id: &str) -> Result<Option<String>> {
        let members = self.members.lock().await;
        Ok(members.get(user_id).cloned())
    }
}
