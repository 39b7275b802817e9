//! Session storage
//!
//! One trait covers everything the engine persists. Postgres backs
//! production; an in-memory table backs tests and local development.

pub mod memory;
pub mod postgres;

// Re-export for convenience
pub use memory::MemorySessionRepository;
pub use postgres::{PgSessionRepository, init_schema};

use crate::models::{CategoryCount, NewSession, NewSignIn, Session, SignInRecord};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Result of a sign-in insert attempt
#[derive(Debug, Clone)]
pub enum SignInInsert {
    /// The pair was new and the record was stored
    Recorded(SignInRecord),
    /// The member had already signed in for this session
    Duplicate,
}

/// Storage backend for sessions and their sign-ins
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session and return it with its assigned id
    async fn create_session(&self, new_session: NewSession) -> Result<Session>;

    /// Fetch a session by id
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;

    /// Sessions whose expiry instant falls after the cutoff, open or not
    async fn sessions_expiring_after(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>>;

    /// Insert a sign-in unless the (session, member) pair already exists
    ///
    /// Deduplication is atomic in the store, so concurrent submissions
    /// of the same pair yield exactly one `Recorded`.
    async fn insert_sign_in(&self, new_sign_in: NewSignIn) -> Result<SignInInsert>;

    /// Number of sign-ins recorded for a session
    async fn count_sign_ins(&self, session_id: Uuid) -> Result<i64>;

    /// All sign-ins for a session, oldest first
    async fn list_sign_ins(&self, session_id: Uuid) -> Result<Vec<SignInRecord>>;

    /// Per-category totals for one member across all sessions
    async fn attendance_history(&self, user_id: &str) -> Result<Vec<CategoryCount>>;
}
