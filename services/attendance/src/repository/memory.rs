//! In-memory session storage for tests and local development

use super::{SessionRepository, SignInInsert};
use crate::models::{CategoryCount, EventCategory, NewSession, NewSignIn, Session, SignInRecord};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    sessions: HashMap<Uuid, Session>,
    sign_ins: Vec<SignInRecord>,
    seen: HashSet<(Uuid, String)>,
}

/// Hash-map implementation of the session store
///
/// Sign-in deduplication happens inside a single mutex acquisition,
/// mirroring the unique-constraint behavior of the Postgres backend.
#[derive(Default)]
pub struct MemorySessionRepository {
    tables: Mutex<Tables>,
}

impl MemorySessionRepository {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create_session(&self, new_session: NewSession) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            category: new_session.category,
            code: new_session.code,
            created_by: new_session.created_by,
            locator: new_session.locator,
            created_at: new_session.created_at,
            expires_at: new_session.expires_at,
        };

        let mut tables = self.tables.lock().await;
        tables.sessions.insert(session.id, session.clone());

        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.get(&id).cloned())
    }

    async fn sessions_expiring_after(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>> {
        let tables = self.tables.lock().await;
        let mut sessions: Vec<Session> = tables
            .sessions
            .values()
            .filter(|s| s.expires_at > cutoff)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.expires_at);

        Ok(sessions)
    }

    async fn insert_sign_in(&self, new_sign_in: NewSignIn) -> Result<SignInInsert> {
        let mut tables = self.tables.lock().await;

        if !tables.sessions.contains_key(&new_sign_in.session_id) {
            anyhow::bail!("Session {} does not exist", new_sign_in.session_id);
        }

        let key = (new_sign_in.session_id, new_sign_in.user_id.clone());
        if !tables.seen.insert(key) {
            return Ok(SignInInsert::Duplicate);
        }

        let record = SignInRecord {
            id: Uuid::new_v4(),
            session_id: new_sign_in.session_id,
            user_id: new_sign_in.user_id,
            display_name: new_sign_in.display_name,
            submitted_at: new_sign_in.submitted_at,
        };
        tables.sign_ins.push(record.clone());

        Ok(SignInInsert::Recorded(record))
    }

    async fn count_sign_ins(&self, session_id: Uuid) -> Result<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .sign_ins
            .iter()
            .filter(|r| r.session_id == session_id)
            .count();

        Ok(count as i64)
    }

    async fn list_sign_ins(&self, session_id: Uuid) -> Result<Vec<SignInRecord>> {
        let tables = self.tables.lock().await;
        let mut records: Vec<SignInRecord> = tables
            .sign_ins
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.submitted_at, r.id));

        Ok(records)
    }

    async fn attendance_history(&self, user_id: &str) -> Result<Vec<CategoryCount>> {
        let tables = self.tables.lock().await;

        // Same order the Postgres backend produces: alphabetical on the
        // stored category identifier.
        let mut history = Vec::new();
        for category in [
            EventCategory::Seminar,
            EventCategory::Social,
            EventCategory::WorkingGroup,
            EventCategory::Workshop,
        ] {
            let count = tables
                .sign_ins
                .iter()
                .filter(|r| r.user_id == user_id)
                .filter(|r| {
                    tables
                        .sessions
                        .get(&r.session_id)
                        .is_some_and(|s| s.category == category)
                })
                .count() as i64;
            if count > 0 {
                history.push(CategoryCount { category, count });
            }
        }

        Ok(history)
    }
}
