//! Sign-in record models

use super::session::EventCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One member's recorded sign-in for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: String,
    pub display_name: String,
    pub submitted_at: DateTime<Utc>,
}

/// New sign-in payload
#[derive(Debug, Clone)]
pub struct NewSignIn {
    pub session_id: Uuid,
    pub user_id: String,
    pub display_name: String,
    pub submitted_at: DateTime<Utc>,
}

/// Per-category attendance total for one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: EventCategory,
    pub count: i64,
}
