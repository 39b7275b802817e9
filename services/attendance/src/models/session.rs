//! Session model and related functionality

use crate::error::ValidationError;
use crate::validation::{validate_code, validate_duration};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of event a session tracks attendance for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Workshop,
    Seminar,
    WorkingGroup,
    Social,
}

impl EventCategory {
    /// Stable identifier used in storage and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Workshop => "workshop",
            EventCategory::Seminar => "seminar",
            EventCategory::WorkingGroup => "working_group",
            EventCategory::Social => "social",
        }
    }

    /// Parse a stored identifier back into a category
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "workshop" => Some(EventCategory::Workshop),
            "seminar" => Some(EventCategory::Seminar),
            "working_group" => Some(EventCategory::WorkingGroup),
            "social" => Some(EventCategory::Social),
            _ => None,
        }
    }

    /// Human-readable name shown in summary views
    pub fn label(&self) -> &'static str {
        match self {
            EventCategory::Workshop => "Workshop",
            EventCategory::Seminar => "Seminar",
            EventCategory::WorkingGroup => "Working Group",
            EventCategory::Social => "Social",
        }
    }
}

/// Where the session's public summary message lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayLocator {
    pub channel_id: String,
    pub message_id: String,
}

/// Attendance session entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub category: EventCategory,
    pub code: String,
    pub created_by: String,
    pub locator: DisplayLocator,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session accepts sign-ins strictly before its expiry instant
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// New session creation payload
#[derive(Debug, Clone)]
pub struct NewSession {
    pub category: EventCategory,
    pub code: String,
    pub created_by: String,
    pub locator: DisplayLocator,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewSession {
    /// Validate the inputs and stamp the expiry instant from the duration
    pub fn new(
        category: EventCategory,
        code: String,
        duration_minutes: i64,
        created_by: String,
        locator: DisplayLocator,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_duration(duration_minutes)?;
        validate_code(&code)?;

        Ok(Self {
            category,
            code,
            created_by,
            locator,
            created_at: now,
            expires_at: now + Duration::minutes(duration_minutes),
        })
    }
}
