//! Summary view rendering and synchronization
//!
//! The summary is a public message mirroring a session's roster. Pushes
//! are best effort: a failed edit is logged and dropped, and the next
//! successful push repaints the whole state.

use crate::clock::Clock;
use crate::display::{DisplaySurface, SummaryContent};
use crate::models::{Session, SignInRecord};
use crate::repository::SessionRepository;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Placeholder shown while nobody has signed in
const EMPTY_ROSTER: &str = "No one yet";
/// Call to action shown while the session accepts sign-ins
const OPEN_NOTE: &str = "Sign in below to mark your attendance for this event!";
/// Note shown once sign-ins are closed
const CLOSED_NOTE: &str = "Sign-ins are now closed.";

/// Keeps the public summary message in step with recorded sign-ins
pub struct SummaryViewSynchronizer {
    repository: Arc<dyn SessionRepository>,
    surface: Arc<dyn DisplaySurface>,
    clock: Arc<dyn Clock>,
    mention_budget: usize,
}

impl SummaryViewSynchronizer {
    /// Create a synchronizer over a store and a display surface
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        surface: Arc<dyn DisplaySurface>,
        clock: Arc<dyn Clock>,
        mention_budget: usize,
    ) -> Self {
        Self {
            repository,
            surface,
            clock,
            mention_budget,
        }
    }

    /// Re-render the summary after a change in sign-ins
    ///
    /// Renders the open or closed variant depending on whether the
    /// session is still open. Failures are logged, never surfaced.
    pub async fn refresh(&self, session_id: Uuid) {
        if let Err(e) = self.push(session_id, false).await {
            warn!("Summary refresh for session {} failed: {}", session_id, e);
        }
    }

    /// Render the closed state and disable the sign-in control
    ///
    /// Idempotent: closing an already-closed summary repaints the same
    /// content.
    pub async fn close(&self, session_id: Uuid) {
        if let Err(e) = self.push(session_id, true).await {
            warn!("Summary close for session {} failed: {}", session_id, e);
        }
    }

    async fn push(&self, session_id: Uuid, force_closed: bool) -> anyhow::Result<()> {
        let Some(session) = self.repository.get_session(session_id).await? else {
            warn!("Session {} has no stored row, skipping summary push", session_id);
            return Ok(());
        };

        let records = self.repository.list_sign_ins(session_id).await?;
        let closed = force_closed || !session.is_open(self.clock.now());
        let content = if closed {
            render_closed(&session, &records, self.mention_budget)
        } else {
            render_summary(&session, &records, self.mention_budget)
        };

        let handle = self.surface.fetch(&session.locator).await?;
        self.surface.edit(&handle, &content).await?;

        Ok(())
    }
}

/// Render the open-session summary
pub fn render_summary(
    session: &Session,
    records: &[SignInRecord],
    mention_budget: usize,
) -> SummaryContent {
    SummaryContent {
        body: render_body(session, records, mention_budget, OPEN_NOTE),
        sign_in_enabled: true,
    }
}

/// Render the closed-session summary
pub fn render_closed(
    session: &Session,
    records: &[SignInRecord],
    mention_budget: usize,
) -> SummaryContent {
    SummaryContent {
        body: render_body(session, records, mention_budget, CLOSED_NOTE),
        sign_in_enabled: false,
    }
}

fn render_body(
    session: &Session,
    records: &[SignInRecord],
    mention_budget: usize,
    note: &str,
) -> String {
    format!(
        "**{} - Sign-In**\n{}\nCloses: <t:{}:R>\n\nSigned In: {}\nWho's Here: {}",
        session.category.label(),
        note,
        session.expires_at.timestamp(),
        records.len(),
        mention_roster(records, mention_budget),
    )
}

/// Space-separated mention list, truncated to the character budget
///
/// When the full roster would overflow, mentions are kept in submission
/// order until the next one no longer fits, and the tail is summarized
/// as a count.
pub fn mention_roster(records: &[SignInRecord], budget: usize) -> String {
    if records.is_empty() {
        return EMPTY_ROSTER.to_string();
    }

    let full = records
        .iter()
        .map(|r| format!("<@{}>", r.user_id))
        .collect::<Vec<_>>()
        .join(" ");
    if full.len() <= budget {
        return full;
    }

    let mut kept = String::new();
    let mut shown = 0;
    for record in records {
        let mention = format!("<@{}> ", record.user_id);
        if kept.len() + mention.len() > budget {
            break;
        }
        kept.push_str(&mention);
        shown += 1;
    }

    format!("{}... and {} more", kept.trim_end(), records.len() - shown)
}
