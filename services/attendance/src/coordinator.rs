//! Sign-in submission pipeline

use crate::clock::Clock;
use crate::metrics::MetricsSink;
use crate::models::{CategoryCount, NewSignIn, Session, SignInRecord};
use crate::repository::{SessionRepository, SignInInsert};
use crate::summary::SummaryViewSynchronizer;
use crate::verification::VerificationGate;
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Outcome of a sign-in submission
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The sign-in was recorded
    Success {
        /// Sign-ins now recorded for the session, this one included
        total: i64,
        /// The member's all-time per-category attendance
        history: Vec<CategoryCount>,
    },
    /// No session with the given id exists
    SessionNotFound,
    /// The session's expiry instant has passed
    SessionExpired,
    /// The member has not verified their account
    VerificationRequired,
    /// The submitted code does not match the session code
    InvalidCode,
    /// The member already signed in for this session
    AlreadySignedIn,
}

/// Outcome of an operator-recorded sign-in
#[derive(Debug, Clone)]
pub enum ManualRecordOutcome {
    /// The sign-in was recorded
    Recorded { total: i64 },
    /// No session with the given id exists
    SessionNotFound,
    /// The member already signed in for this session
    AlreadySignedIn,
}

/// Orchestrates sign-in submissions end to end
pub struct SignInCoordinator {
    repository: Arc<dyn SessionRepository>,
    gate: Arc<dyn VerificationGate>,
    synchronizer: Arc<SummaryViewSynchronizer>,
    metrics: Arc<dyn MetricsSink>,
    clock: Arc<dyn Clock>,
    require_verification: bool,
}

impl SignInCoordinator {
    /// Create a coordinator over its collaborators
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        gate: Arc<dyn VerificationGate>,
        synchronizer: Arc<SummaryViewSynchronizer>,
        metrics: Arc<dyn MetricsSink>,
        clock: Arc<dyn Clock>,
        require_verification: bool,
    ) -> Self {
        Self {
            repository,
            gate,
            synchronizer,
            metrics,
            clock,
            require_verification,
        }
    }

    /// Validate and record one sign-in submission
    ///
    /// Checks run in a fixed order and the first failure names its
    /// outcome. `Err` is reserved for infrastructure failures.
    pub async fn submit(
        &self,
        session_id: Uuid,
        user_id: &str,
        display_name: &str,
        code: &str,
    ) -> Result<SubmitOutcome> {
        let Some(session) = self.repository.get_session(session_id).await? else {
            return Ok(SubmitOutcome::SessionNotFound);
        };

        let now = self.clock.now();
        if !session.is_open(now) {
            return Ok(SubmitOutcome::SessionExpired);
        }

        if self.require_verification && !self.gate.is_verified(user_id).await? {
            return Ok(SubmitOutcome::VerificationRequired);
        }

        // Codes compare exactly, no trimming or case folding
        if code != session.code {
            return Ok(SubmitOutcome::InvalidCode);
        }

        let insert = self
            .repository
            .insert_sign_in(NewSignIn {
                session_id,
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
                submitted_at: now,
            })
            .await?;

        let record = match insert {
            SignInInsert::Recorded(record) => record,
            SignInInsert::Duplicate => return Ok(SubmitOutcome::AlreadySignedIn),
        };

        let total = self.repository.count_sign_ins(session_id).await?;
        let history = self.repository.attendance_history(user_id).await?;

        info!(
            "Recorded sign-in for member {} on session {} ({} total)",
            user_id, session_id, total
        );
        self.spawn_projections(&session, record);

        Ok(SubmitOutcome::Success { total, history })
    }

    /// Record a sign-in on a member's behalf
    ///
    /// Operator path for fixing attendance after the fact: the code and
    /// expiry checks are skipped, but the session must exist and
    /// duplicates are still rejected.
    pub async fn record_manual(
        &self,
        session_id: Uuid,
        user_id: &str,
        display_name: &str,
    ) -> Result<ManualRecordOutcome> {
        let Some(session) = self.repository.get_session(session_id).await? else {
            return Ok(ManualRecordOutcome::SessionNotFound);
        };

        let insert = self
            .repository
            .insert_sign_in(NewSignIn {
                session_id,
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
                submitted_at: self.clock.now(),
            })
            .await?;

        let record = match insert {
            SignInInsert::Recorded(record) => record,
            SignInInsert::Duplicate => return Ok(ManualRecordOutcome::AlreadySignedIn),
        };

        let total = self.repository.count_sign_ins(session_id).await?;

        info!(
            "Manually recorded sign-in for member {} on session {}",
            user_id, session_id
        );
        self.spawn_projections(&session, record);

        Ok(ManualRecordOutcome::Recorded { total })
    }

    /// Push the view refresh and the metric write off the caller's path
    ///
    /// Both are fire-and-forget: the sign-in is already durable and
    /// neither failure can undo it.
    fn spawn_projections(&self, session: &Session, record: SignInRecord) {
        let synchronizer = self.synchronizer.clone();
        let session_id = session.id;
        tokio::spawn(async move {
            synchronizer.refresh(session_id).await;
        });

        let metrics = self.metrics.clone();
        let category = session.category;
        tokio::spawn(async move {
            if let Err(e) = metrics
                .record(
                    category,
                    &record.user_id,
                    &record.display_name,
                    record.session_id,
                    record.submitted_at,
                )
                .await
            {
                error!(
                    "Attendance metric write for member {} failed: {}",
                    record.user_id, e
                );
            }
        });
    }
}
