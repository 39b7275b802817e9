//! One-shot closure timers for sessions
//!
//! Timers are process-local: they hold the session id and nothing else,
//! with the repository staying the source of truth. `recover` rebuilds
//! them from storage after a restart.

use crate::clock::Clock;
use crate::models::Session;
use crate::repository::SessionRepository;
use crate::summary::SummaryViewSynchronizer;
use anyhow::Result;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Schedules the closing of sessions at their expiry instant
pub struct SessionScheduler {
    repository: Arc<dyn SessionRepository>,
    synchronizer: Arc<SummaryViewSynchronizer>,
    clock: Arc<dyn Clock>,
    recovery_window: Duration,
    timers: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl SessionScheduler {
    /// Create a scheduler with the given restart recovery window
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        synchronizer: Arc<SummaryViewSynchronizer>,
        clock: Arc<dyn Clock>,
        recovery_window: Duration,
    ) -> Self {
        Self {
            repository,
            synchronizer,
            clock,
            recovery_window,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Arm a one-shot timer that closes the session at its expiry instant
    ///
    /// A session already past its expiry is closed before this call
    /// returns, without arming a timer.
    pub async fn schedule_close(&self, session: &Session) {
        let session_id = session.id;
        let delay = session.expires_at - self.clock.now();

        if delay <= Duration::zero() {
            info!("Session {} already expired, closing now", session_id);
            self.synchronizer.close(session_id).await;
            return;
        }

        let mut timers = self.timers.lock().await;
        if timers.contains_key(&session_id) {
            warn!("Closure timer for session {} is already armed", session_id);
            return;
        }

        let sleep = delay.to_std().unwrap_or_default();
        let synchronizer = self.synchronizer.clone();
        let map = self.timers.clone();
        // Holding the map lock across the spawn keeps the task from
        // removing its entry before it is inserted.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(sleep).await;
            synchronizer.close(session_id).await;
            map.lock().await.remove(&session_id);
            info!("Session {} closed at expiry", session_id);
        });
        timers.insert(session_id, handle);

        info!(
            "Armed closure timer for session {} ({}s)",
            session_id,
            sleep.as_secs()
        );
    }

    /// Rebuild closure timers from storage after a restart
    ///
    /// Considers every session whose expiry falls after now minus the
    /// recovery window: overdue ones are closed immediately, still-open
    /// ones get a fresh timer. Sessions older than the window are left
    /// alone.
    pub async fn recover(&self) -> Result<usize> {
        let cutoff = self.clock.now() - self.recovery_window;
        let sessions = self.repository.sessions_expiring_after(cutoff).await?;
        let recovered = sessions.len();

        for session in &sessions {
            self.schedule_close(session).await;
        }

        if recovered > 0 {
            info!("Recovered {} session closure timers", recovered);
        }

        Ok(recovered)
    }

    /// Number of armed timers
    pub async fn pending_count(&self) -> usize {
        self.timers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::display::{DisplaySurface, MessageHandle, SummaryContent};
    use crate::models::{DisplayLocator, EventCategory, NewSession};
    use crate::repository::MemorySessionRepository;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex as StdMutex;

    /// Surface that records every push it receives
    struct RecordingSurface {
        pushes: StdMutex<Vec<SummaryContent>>,
    }

    impl RecordingSurface {
        fn new() -> Self {
            Self {
                pushes: StdMutex::new(Vec::new()),
            }
        }

        fn pushes(&self) -> Vec<SummaryContent> {
            self.pushes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DisplaySurface for RecordingSurface {
        async fn fetch(&self, locator: &DisplayLocator) -> Result<MessageHandle> {
            Ok(MessageHandle {
                channel_id: locator.channel_id.clone(),
                message_id: locator.message_id.clone(),
            })
        }

        async fn edit(&self, _handle: &MessageHandle, content: &SummaryContent) -> Result<()> {
            self.pushes.lock().unwrap().push(content.clone());
            Ok(())
        }
    }

    struct Harness {
        repository: Arc<MemorySessionRepository>,
        surface: Arc<RecordingSurface>,
        clock: Arc<ManualClock>,
        scheduler: SessionScheduler,
    }

    fn harness() -> Harness {
        let repository = Arc::new(MemorySessionRepository::new());
        let surface = Arc::new(RecordingSurface::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let synchronizer = Arc::new(SummaryViewSynchronizer::new(
            repository.clone(),
            surface.clone(),
            clock.clone(),
            900,
        ));
        let scheduler = SessionScheduler::new(
            repository.clone(),
            synchronizer,
            clock.clone(),
            Duration::hours(1),
        );

        Harness {
            repository,
            surface,
            clock,
            scheduler,
        }
    }

    async fn store_session(harness: &Harness, duration_minutes: i64) -> Session {
        let new_session = NewSession::new(
            EventCategory::Seminar,
            "CODE123".to_string(),
            duration_minutes,
            "officer-1".to_string(),
            DisplayLocator {
                channel_id: "100".to_string(),
                message_id: "200".to_string(),
            },
            harness.clock.now(),
        )
        .expect("valid session inputs");
        harness
            .repository
            .create_session(new_session)
            .await
            .expect("create session")
    }

    #[tokio::test(start_paused = true)]
    async fn test_overdue_session_closes_inline() {
        let harness = harness();
        let session = store_session(&harness, 30).await;

        // Process comes back 45 minutes later: the session is overdue
        harness.clock.advance(Duration::minutes(45));
        harness.scheduler.schedule_close(&session).await;

        let pushes = harness.surface.pushes();
        assert_eq!(pushes.len(), 1);
        assert!(!pushes[0].sign_in_enabled);
        assert_eq!(harness.scheduler.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_at_expiry() {
        let harness = harness();
        let session = store_session(&harness, 30).await;

        harness.scheduler.schedule_close(&session).await;
        assert_eq!(harness.scheduler.pending_count().await, 1);
        assert!(harness.surface.pushes().is_empty());

        // Let the armed timer fire
        harness.clock.advance(Duration::minutes(31));
        tokio::time::sleep(std::time::Duration::from_secs(31 * 60)).await;

        let pushes = harness.surface.pushes();
        assert_eq!(pushes.len(), 1);
        assert!(!pushes[0].sign_in_enabled);
        assert!(pushes[0].body.contains("Sign-ins are now closed."));
        assert_eq!(harness.scheduler.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_scheduling_is_ignored() {
        let harness = harness();
        let session = store_session(&harness, 30).await;

        harness.scheduler.schedule_close(&session).await;
        harness.scheduler.schedule_close(&session).await;

        assert_eq!(harness.scheduler.pending_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_closes_overdue_and_rearms_open() {
        let harness = harness();

        // Expired 30 minutes ago: inside the window, closed on recovery
        let overdue = store_session(&harness, 30).await;
        // Still open for another hour: re-armed
        let open = store_session(&harness, 90).await;

        harness.clock.advance(Duration::minutes(60));
        let recovered = harness.scheduler.recover().await.unwrap();

        assert_eq!(recovered, 2);
        assert_eq!(harness.scheduler.pending_count().await, 1);

        let pushes = harness.surface.pushes();
        assert_eq!(pushes.len(), 1, "only the overdue session was closed");
        assert!(!pushes[0].sign_in_enabled);

        // Sanity: the overdue one expired before the open one
        assert!(overdue.expires_at < open.expires_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_skips_sessions_outside_window() {
        let harness = harness();

        // Expires 30 minutes from now, but the process only comes back
        // 100 minutes later: the expiry is 70 minutes in the past, past
        // the one-hour window
        store_session(&harness, 30).await;

        harness.clock.advance(Duration::minutes(100));
        let recovered = harness.scheduler.recover().await.unwrap();

        assert_eq!(recovered, 0);
        assert!(harness.surface.pushes().is_empty());
        assert_eq!(harness.scheduler.pending_count().await, 0);
    }
}
