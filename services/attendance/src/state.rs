//! Shared application state for the HTTP surface

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::coordinator::SignInCoordinator;
use crate::repository::SessionRepository;
use crate::scheduler::SessionScheduler;
use crate::state_token::StateTokenRegistry;
use crate::verification::MemberDirectory;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: EngineConfig,
    pub clock: Arc<dyn Clock>,
    pub repository: Arc<dyn SessionRepository>,
    pub coordinator: Arc<SignInCoordinator>,
    pub scheduler: Arc<SessionScheduler>,
    pub registry: Arc<StateTokenRegistry>,
    pub directory: Arc<dyn MemberDirectory>,
}
