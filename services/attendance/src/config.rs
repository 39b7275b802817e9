//! Runtime configuration for the attendance service

use std::env;
use std::time::Duration;

/// Engine tuning knobs, all with defaults
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Address the HTTP surface binds to
    pub bind_addr: String,
    /// Whether sign-ins require a verified member account
    pub require_verification: bool,
    /// How far back overdue sessions are still closed out on startup, in seconds
    pub recovery_window_secs: u64,
    /// Lifetime of single-use verification state tokens, in seconds
    pub state_token_ttl_secs: u64,
    /// Character budget for the mention roster in summary views
    pub mention_budget: usize,
}

impl EngineConfig {
    /// Create a new EngineConfig from environment variables
    pub fn from_env() -> Self {
        let bind_addr =
            env::var("ATTENDANCE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let require_verification = env::var("ATTENDANCE_REQUIRE_VERIFICATION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);

        let recovery_window_secs = env::var("ATTENDANCE_RECOVERY_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        let state_token_ttl_secs = env::var("ATTENDANCE_STATE_TOKEN_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);

        let mention_budget = env::var("ATTENDANCE_MENTION_BUDGET")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(900);

        Self {
            bind_addr,
            require_verification,
            recovery_window_secs,
            state_token_ttl_secs,
            mention_budget,
        }
    }

    /// Recovery window as a time delta
    pub fn recovery_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.recovery_window_secs as i64)
    }

    /// State token lifetime as a duration
    pub fn state_token_ttl(&self) -> Duration {
        Duration::from_secs(self.state_token_ttl_secs)
    }
}
