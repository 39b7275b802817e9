//! Single-use state tokens for the verification flow
//!
//! A token ties a verification round-trip through an external identity
//! provider back to the member who started it. Consuming is destructive:
//! each token answers at most one lookup.

use crate::clock::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

struct IssuedToken {
    user_id: String,
    issued_at: DateTime<Utc>,
}

/// Registry of outstanding single-use state tokens
pub struct StateTokenRegistry {
    tokens: Arc<Mutex<HashMap<String, IssuedToken>>>,
    ttl: chrono::Duration,
    sweep_after: Duration,
    clock: Arc<dyn Clock>,
}

impl StateTokenRegistry {
    /// Create a registry whose tokens expire after `ttl`
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            sweep_after: ttl,
            clock,
        }
    }

    /// Issue a fresh token for the member
    ///
    /// A background task drops the entry once the TTL elapses, so
    /// abandoned flows do not accumulate.
    pub async fn issue(&self, user_id: &str) -> String {
        let token = Uuid::new_v4().to_string();

        let mut tokens = self.tokens.lock().await;
        tokens.insert(
            token.clone(),
            IssuedToken {
                user_id: user_id.to_string(),
                issued_at: self.clock.now(),
            },
        );
        drop(tokens);

        let map = self.tokens.clone();
        let sweep_after = self.sweep_after;
        let swept = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(sweep_after).await;
            if map.lock().await.remove(&swept).is_some() {
                debug!("Swept expired state token");
            }
        });

        token
    }

    /// Redeem a token, returning the member it was issued to
    ///
    /// Returns `None` for unknown, already-consumed, or expired tokens.
    /// The entry is removed either way.
    pub async fn consume(&self, token: &str) -> Option<String> {
        let mut tokens = self.tokens.lock().await;
        let entry = tokens.remove(token)?;

        let age = self.clock.now() - entry.issued_at;
        if age > self.ttl {
            return None;
        }

        Some(entry.user_id)
    }

    /// Number of tokens currently outstanding
    pub async fn outstanding(&self) -> usize {
        self.tokens.lock().await.len()
    }
}
