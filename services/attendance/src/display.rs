//! Display surface where session summaries are published
//!
//! The engine never owns the summary message; it edits a message the
//! chat platform already hosts, addressed by a `DisplayLocator`.

use crate::models::DisplayLocator;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::env;

/// Handle to an existing message on the display surface
#[derive(Debug, Clone)]
pub struct MessageHandle {
    pub channel_id: String,
    pub message_id: String,
}

/// Rendered summary pushed to the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryContent {
    /// Full text of the summary view
    pub body: String,
    /// Whether the interactive sign-in control stays enabled
    pub sign_in_enabled: bool,
}

/// Messaging backend the summaries are written to
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Resolve a locator into a message handle
    async fn fetch(&self, locator: &DisplayLocator) -> Result<MessageHandle>;

    /// Replace the message's content
    async fn edit(&self, handle: &MessageHandle, content: &SummaryContent) -> Result<()>;
}

/// Configuration for the HTTP display surface
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Base URL of the platform REST API
    pub api_base_url: String,
    /// Bot token presented on every request
    pub bot_token: String,
}

impl DisplayConfig {
    /// Create a new DisplayConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let api_base_url = env::var("DISPLAY_API_BASE_URL")
            .map_err(|_| anyhow!("DISPLAY_API_BASE_URL must be set"))?;
        let bot_token =
            env::var("DISPLAY_BOT_TOKEN").map_err(|_| anyhow!("DISPLAY_BOT_TOKEN must be set"))?;

        Ok(Self {
            api_base_url,
            bot_token,
        })
    }
}

/// REST-backed display surface speaking the platform message API
pub struct HttpDisplaySurface {
    client: reqwest::Client,
    config: DisplayConfig,
}

impl HttpDisplaySurface {
    /// Create a surface over a fresh HTTP client
    pub fn new(config: DisplayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn message_url(&self, channel_id: &str, message_id: &str) -> String {
        format!(
            "{}/channels/{}/messages/{}",
            self.config.api_base_url, channel_id, message_id
        )
    }

    fn components(sign_in_enabled: bool) -> Value {
        if !sign_in_enabled {
            return json!([]);
        }

        json!([{
            "type": 1,
            "components": [{
                "type": 2,
                "style": 1,
                "label": "Sign In",
                "custom_id": "attendance-sign-in",
            }],
        }])
    }
}

#[async_trait]
impl DisplaySurface for HttpDisplaySurface {
    async fn fetch(&self, locator: &DisplayLocator) -> Result<MessageHandle> {
        let response = self
            .client
            .get(self.message_url(&locator.channel_id, &locator.message_id))
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Display message fetch failed with status {}",
                response.status()
            ));
        }

        Ok(MessageHandle {
            channel_id: locator.channel_id.clone(),
            message_id: locator.message_id.clone(),
        })
    }

    async fn edit(&self, handle: &MessageHandle, content: &SummaryContent) -> Result<()> {
        let payload = json!({
            "content": content.body,
            "components": Self::components(content.sign_in_enabled),
        });

        let response = self
            .client
            .patch(self.message_url(&handle.channel_id, &handle.message_id))
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Display message edit failed with status {}",
                response.status()
            ));
        }

        Ok(())
    }
}
