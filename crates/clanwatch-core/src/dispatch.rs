// Outbound notification delivery (Discord webhook).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::notify::NotificationPayload;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook answered with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Delivers a rendered notification. Callers never retry.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, payload: &NotificationPayload) -> Result<(), DispatchError>;
}

// ---------------------------------------------------------------------------
// Webhook message body
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookMessage {
    pub content: String,
    pub embeds: Vec<WebhookEmbed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookEmbed {
    pub title: String,
    pub description: String,
    pub color: u32,
}

impl From<&NotificationPayload> for WebhookMessage {
    fn from(payload: &NotificationPayload) -> Self {
        Self {
            content: payload.headline.clone(),
            embeds: vec![WebhookEmbed {
                title: payload.title.clone(),
                description: payload.body.clone(),
                color: payload.accent.rgb(),
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// DiscordWebhook
// ---------------------------------------------------------------------------

/// Posts notifications to a Discord webhook URL.
pub struct DiscordWebhook {
    http: reqwest::Client,
    url: String,
    /// Pause before each post; keeps bursts of results under the webhook
    /// rate limit.
    post_delay: Duration,
}

impl DiscordWebhook {
    pub fn new(url: String, post_delay: Duration, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url,
            post_delay,
        })
    }
}

#[async_trait]
impl Dispatcher for DiscordWebhook {
    async fn dispatch(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        if !self.post_delay.is_zero() {
            tokio::time::sleep(self.post_delay).await;
        }

        let message = WebhookMessage::from(payload);
        let resp = self.http.post(&self.url).json(&message).send().await?;
        let status = resp.status();
        info!(status = status.as_u16(), "webhook answered");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
