// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP implementation of [`MessagingGateway`] for the chat platform.
//!
//! One client posts every outbound message to the platform's message
//! endpoint. There is no global instance; callers construct the client
//! once and share it behind an `Arc`.

use std::time::Duration;

use async_trait::async_trait;
use cadence_config::model::GatewayConfig;
use cadence_core::{CadenceError, Escalation, MessagingGateway, Recipient};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::messages::{self, OutboundMessage};

/// Chat platform client delivering prompts, replies, and escalations.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    supervisor_channel: String,
}

impl ChatClient {
    /// Creates a new chat client from configuration.
    ///
    /// Fails fast when no API token is configured.
    pub fn new(config: &GatewayConfig) -> Result<Self, CadenceError> {
        let token = config.token.as_deref().ok_or_else(|| {
            CadenceError::Config("gateway.token is required (or set CADENCE_GATEWAY_TOKEN)".into())
        })?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| CadenceError::Config(format!("invalid gateway token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CadenceError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            supervisor_channel: config.supervisor_channel.clone(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn post_message(&self, message: &OutboundMessage) -> Result<(), CadenceError> {
        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(message)
            .send()
            .await
            .map_err(|e| CadenceError::Gateway {
                message: format!("message delivery failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CadenceError::Gateway {
                message: format!("platform returned {status}: {body}"),
                source: None,
            });
        }

        debug!(recipient = ?message.recipient, "message delivered");
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for ChatClient {
    async fn send_update_request(
        &self,
        user_id: &str,
        project_name: &str,
        project_id: &str,
    ) -> Result<(), CadenceError> {
        self.post_message(&messages::update_request(user_id, project_name, project_id))
            .await
    }

    async fn send_text(&self, recipient: &Recipient, text: &str) -> Result<(), CadenceError> {
        self.post_message(&OutboundMessage::text(recipient.clone(), text))
            .await
    }

    async fn send_escalation(&self, escalation: &Escalation) -> Result<(), CadenceError> {
        self.post_message(&messages::escalation(&self.supervisor_channel, escalation))
            .await
    }
}
