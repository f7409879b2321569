// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound messaging contract. The core supplies semantic fields only;
//! presentation is the gateway implementation's concern.

use async_trait::async_trait;

use crate::error::CadenceError;
use crate::types::{Escalation, Recipient};

/// Delivers prompts and alerts to end users and the supervisory channel.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Prompt a user for a status update on one project (status buttons).
    async fn send_update_request(
        &self,
        user_id: &str,
        project_name: &str,
        project_id: &str,
    ) -> Result<(), CadenceError>;

    /// Plain text to a user or channel.
    async fn send_text(&self, recipient: &Recipient, text: &str) -> Result<(), CadenceError>;

    /// Alert the supervisory channel.
    async fn send_escalation(&self, escalation: &Escalation) -> Result<(), CadenceError>;
}
