// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message bodies and their formatting.
//!
//! The core hands the gateway semantic fields only; everything a human
//! reads (prompt wording, button labels, escalation text) is assembled
//! here so that message copy changes never touch flow logic.

use cadence_core::{ActionKind, ActionPayload, Escalation, Recipient, UpdateStatus};
use serde::Serialize;

/// One interactive button attached to an outbound message.
///
/// The payload is the full structured [`ActionPayload`], never a
/// delimiter-joined string, so the platform echoes it back intact.
#[derive(Debug, Clone, Serialize)]
pub struct Button {
    pub label: String,
    pub payload: ActionPayload,
}

/// JSON body posted to the platform's message endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub recipient: Recipient,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    /// Plain text with no buttons.
    pub fn text(recipient: Recipient, text: impl Into<String>) -> Self {
        Self {
            recipient,
            text: text.into(),
            buttons: Vec::new(),
        }
    }
}

/// Human label for a status button.
fn status_label(status: UpdateStatus) -> &'static str {
    match status {
        UpdateStatus::OnTrack => "On track",
        UpdateStatus::AtRisk => "At risk",
        UpdateStatus::OffTrack => "Off track",
    }
}

/// The status-selection prompt for one project.
pub fn update_request(user_id: &str, project_name: &str, project_id: &str) -> OutboundMessage {
    let buttons = [
        UpdateStatus::OnTrack,
        UpdateStatus::AtRisk,
        UpdateStatus::OffTrack,
    ]
    .into_iter()
    .map(|status| Button {
        label: status_label(status).to_string(),
        payload: ActionPayload {
            user_id: user_id.to_string(),
            action: ActionKind::SelectStatus,
            project_id: Some(project_id.to_string()),
            value: status.to_string(),
        },
    })
    .collect();

    OutboundMessage {
        recipient: Recipient::User(user_id.to_string()),
        text: format!("How is *{project_name}* doing today?"),
        buttons,
    }
}

/// The supervisory-channel escalation message.
pub fn escalation(channel: &str, esc: &Escalation) -> OutboundMessage {
    let status = status_label(esc.status);
    let mut text = format!(
        ":rotating_light: *{}* flagged as *{}* by <@{}> ({})",
        esc.project_name, status, esc.user_id, esc.reason
    );
    if esc.has_blockers {
        text.push_str("\n:no_entry: Blockers reported.");
    }
    if !esc.narrative.is_empty() {
        text.push_str("\n> ");
        text.push_str(&esc.narrative);
    }

    OutboundMessage::text(Recipient::Channel(channel.to_string()), text)
}
