// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic reminder sweep over stalled conversations.
//!
//! Re-prompts users whose flow has gone quiet, reconciles against
//! updates that landed through another path, and honors snoozes. Each
//! state is processed independently; one failure never aborts the sweep.

use std::sync::Arc;

use cadence_config::model::ReminderConfig;
use cadence_core::types::{ISO_MILLIS, now_iso};
use cadence_core::{
    CadenceError, ConversationState, ConversationStep, MessagingGateway, Recipient, StatusStore,
    SweepSummary,
};
use tracing::{debug, info, warn};

use crate::handler::{advance_or_clear, send_step_prompt};
use crate::reducer::{self, FlowCommand, Transition};

/// What one swept state needed.
enum SweepOutcome {
    Advanced,
    Nudged,
}

/// Scans active conversations and nudges or advances the stale ones.
pub struct ReminderSweep {
    store: Arc<dyn StatusStore>,
    gateway: Arc<dyn MessagingGateway>,
    reminders: ReminderConfig,
}

impl ReminderSweep {
    pub fn new(
        store: Arc<dyn StatusStore>,
        gateway: Arc<dyn MessagingGateway>,
        reminders: ReminderConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            reminders,
        }
    }

    /// Runs one sweep over all active conversation states.
    pub async fn sweep(&self) -> Result<SweepSummary, CadenceError> {
        let states = self.store.active_conversations().await?;
        let now = now_iso();
        let stale_before = (chrono::Utc::now()
            - chrono::Duration::seconds(self.reminders.stale_after_secs as i64))
        .format(ISO_MILLIS)
        .to_string();

        let mut summary = SweepSummary::default();
        for state in states {
            summary.scanned += 1;

            if state.active_project.is_none() {
                debug!(user_id = %state.user_id, "skipping state with no active project");
                continue;
            }
            if state.last_prompted_at >= stale_before {
                continue;
            }
            if state
                .snoozed_until
                .as_deref()
                .is_some_and(|until| until > now.as_str())
            {
                summary.snoozed += 1;
                continue;
            }

            match self.process_stale(&state).await {
                Ok(SweepOutcome::Advanced) => summary.advanced += 1,
                Ok(SweepOutcome::Nudged) => summary.nudged += 1,
                Err(error) => {
                    warn!(user_id = %state.user_id, %error, "sweep failed for one state");
                    summary.failed += 1;
                }
            }
        }
        info!(
            scanned = summary.scanned,
            nudged = summary.nudged,
            advanced = summary.advanced,
            snoozed = summary.snoozed,
            failed = summary.failed,
            "reminder sweep complete"
        );
        Ok(summary)
    }

    async fn process_stale(&self, state: &ConversationState) -> Result<SweepOutcome, CadenceError> {
        // active_project presence was checked by the caller.
        let project_id = state
            .active_project
            .as_ref()
            .map(|p| p.project_id.clone())
            .ok_or_else(|| CadenceError::Internal("stale state lost its active project".into()))?;

        // An update newer than the last prompt means the project was
        // reported through another path; move on instead of re-asking.
        let newest = self.store.recent_updates(&project_id, 1).await?;
        if newest
            .first()
            .is_some_and(|u| u.created_at > state.last_prompted_at)
        {
            advance_or_clear(self.store.as_ref(), self.gateway.as_ref(), state).await?;
            return Ok(SweepOutcome::Advanced);
        }

        match state.step {
            ConversationStep::AwaitingStatus => {
                send_step_prompt(self.gateway.as_ref(), state).await?;
            }
            ConversationStep::AwaitingBlockers | ConversationStep::AwaitingAdvances => {
                let name = state
                    .active_project
                    .as_ref()
                    .map(|p| p.name.as_str())
                    .unwrap_or("your project");
                self.gateway
                    .send_text(
                        &Recipient::User(state.user_id.clone()),
                        &format!(
                            "Quick nudge: I still need an answer on *{name}*. Reply `later` if now is a bad time."
                        ),
                    )
                    .await?;
            }
        }

        if let Transition::Updated(next) =
            reducer::apply(state, FlowCommand::Touch { now: now_iso() })
        {
            self.store.put_conversation(&next).await?;
        }
        Ok(SweepOutcome::Nudged)
    }
}
