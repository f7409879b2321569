// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure state-transition reducer for the conversation flow.
//!
//! Every transition is an explicit [`FlowCommand`] applied to the current
//! state, producing a [`Transition`] whose full resulting shape is known
//! statically. Nothing here touches the store, the clock, or the
//! gateway; timestamps arrive inside the command.

use cadence_core::{ConversationState, ConversationStep, PendingProject, UpdateStatus};

/// One requested state transition. Timestamps are supplied by the caller
/// so the reducer stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowCommand {
    /// Status button click while awaiting a status.
    RecordStatus { status: UpdateStatus },
    /// Blockers button click while awaiting the yes/no answer.
    RecordBlockers { has_blockers: bool },
    /// Move to the next queued project after the active one closed.
    Advance { now: String },
    /// Defer reminder nudges without changing the step.
    Snooze { until: String },
    /// Refresh the last-prompted timestamp without changing the step.
    Touch { now: String },
}

/// Outcome of applying a [`FlowCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Persist this replacement state.
    Updated(ConversationState),
    /// The queue is exhausted; delete the state.
    Cleared,
    /// The command does not apply to the current step; state unchanged.
    Rejected { reason: &'static str },
}

/// Builds the initial state for a fresh outreach cycle.
///
/// Returns `None` for an empty queue: no projects to report on means no
/// conversation.
pub fn begin(
    user_id: &str,
    queue: Vec<PendingProject>,
    now: &str,
    expires_at: &str,
) -> Option<ConversationState> {
    let first = queue.first()?.clone();
    Some(ConversationState {
        user_id: user_id.to_string(),
        step: ConversationStep::AwaitingStatus,
        queue,
        current_index: 0,
        active_project: Some(first),
        status_answer: None,
        blockers_answer: None,
        last_prompted_at: now.to_string(),
        snoozed_until: None,
        expires_at: expires_at.to_string(),
    })
}

/// Applies a command to the current state.
pub fn apply(state: &ConversationState, command: FlowCommand) -> Transition {
    match command {
        FlowCommand::RecordStatus { status } => {
            if state.step != ConversationStep::AwaitingStatus {
                return Transition::Rejected {
                    reason: "not awaiting a status",
                };
            }
            let mut next = state.clone();
            next.step = ConversationStep::AwaitingBlockers;
            next.status_answer = Some(status);
            Transition::Updated(next)
        }
        FlowCommand::RecordBlockers { has_blockers } => {
            if state.step != ConversationStep::AwaitingBlockers {
                return Transition::Rejected {
                    reason: "not awaiting a blockers answer",
                };
            }
            let mut next = state.clone();
            next.step = ConversationStep::AwaitingAdvances;
            next.blockers_answer = Some(has_blockers);
            Transition::Updated(next)
        }
        FlowCommand::Advance { now } => {
            let next_index = state.current_index + 1;
            match state.queue.get(next_index) {
                None => Transition::Cleared,
                Some(project) => {
                    let mut next = state.clone();
                    next.current_index = next_index;
                    next.active_project = Some(project.clone());
                    next.step = ConversationStep::AwaitingStatus;
                    next.status_answer = None;
                    next.blockers_answer = None;
                    next.last_prompted_at = now;
                    next.snoozed_until = None;
                    Transition::Updated(next)
                }
            }
        }
        FlowCommand::Snooze { until } => {
            let mut next = state.clone();
            next.snoozed_until = Some(until);
            Transition::Updated(next)
        }
        FlowCommand::Touch { now } => {
            let mut next = state.clone();
            next.last_prompted_at = now;
            Transition::Updated(next)
        }
    }
}

/// Re-points the state at the project named in a button payload when the
/// denormalized active project is missing or disagrees with the click.
///
/// A click can outlive the state it was issued against, so the payload's
/// project identifier is authoritative; this looks it up among the not
/// yet completed queue entries. Re-pointing at a different project also
/// discards any partially collected answers and restarts at the status
/// step, so answers never carry over from one project to another.
/// Returns `None` when the project is not pending.
pub fn realign_active(
    state: &ConversationState,
    clicked_project_id: &str,
) -> Option<ConversationState> {
    if let Some(active) = &state.active_project {
        if active.project_id == clicked_project_id {
            return Some(state.clone());
        }
    }
    let index = state
        .queue
        .iter()
        .enumerate()
        .skip(state.current_index)
        .find(|(_, p)| p.project_id == clicked_project_id)
        .map(|(i, _)| i)?;
    let mut next = state.clone();
    next.active_project = Some(next.queue[index].clone());
    if index != state.current_index {
        next.current_index = index;
        next.step = ConversationStep::AwaitingStatus;
        next.status_answer = None;
        next.blockers_answer = None;
    }
    Some(next)
}
