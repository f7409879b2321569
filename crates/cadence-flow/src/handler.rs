// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event handling and the scheduled outreach trigger.
//!
//! [`FlowEngine`] owns every mutation of [`ConversationState`]: button
//! clicks and free-text messages land here, state transitions go through
//! the pure reducer, and completions flow into risk evaluation and
//! escalation. Clients are constructed once at process start and shared
//! by `Arc`; nothing here reaches for ambient globals.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cadence_config::model::FlowConfig;
use cadence_core::risk::{self, CurrentReport};
use cadence_core::types::{iso_after, now_iso};
use cadence_core::{
    ActionKind, ActionPayload, CadenceError, ConversationState, ConversationStep, Escalation,
    MessagingGateway, PendingProject, ProjectUpdate, Recipient, StatusStore, TextEvent,
    UpdateStatus, UserProfile,
};
use tracing::{debug, info, warn};

use crate::commands::{self, SideCommand};
use crate::outreach::{self, OutreachSummary};
use crate::reducer::{self, FlowCommand, Transition};

/// Phrases that snooze reminder nudges without ending the flow.
const SNOOZE_PHRASES: &[&str] = &["later", "snooze"];

/// Names shorter than this are re-prompted during onboarding.
const MIN_NAME_CHARS: usize = 2;

/// Result rows shown for a free-text project search.
const SEARCH_RESULT_CAP: usize = 10;

const LOST_STATE_APOLOGY: &str =
    "Sorry, I lost track of that conversation. I'll reach out again next cycle.";

/// Handles inbound events and scheduled outreach for the update flow.
pub struct FlowEngine {
    store: Arc<dyn StatusStore>,
    gateway: Arc<dyn MessagingGateway>,
    flow: FlowConfig,
}

/// Per-user outcome of one outreach attempt.
enum StartOutcome {
    Started,
    Busy,
    EmptyQueue,
}

impl FlowEngine {
    pub fn new(
        store: Arc<dyn StatusStore>,
        gateway: Arc<dyn MessagingGateway>,
        flow: FlowConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            flow,
        }
    }

    /// Handles a button-click event.
    pub async fn handle_action(&self, payload: &ActionPayload) -> Result<(), CadenceError> {
        debug!(user_id = %payload.user_id, action = %payload.action, "action received");
        match payload.action {
            ActionKind::SelectTimezone => self.handle_timezone(payload).await,
            ActionKind::SelectStatus => self.handle_status_click(payload).await,
            ActionKind::AnswerBlockers => self.handle_blockers_click(payload).await,
        }
    }

    /// Handles a free-text message event.
    pub async fn handle_message(&self, event: &TextEvent) -> Result<(), CadenceError> {
        let recipient = Recipient::User(event.user_id.clone());

        let Some(user) = self.store.get_user(&event.user_id).await? else {
            // First contact: create the profile and start onboarding.
            self.store
                .put_user(&UserProfile::new(&event.user_id))
                .await?;
            return self
                .gateway
                .send_text(
                    &recipient,
                    "Hi! I collect project status updates. What name do you go by in the project tracker?",
                )
                .await;
        };

        if let Some(command) = commands::parse(&event.text) {
            return self.handle_command(&user, command).await;
        }

        if user.tracker_name.is_none() {
            return self.capture_name(user, &event.text).await;
        }
        if user.timezone.is_none() {
            return self
                .gateway
                .send_text(&recipient, "Almost there. Pick your time zone with the buttons above.")
                .await;
        }

        match self.store.get_conversation(&event.user_id).await? {
            Some(state) => self.handle_flow_text(state, event).await,
            None => {
                // Idle free text: point at the side commands.
                self.gateway
                    .send_text(&recipient, &commands::help_text())
                    .await
            }
        }
    }

    /// Starts update flows for every onboarded user with pending projects.
    pub async fn run_outreach(&self) -> Result<OutreachSummary, CadenceError> {
        let users = self.store.onboarded_users().await?;
        let updated_today: HashSet<String> = self
            .store
            .project_ids_updated_today()
            .await?
            .into_iter()
            .collect();

        let mut summary = OutreachSummary {
            eligible: users.len(),
            ..OutreachSummary::default()
        };
        for user in users {
            match self.start_flow(&user, &updated_today).await {
                Ok(StartOutcome::Started) => summary.started += 1,
                Ok(StartOutcome::Busy) => summary.skipped_busy += 1,
                Ok(StartOutcome::EmptyQueue) => summary.skipped_empty += 1,
                Err(error) => {
                    warn!(user_id = %user.user_id, %error, "outreach failed for user");
                    summary.failed += 1;
                }
            }
        }
        info!(
            started = summary.started,
            busy = summary.skipped_busy,
            empty = summary.skipped_empty,
            failed = summary.failed,
            "outreach complete"
        );
        Ok(summary)
    }

    async fn start_flow(
        &self,
        user: &UserProfile,
        updated_today: &HashSet<String>,
    ) -> Result<StartOutcome, CadenceError> {
        if self.store.get_conversation(&user.user_id).await?.is_some() {
            return Ok(StartOutcome::Busy);
        }
        let Some(tracker_name) = user.tracker_name.as_deref() else {
            return Ok(StartOutcome::EmptyQueue);
        };

        let cached = self.store.projects_by_owner(tracker_name).await?;

        // Opportunistically refresh the profile's project snapshot.
        let mut refreshed = user.clone();
        refreshed.cached_projects = Some(
            serde_json::to_string(&cached)
                .map_err(|e| CadenceError::Internal(format!("cache snapshot encode: {e}")))?,
        );
        refreshed.projects_cached_at = Some(now_iso());
        self.store.put_user(&refreshed).await?;

        let queue = outreach::build_queue(&cached, updated_today);
        let now = now_iso();
        let expires_at = iso_after(Duration::from_secs(self.flow.retention_hours * 3600));
        let Some(state) = reducer::begin(&user.user_id, queue, &now, &expires_at) else {
            return Ok(StartOutcome::EmptyQueue);
        };

        self.store.put_conversation(&state).await?;
        self.send_step_prompt(&state).await?;
        Ok(StartOutcome::Started)
    }

    async fn handle_timezone(&self, payload: &ActionPayload) -> Result<(), CadenceError> {
        let mut user = self
            .store
            .get_user(&payload.user_id)
            .await?
            .unwrap_or_else(|| UserProfile::new(&payload.user_id));
        user.timezone = Some(payload.value.clone());
        user.onboarded = user.tracker_name.is_some();
        self.store.put_user(&user).await?;

        let recipient = Recipient::User(payload.user_id.clone());
        let reply = if user.onboarded {
            "You're all set. I'll reach out on weekday mornings for status updates."
        } else {
            "Time zone saved. What name do you go by in the project tracker?"
        };
        self.gateway.send_text(&recipient, reply).await
    }

    async fn handle_status_click(&self, payload: &ActionPayload) -> Result<(), CadenceError> {
        let Ok(status) = payload.value.parse::<UpdateStatus>() else {
            warn!(user_id = %payload.user_id, value = %payload.value, "unparseable status value");
            return self.apologize(&payload.user_id).await;
        };
        let Some(state) = self.resolve_state(payload).await? else {
            return self.apologize(&payload.user_id).await;
        };

        match reducer::apply(&state, FlowCommand::RecordStatus { status }) {
            Transition::Updated(next) => {
                self.store.put_conversation(&next).await?;
                self.send_step_prompt(&next).await
            }
            Transition::Rejected { reason } => {
                debug!(user_id = %payload.user_id, reason, "status click out of step");
                self.send_step_prompt(&state).await
            }
            Transition::Cleared => Err(CadenceError::Internal(
                "status click cleared the state".into(),
            )),
        }
    }

    async fn handle_blockers_click(&self, payload: &ActionPayload) -> Result<(), CadenceError> {
        let has_blockers = match payload.value.to_ascii_lowercase().as_str() {
            "yes" => true,
            "no" => false,
            other => {
                warn!(user_id = %payload.user_id, value = other, "unparseable blockers value");
                return self.apologize(&payload.user_id).await;
            }
        };
        let Some(state) = self.resolve_state(payload).await? else {
            return self.apologize(&payload.user_id).await;
        };

        match reducer::apply(&state, FlowCommand::RecordBlockers { has_blockers }) {
            Transition::Updated(next) => {
                self.store.put_conversation(&next).await?;
                self.send_step_prompt(&next).await
            }
            Transition::Rejected { reason } => {
                debug!(user_id = %payload.user_id, reason, "blockers click out of step");
                self.send_step_prompt(&state).await
            }
            Transition::Cleared => Err(CadenceError::Internal(
                "blockers click cleared the state".into(),
            )),
        }
    }

    /// Loads the conversation and re-points it at the clicked project when
    /// the stored active project disagrees with the button payload.
    async fn resolve_state(
        &self,
        payload: &ActionPayload,
    ) -> Result<Option<ConversationState>, CadenceError> {
        let Some(state) = self.store.get_conversation(&payload.user_id).await? else {
            warn!(user_id = %payload.user_id, "click with no active conversation");
            return Ok(None);
        };
        let resolved = match payload.project_id.as_deref() {
            Some(project_id) => {
                let realigned = reducer::realign_active(&state, project_id);
                if realigned.is_none() {
                    warn!(
                        user_id = %payload.user_id,
                        project_id,
                        "clicked project is not in the pending queue"
                    );
                }
                realigned
            }
            None => Some(state),
        };
        Ok(resolved)
    }

    async fn handle_flow_text(
        &self,
        state: ConversationState,
        event: &TextEvent,
    ) -> Result<(), CadenceError> {
        let lower = event.text.trim().to_ascii_lowercase();
        if SNOOZE_PHRASES.contains(&lower.as_str()) {
            let until = iso_after(Duration::from_secs(self.flow.snooze_secs));
            if let Transition::Updated(next) = reducer::apply(&state, FlowCommand::Snooze { until })
            {
                self.store.put_conversation(&next).await?;
            }
            return self
                .gateway
                .send_text(
                    &Recipient::User(event.user_id.clone()),
                    "No problem, I'll check back in later.",
                )
                .await;
        }

        if state.step == ConversationStep::AwaitingAdvances {
            return self.complete_active(state, event).await;
        }

        // Text while buttons are expected: re-send the step prompt.
        self.send_step_prompt(&state).await
    }

    /// Closes the cycle for the active project: write the update, run the
    /// risk evaluation, escalate if warranted, advance or clear.
    async fn complete_active(
        &self,
        state: ConversationState,
        event: &TextEvent,
    ) -> Result<(), CadenceError> {
        let Some(active) = active_project(&state) else {
            warn!(user_id = %state.user_id, "terminal step with no active project");
            self.store.clear_conversation(&state.user_id).await?;
            return self.apologize(&state.user_id).await;
        };
        let Some(status) = state.status_answer else {
            // Answers went missing; restart the active project's cycle.
            warn!(user_id = %state.user_id, "terminal step with no status answer");
            return self.send_step_prompt(&restart_active(&state)).await;
        };
        let has_blockers = state.blockers_answer.unwrap_or(false);
        let narrative = event.text.trim().to_string();

        // Prior updates are read before the insert so the evaluator sees
        // only genuinely preceding records.
        let prior = self.store.recent_updates(&active.project_id, 2).await?;
        let update = ProjectUpdate {
            project_id: active.project_id.clone(),
            user_id: state.user_id.clone(),
            status,
            narrative: narrative.clone(),
            has_blockers,
            blocker_note: has_blockers.then(|| narrative.clone()),
            created_at: now_iso(),
        };
        self.store.insert_update(&update).await?;
        info!(
            user_id = %state.user_id,
            project_id = %active.project_id,
            status = %status,
            has_blockers,
            "update recorded"
        );

        let decision = risk::evaluate(
            CurrentReport {
                status,
                has_blockers,
            },
            &prior,
        );
        if decision.should_alert {
            let reason = decision
                .reason
                .map(|r| r.to_string())
                .unwrap_or_default();
            info!(project_id = %active.project_id, %reason, "escalating");
            self.gateway
                .send_escalation(&Escalation {
                    project_name: active.name.clone(),
                    user_id: state.user_id.clone(),
                    status,
                    narrative,
                    has_blockers,
                    reason,
                })
                .await?;
        }

        advance_or_clear(self.store.as_ref(), self.gateway.as_ref(), &state).await?;
        Ok(())
    }

    async fn capture_name(&self, mut user: UserProfile, text: &str) -> Result<(), CadenceError> {
        let recipient = Recipient::User(user.user_id.clone());
        let name = text.trim();
        if name.chars().count() < MIN_NAME_CHARS {
            return self
                .gateway
                .send_text(
                    &recipient,
                    "That looks too short for a name. What's your full name in the tracker?",
                )
                .await;
        }

        user.tracker_name = Some(name.to_string());
        user.onboarded = user.timezone.is_some();
        self.store.put_user(&user).await?;

        let reply = if user.onboarded {
            "You're all set. I'll reach out on weekday mornings for status updates."
        } else {
            "Thanks! Now pick your time zone with the buttons."
        };
        self.gateway.send_text(&recipient, reply).await
    }

    async fn handle_command(
        &self,
        user: &UserProfile,
        command: SideCommand,
    ) -> Result<(), CadenceError> {
        let recipient = Recipient::User(user.user_id.clone());
        match command {
            SideCommand::Help => {
                self.gateway
                    .send_text(&recipient, &commands::help_text())
                    .await
            }
            SideCommand::Reset => {
                // The conversation state is left to expire on its own.
                self.store.delete_user(&user.user_id).await?;
                self.gateway
                    .send_text(
                        &recipient,
                        "Done, I've forgotten your profile. Your past updates are kept.",
                    )
                    .await
            }
            SideCommand::MyProjects => {
                let Some(name) = user.tracker_name.as_deref() else {
                    return self
                        .gateway
                        .send_text(&recipient, "I don't know your tracker name yet. What is it?")
                        .await;
                };
                let projects = self.store.projects_by_owner(name).await?;
                let reply = if projects.is_empty() {
                    "I don't see any projects owned by you right now.".to_string()
                } else {
                    projects
                        .iter()
                        .map(commands::project_line)
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                self.gateway.send_text(&recipient, &reply).await
            }
            SideCommand::Lookup(business_id) => {
                let reply = match self.store.project_by_business_id(&business_id).await? {
                    Some(record) => commands::project_line(&record),
                    None => format!("No project with business ID {business_id}."),
                };
                self.gateway.send_text(&recipient, &reply).await
            }
            SideCommand::Search(needle) => {
                let matches = self.store.search_projects(&needle).await?;
                let reply = if matches.is_empty() {
                    format!("No project names match \"{needle}\".")
                } else {
                    matches
                        .iter()
                        .take(SEARCH_RESULT_CAP)
                        .map(commands::project_line)
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                self.gateway.send_text(&recipient, &reply).await
            }
        }
    }

    async fn send_step_prompt(&self, state: &ConversationState) -> Result<(), CadenceError> {
        send_step_prompt(self.gateway.as_ref(), state).await
    }

    async fn apologize(&self, user_id: &str) -> Result<(), CadenceError> {
        self.gateway
            .send_text(&Recipient::User(user_id.to_string()), LOST_STATE_APOLOGY)
            .await
    }
}

/// The active project, falling back to the queue entry at the current
/// index when the denormalized copy is missing.
fn active_project(state: &ConversationState) -> Option<&PendingProject> {
    state
        .active_project
        .as_ref()
        .or_else(|| state.queue.get(state.current_index))
}

/// A copy of the state rewound to the status question for the active
/// project.
fn restart_active(state: &ConversationState) -> ConversationState {
    let mut next = state.clone();
    next.step = ConversationStep::AwaitingStatus;
    next.status_answer = None;
    next.blockers_answer = None;
    next
}

/// Sends the prompt matching the state's current step.
pub(crate) async fn send_step_prompt(
    gateway: &dyn MessagingGateway,
    state: &ConversationState,
) -> Result<(), CadenceError> {
    let Some(active) = active_project(state) else {
        return Err(CadenceError::Internal(
            "conversation state has no active project".into(),
        ));
    };
    let recipient = Recipient::User(state.user_id.clone());
    match state.step {
        ConversationStep::AwaitingStatus => {
            gateway
                .send_update_request(&state.user_id, &active.name, &active.project_id)
                .await
        }
        ConversationStep::AwaitingBlockers => {
            gateway
                .send_text(
                    &recipient,
                    &format!("Any blockers on *{}*? Answer with the Yes / No buttons.", active.name),
                )
                .await
        }
        ConversationStep::AwaitingAdvances => {
            gateway
                .send_text(
                    &recipient,
                    &format!(
                        "Got it. What's the latest on *{}*? A sentence or two is plenty.",
                        active.name
                    ),
                )
                .await
        }
    }
}

/// Moves the flow to the next queued project, or clears the state when
/// the queue is exhausted. Returns true when a next project was prompted.
pub(crate) async fn advance_or_clear(
    store: &dyn StatusStore,
    gateway: &dyn MessagingGateway,
    state: &ConversationState,
) -> Result<bool, CadenceError> {
    match reducer::apply(state, FlowCommand::Advance { now: now_iso() }) {
        Transition::Updated(next) => {
            store.put_conversation(&next).await?;
            send_step_prompt(gateway, &next).await?;
            Ok(true)
        }
        Transition::Cleared => {
            store.clear_conversation(&state.user_id).await?;
            gateway
                .send_text(
                    &Recipient::User(state.user_id.clone()),
                    "That's everything for today. Thanks!",
                )
                .await?;
            Ok(false)
        }
        Transition::Rejected { reason } => Err(CadenceError::Internal(format!(
            "advance rejected: {reason}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_config::model::StorageConfig;
    use cadence_core::ProjectCacheRecord;
    use cadence_store::SqliteStore;
    use cadence_test_utils::MockGateway;
    use tempfile::TempDir;

    struct Harness {
        engine: FlowEngine,
        store: Arc<SqliteStore>,
        gateway: Arc<MockGateway>,
        _dir: TempDir,
    }

    async fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            database_path: dir
                .path()
                .join("cadence.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteStore::open(&config).await.unwrap());
        let gateway = Arc::new(MockGateway::new());
        let engine = FlowEngine::new(store.clone(), gateway.clone(), FlowConfig::default());
        Harness {
            engine,
            store,
            gateway,
            _dir: dir,
        }
    }

    fn cache_record(id: &str, name: &str, owner: &str, business_id: &str) -> ProjectCacheRecord {
        ProjectCacheRecord {
            project_id: id.into(),
            name: name.into(),
            owner: Some(owner.into()),
            status_label: Some("On Track".into()),
            business_id: Some(business_id.into()),
            due_date: None,
            last_note: None,
            last_note_at: None,
            progress_pct: None,
            pending_tasks: None,
            total_tasks: None,
        }
    }

    async fn onboarded_user(h: &Harness, user_id: &str, name: &str) {
        h.store
            .put_user(&UserProfile {
                user_id: user_id.into(),
                tracker_name: Some(name.into()),
                timezone: Some("Europe/Berlin".into()),
                onboarded: true,
                cached_projects: None,
                projects_cached_at: None,
            })
            .await
            .unwrap();
    }

    fn text(user_id: &str, body: &str) -> TextEvent {
        TextEvent {
            user_id: user_id.into(),
            text: body.into(),
        }
    }

    fn click(user_id: &str, action: ActionKind, project_id: Option<&str>, value: &str) -> ActionPayload {
        ActionPayload {
            user_id: user_id.into(),
            action,
            project_id: project_id.map(String::from),
            value: value.into(),
        }
    }

    #[tokio::test]
    async fn first_contact_creates_profile_and_asks_for_name() {
        let h = harness().await;
        h.engine.handle_message(&text("U1", "hello")).await.unwrap();

        let user = h.store.get_user("U1").await.unwrap().unwrap();
        assert!(!user.onboarded);
        let texts = h.gateway.texts_to_user("U1").await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("name"));
    }

    #[tokio::test]
    async fn short_name_is_re_prompted() {
        let h = harness().await;
        h.engine.handle_message(&text("U1", "hello")).await.unwrap();
        h.engine.handle_message(&text("U1", "D")).await.unwrap();

        let user = h.store.get_user("U1").await.unwrap().unwrap();
        assert!(user.tracker_name.is_none());
        assert!(
            h.gateway.texts_to_user("U1").await[1].contains("too short")
        );
    }

    #[tokio::test]
    async fn name_then_timezone_completes_onboarding() {
        let h = harness().await;
        h.engine.handle_message(&text("U1", "hello")).await.unwrap();
        h.engine
            .handle_message(&text("U1", "Dana Okafor"))
            .await
            .unwrap();

        let user = h.store.get_user("U1").await.unwrap().unwrap();
        assert_eq!(user.tracker_name.as_deref(), Some("Dana Okafor"));
        assert!(!user.onboarded);

        h.engine
            .handle_action(&click(
                "U1",
                ActionKind::SelectTimezone,
                None,
                "Europe/Berlin",
            ))
            .await
            .unwrap();
        let user = h.store.get_user("U1").await.unwrap().unwrap();
        assert!(user.onboarded);
        assert_eq!(user.timezone.as_deref(), Some("Europe/Berlin"));
    }

    #[tokio::test]
    async fn outreach_builds_queue_and_prompts_first_project() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-2", "Beta", "Dana Okafor", "PMO-20"))
            .await
            .unwrap();
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-7"))
            .await
            .unwrap();

        let summary = h.engine.run_outreach().await.unwrap();
        assert_eq!(summary.started, 1);
        assert_eq!(summary.failed, 0);

        let state = h.store.get_conversation("U1").await.unwrap().unwrap();
        assert_eq!(state.queue.len(), 2);
        // Lower ordinal first.
        assert_eq!(state.queue[0].project_id, "p-1");
        assert_eq!(h.gateway.prompted_projects().await, vec!["p-1"]);
    }

    #[tokio::test]
    async fn outreach_with_no_projects_takes_no_action() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;

        let summary = h.engine.run_outreach().await.unwrap();
        assert_eq!(summary.started, 0);
        assert_eq!(summary.skipped_empty, 1);
        assert!(h.store.get_conversation("U1").await.unwrap().is_none());
        assert_eq!(h.gateway.sent_count().await, 0);
    }

    #[tokio::test]
    async fn outreach_skips_busy_users() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-7"))
            .await
            .unwrap();

        h.engine.run_outreach().await.unwrap();
        let second = h.engine.run_outreach().await.unwrap();
        assert_eq!(second.started, 0);
        assert_eq!(second.skipped_busy, 1);
    }

    #[tokio::test]
    async fn full_cycle_advances_to_next_project_automatically() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-1"))
            .await
            .unwrap();
        h.store
            .upsert_project(&cache_record("p-2", "Beta", "Dana Okafor", "PMO-2"))
            .await
            .unwrap();
        h.engine.run_outreach().await.unwrap();

        h.engine
            .handle_action(&click(
                "U1",
                ActionKind::SelectStatus,
                Some("p-1"),
                "on_track",
            ))
            .await
            .unwrap();
        h.engine
            .handle_action(&click("U1", ActionKind::AnswerBlockers, Some("p-1"), "no"))
            .await
            .unwrap();
        h.engine
            .handle_message(&text("U1", "all good"))
            .await
            .unwrap();

        // One update for p-1, no escalation, automatic prompt for p-2.
        let updates = h.store.recent_updates("p-1", 10).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, UpdateStatus::OnTrack);
        assert_eq!(updates[0].narrative, "all good");
        assert!(updates[0].blocker_note.is_none());
        assert!(h.gateway.escalations().await.is_empty());
        assert_eq!(h.gateway.prompted_projects().await, vec!["p-1", "p-2"]);

        let state = h.store.get_conversation("U1").await.unwrap().unwrap();
        assert_eq!(state.current_index, 1);
        assert_eq!(state.step, ConversationStep::AwaitingStatus);
    }

    #[tokio::test]
    async fn stale_click_for_another_project_never_borrows_answers() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-1"))
            .await
            .unwrap();
        h.store
            .upsert_project(&cache_record("p-2", "Beta", "Dana Okafor", "PMO-2"))
            .await
            .unwrap();
        h.engine.run_outreach().await.unwrap();

        h.engine
            .handle_action(&click("U1", ActionKind::SelectStatus, Some("p-1"), "at_risk"))
            .await
            .unwrap();
        // A leftover blockers button for the second project, clicked while
        // the first project's status is already recorded.
        h.engine
            .handle_action(&click("U1", ActionKind::AnswerBlockers, Some("p-2"), "no"))
            .await
            .unwrap();
        h.engine.handle_message(&text("U1", "steady")).await.unwrap();

        // Nothing was written: p-1's status must not land on p-2, and p-1
        // is still the active project awaiting its blockers answer.
        assert!(h.store.recent_updates("p-2", 10).await.unwrap().is_empty());
        assert!(h.store.recent_updates("p-1", 10).await.unwrap().is_empty());
        let state = h.store.get_conversation("U1").await.unwrap().unwrap();
        assert_eq!(state.current_index, 0);
        assert_eq!(state.step, ConversationStep::AwaitingBlockers);
        assert_eq!(state.status_answer, Some(UpdateStatus::AtRisk));

        // Finishing the flow in order records the update where it belongs.
        h.engine
            .handle_action(&click("U1", ActionKind::AnswerBlockers, Some("p-1"), "no"))
            .await
            .unwrap();
        h.engine
            .handle_message(&text("U1", "vendor wobbling"))
            .await
            .unwrap();
        let updates = h.store.recent_updates("p-1", 10).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, UpdateStatus::AtRisk);
        assert!(h.store.recent_updates("p-2", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_project_completion_clears_the_state() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-1"))
            .await
            .unwrap();
        h.engine.run_outreach().await.unwrap();

        h.engine
            .handle_action(&click(
                "U1",
                ActionKind::SelectStatus,
                Some("p-1"),
                "on_track",
            ))
            .await
            .unwrap();
        h.engine
            .handle_action(&click("U1", ActionKind::AnswerBlockers, Some("p-1"), "no"))
            .await
            .unwrap();
        h.engine
            .handle_message(&text("U1", "wrapped up"))
            .await
            .unwrap();

        assert!(h.store.get_conversation("U1").await.unwrap().is_none());
        let texts = h.gateway.texts_to_user("U1").await;
        assert!(texts.last().unwrap().contains("everything for today"));
    }

    #[tokio::test]
    async fn consecutive_at_risk_escalates_exactly_once_on_the_second() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-1"))
            .await
            .unwrap();

        // Cycle one: first at-risk, no escalation.
        h.engine.run_outreach().await.unwrap();
        h.engine
            .handle_action(&click("U1", ActionKind::SelectStatus, Some("p-1"), "at_risk"))
            .await
            .unwrap();
        h.engine
            .handle_action(&click("U1", ActionKind::AnswerBlockers, Some("p-1"), "no"))
            .await
            .unwrap();
        h.engine
            .handle_message(&text("U1", "vendor wobbling"))
            .await
            .unwrap();
        assert!(h.gateway.escalations().await.is_empty());

        // Cycle two, next day: second consecutive at-risk escalates.
        h.store
            .put_conversation(
                &reducer::begin(
                    "U1",
                    vec![PendingProject {
                        project_id: "p-1".into(),
                        name: "Alpha".into(),
                        business_id: Some("PMO-1".into()),
                        last_status: None,
                    }],
                    &now_iso(),
                    &iso_after(Duration::from_secs(3600)),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        h.engine
            .handle_action(&click("U1", ActionKind::SelectStatus, Some("p-1"), "at_risk"))
            .await
            .unwrap();
        h.engine
            .handle_action(&click("U1", ActionKind::AnswerBlockers, Some("p-1"), "no"))
            .await
            .unwrap();
        h.engine
            .handle_message(&text("U1", "vendor slipped again"))
            .await
            .unwrap();

        let escalations = h.gateway.escalations().await;
        assert_eq!(escalations.len(), 1);
        assert_eq!(escalations[0].reason, "consecutive at-risk");
        assert_eq!(escalations[0].project_name, "Alpha");
    }

    #[tokio::test]
    async fn off_track_with_blockers_records_blocker_note_and_escalates() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-1"))
            .await
            .unwrap();
        h.engine.run_outreach().await.unwrap();

        h.engine
            .handle_action(&click("U1", ActionKind::SelectStatus, Some("p-1"), "off_track"))
            .await
            .unwrap();
        h.engine
            .handle_action(&click("U1", ActionKind::AnswerBlockers, Some("p-1"), "yes"))
            .await
            .unwrap();
        h.engine
            .handle_message(&text("U1", "legal signoff is stuck"))
            .await
            .unwrap();

        let updates = h.store.recent_updates("p-1", 1).await.unwrap();
        assert!(updates[0].has_blockers);
        assert_eq!(updates[0].blocker_note.as_deref(), Some("legal signoff is stuck"));

        let escalations = h.gateway.escalations().await;
        assert_eq!(escalations.len(), 1);
        assert_eq!(escalations[0].reason, "off-track");
    }

    #[tokio::test]
    async fn click_payload_realigns_a_mismatched_state() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-1"))
            .await
            .unwrap();
        h.store
            .upsert_project(&cache_record("p-2", "Beta", "Dana Okafor", "PMO-2"))
            .await
            .unwrap();
        h.engine.run_outreach().await.unwrap();

        // The click names p-2 even though the state points at p-1.
        h.engine
            .handle_action(&click("U1", ActionKind::SelectStatus, Some("p-2"), "on_track"))
            .await
            .unwrap();

        let state = h.store.get_conversation("U1").await.unwrap().unwrap();
        assert_eq!(state.current_index, 1);
        assert_eq!(state.step, ConversationStep::AwaitingBlockers);
        assert!(state.is_consistent());
    }

    #[tokio::test]
    async fn click_without_conversation_gets_an_apology() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;

        h.engine
            .handle_action(&click("U1", ActionKind::SelectStatus, Some("p-1"), "on_track"))
            .await
            .unwrap();
        let texts = h.gateway.texts_to_user("U1").await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Sorry"));
    }

    #[tokio::test]
    async fn snooze_phrase_sets_snoozed_until_without_changing_step() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-1"))
            .await
            .unwrap();
        h.engine.run_outreach().await.unwrap();

        h.engine.handle_message(&text("U1", "later")).await.unwrap();

        let state = h.store.get_conversation("U1").await.unwrap().unwrap();
        assert!(state.snoozed_until.is_some());
        assert_eq!(state.step, ConversationStep::AwaitingStatus);
    }

    #[tokio::test]
    async fn reset_deletes_profile_but_keeps_update_history() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .insert_update(&ProjectUpdate {
                project_id: "p-1".into(),
                user_id: "U1".into(),
                status: UpdateStatus::OnTrack,
                narrative: "fine".into(),
                has_blockers: false,
                blocker_note: None,
                created_at: now_iso(),
            })
            .await
            .unwrap();

        h.engine.handle_message(&text("U1", "reset")).await.unwrap();

        assert!(h.store.get_user("U1").await.unwrap().is_none());
        assert_eq!(h.store.recent_updates("p-1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn business_id_lookup_replies_with_the_cached_record() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Billing Revamp", "Someone Else", "PMO-911"))
            .await
            .unwrap();

        h.engine
            .handle_message(&text("U1", "PMO-911"))
            .await
            .unwrap();
        let texts = h.gateway.texts_to_user("U1").await;
        assert!(texts[0].contains("Billing Revamp"));

        h.engine
            .handle_message(&text("U1", "PMO-404"))
            .await
            .unwrap();
        assert!(h.gateway.texts_to_user("U1").await[1].contains("No project"));
    }

    #[tokio::test]
    async fn free_text_search_lists_matches() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Billing Revamp", "A", "PMO-1"))
            .await
            .unwrap();
        h.store
            .upsert_project(&cache_record("p-2", "Billing Portal", "B", "PMO-2"))
            .await
            .unwrap();
        h.store
            .upsert_project(&cache_record("p-3", "Warehouse Move", "C", "PMO-3"))
            .await
            .unwrap();

        h.engine
            .handle_message(&text("U1", "find billing"))
            .await
            .unwrap();
        let reply = &h.gateway.texts_to_user("U1").await[0];
        assert!(reply.contains("Billing Revamp"));
        assert!(reply.contains("Billing Portal"));
        assert!(!reply.contains("Warehouse"));
    }

    #[tokio::test]
    async fn outreach_excludes_projects_updated_today() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-1"))
            .await
            .unwrap();
        h.store
            .upsert_project(&cache_record("p-2", "Beta", "Dana Okafor", "PMO-2"))
            .await
            .unwrap();
        h.store
            .insert_update(&ProjectUpdate {
                project_id: "p-1".into(),
                user_id: "U1".into(),
                status: UpdateStatus::OnTrack,
                narrative: "done earlier".into(),
                has_blockers: false,
                blocker_note: None,
                created_at: now_iso(),
            })
            .await
            .unwrap();

        h.engine.run_outreach().await.unwrap();
        let state = h.store.get_conversation("U1").await.unwrap().unwrap();
        assert_eq!(state.queue.len(), 1);
        assert_eq!(state.queue[0].project_id, "p-2");
    }

    #[tokio::test]
    async fn idle_free_text_gets_the_help_hint() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;

        h.engine
            .handle_message(&text("U1", "what do I do"))
            .await
            .unwrap();
        assert!(h.gateway.texts_to_user("U1").await[0].contains("my projects"));
    }

    #[tokio::test]
    async fn gateway_failure_during_outreach_is_counted_not_fatal() {
        let h = harness().await;
        onboarded_user(&h, "U1", "Dana Okafor").await;
        h.store
            .upsert_project(&cache_record("p-1", "Alpha", "Dana Okafor", "PMO-1"))
            .await
            .unwrap();
        h.gateway.fail_next_sends(1);

        let summary = h.engine.run_outreach().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.started, 0);
    }
}
