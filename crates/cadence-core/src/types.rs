// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Cadence workspace.
//!
//! All timestamps are UTC ISO-8601 strings with millisecond precision so
//! that lexicographic ordering equals chronological ordering. Store sort
//! keys depend on this.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timestamp format used for every persisted timestamp.
pub const ISO_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time as an ISO-8601 millisecond string.
pub fn now_iso() -> String {
    chrono::Utc::now().format(ISO_MILLIS).to_string()
}

/// UTC time `duration` from now, as an ISO-8601 millisecond string.
pub fn iso_after(duration: std::time::Duration) -> String {
    (chrono::Utc::now() + chrono::Duration::from_std(duration).unwrap_or_default())
        .format(ISO_MILLIS)
        .to_string()
}

/// Today's UTC date as `YYYY-MM-DD`, used for "updated today" scans.
pub fn today_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Status severity reported for a project, ordered least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    OnTrack,
    AtRisk,
    OffTrack,
}

impl UpdateStatus {
    /// Numeric risk score used for aggregate reporting only, never for
    /// the alert decision itself.
    pub fn risk_score(self) -> u8 {
        match self {
            UpdateStatus::OnTrack => 0,
            UpdateStatus::AtRisk => 1,
            UpdateStatus::OffTrack => 2,
        }
    }
}

/// Risk score for a raw status label, where an unknown label scores 0.
pub fn risk_score_for_label(label: &str) -> u8 {
    label
        .parse::<UpdateStatus>()
        .map(UpdateStatus::risk_score)
        .unwrap_or(0)
}

/// One onboarded (or onboarding) project manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque chat-platform user identifier.
    pub user_id: String,
    /// Display name as known to the external project tracker.
    pub tracker_name: Option<String>,
    /// IANA time zone identifier.
    pub timezone: Option<String>,
    /// True once name and time zone are captured.
    pub onboarded: bool,
    /// Cached project list as JSON, refreshed opportunistically.
    pub cached_projects: Option<String>,
    /// When `cached_projects` was last written.
    pub projects_cached_at: Option<String>,
}

impl UserProfile {
    /// A fresh, un-onboarded profile for a first-time sender.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            tracker_name: None,
            timezone: None,
            onboarded: false,
            cached_projects: None,
            projects_cached_at: None,
        }
    }
}

/// One immutable status report for one project. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub project_id: String,
    pub user_id: String,
    pub status: UpdateStatus,
    pub narrative: String,
    pub has_blockers: bool,
    pub blocker_note: Option<String>,
    /// ISO-8601 creation time; doubles as the descending sort key.
    pub created_at: String,
}

/// One entry in a user's pending project queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingProject {
    pub project_id: String,
    pub name: String,
    /// Human-facing short identifier, e.g. "PMO-911".
    pub business_id: Option<String>,
    /// Status label from the cache at queue-build time.
    pub last_status: Option<String>,
}

impl PendingProject {
    /// Numeric ordinal parsed from the business ID's trailing digits.
    ///
    /// "PMO-911" -> Some(911). Queue ordering puts unparseable ordinals
    /// last.
    pub fn business_ordinal(&self) -> Option<u64> {
        let id = self.business_id.as_deref()?;
        let digits: String = id
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        digits.parse().ok()
    }
}

/// Where the user currently is in the in-flow update collection cycle.
///
/// Onboarding (name, time zone) is derived from the [`UserProfile`]
/// rather than stored here: an un-onboarded profile with no name is
/// awaiting a name, one with a name but no time zone is awaiting a time
/// zone. A `ConversationState` row exists only while a project flow is
/// active.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStep {
    AwaitingStatus,
    AwaitingBlockers,
    AwaitingAdvances,
}

/// The single mutable record of one user's in-progress multi-project flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: String,
    pub step: ConversationStep,
    /// Ordered queue of projects still to report on this cycle.
    pub queue: Vec<PendingProject>,
    /// Index into `queue`; always valid while the state exists.
    pub current_index: usize,
    /// Denormalized copy of `queue[current_index]`.
    pub active_project: Option<PendingProject>,
    /// Status collected for the active project, if past that step.
    pub status_answer: Option<UpdateStatus>,
    /// Blockers yes/no collected for the active project, if past that step.
    pub blockers_answer: Option<bool>,
    /// When the user was last prompted (reminder sweep threshold input).
    pub last_prompted_at: String,
    /// Reminder suppression until this instant, when snoozed.
    pub snoozed_until: Option<String>,
    /// Hard retention bound; expired rows are invisible to reads.
    pub expires_at: String,
}

impl ConversationState {
    /// True when the state still satisfies its structural invariant:
    /// `current_index` addresses a queue entry and the denormalized
    /// active project matches it.
    pub fn is_consistent(&self) -> bool {
        match self.queue.get(self.current_index) {
            Some(entry) => self.active_project.as_ref() == Some(entry),
            None => false,
        }
    }
}

/// Queryable, denormalized snapshot of one tracker project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCacheRecord {
    pub project_id: String,
    pub name: String,
    /// Responsible-party name, normalized for owner lookups.
    pub owner: Option<String>,
    pub status_label: Option<String>,
    pub business_id: Option<String>,
    pub due_date: Option<String>,
    pub last_note: Option<String>,
    pub last_note_at: Option<String>,
    pub progress_pct: Option<f64>,
    pub pending_tasks: Option<u32>,
    pub total_tasks: Option<u32>,
}

/// What kind of button interaction an [`ActionPayload`] carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SelectStatus,
    AnswerBlockers,
    SelectTimezone,
}

/// Structured button payload.
///
/// Serialized explicitly with serde rather than joined on a delimiter,
/// so the project identifier survives even when the state lookup fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPayload {
    pub user_id: String,
    pub action: ActionKind,
    /// Present for per-project actions; the fallback identity when the
    /// stored state cannot resolve the active project.
    pub project_id: Option<String>,
    /// The chosen value: a status label, "yes"/"no", or a zone name.
    pub value: String,
}

/// A free-text message from a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEvent {
    pub user_id: String,
    pub text: String,
}

/// Outbound message target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Recipient {
    User(String),
    Channel(String),
}

/// Semantic fields of a supervisory-channel escalation. Formatting is
/// the gateway's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub project_name: String,
    pub user_id: String,
    pub status: UpdateStatus,
    pub narrative: String,
    pub has_blockers: bool,
    pub reason: String,
}

/// Outcome counts of one cache refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    /// Non-archived projects seen this cycle.
    pub total: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    /// Wall-clock milliseconds for the cycle.
    pub elapsed_ms: u64,
    /// True when the deadline truncated the cycle before all batches ran.
    pub truncated: bool,
}

/// Outcome counts of one reminder sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub scanned: usize,
    pub nudged: usize,
    pub advanced: usize,
    pub snoozed: usize,
    pub failed: usize,
}
