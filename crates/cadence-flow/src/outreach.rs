// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending-queue construction for the scheduled outreach trigger.

use std::collections::HashSet;

use cadence_core::{PendingProject, ProjectCacheRecord};
use serde::{Deserialize, Serialize};

/// Status label that marks a project as terminal in the cache.
const COMPLETED_LABEL: &str = "completed";

/// Outcome counts of one outreach trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachSummary {
    /// Onboarded users considered.
    pub eligible: usize,
    /// Users for whom a new conversation was started.
    pub started: usize,
    /// Users skipped because a conversation is already active.
    pub skipped_busy: usize,
    /// Users skipped because their queue came out empty.
    pub skipped_empty: usize,
    /// Users whose outreach failed; the trigger continues past them.
    pub failed: usize,
}

/// Builds one user's pending project queue from their cached projects.
///
/// Drops projects already reported on today and projects whose cached
/// status is terminal, then orders by the numeric business-ID ordinal
/// ascending. Projects without a parseable ordinal sort last, by name.
pub fn build_queue(
    cached: &[ProjectCacheRecord],
    updated_today: &HashSet<String>,
) -> Vec<PendingProject> {
    let mut queue: Vec<PendingProject> = cached
        .iter()
        .filter(|record| !updated_today.contains(&record.project_id))
        .filter(|record| {
            !record
                .status_label
                .as_deref()
                .is_some_and(|label| label.eq_ignore_ascii_case(COMPLETED_LABEL))
        })
        .map(|record| PendingProject {
            project_id: record.project_id.clone(),
            name: record.name.clone(),
            business_id: record.business_id.clone(),
            last_status: record.status_label.clone(),
        })
        .collect();

    queue.sort_by(|a, b| {
        match (a.business_ordinal(), b.business_ordinal()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        }
    });
    queue
}
