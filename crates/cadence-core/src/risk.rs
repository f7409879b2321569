// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic risk evaluation over the current and prior updates.
//!
//! Pure functions only: no I/O, no clock. The caller supplies prior updates
//! newest-first; only the single most recent prior update is inspected.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::types::{ProjectUpdate, UpdateStatus};

/// The status and blocker answer of the update being filed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentReport {
    pub status: UpdateStatus,
    pub has_blockers: bool,
}

/// Why an alert fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum AlertReason {
    #[strum(serialize = "off-track")]
    OffTrack,
    #[strum(serialize = "consecutive at-risk")]
    ConsecutiveAtRisk,
    #[strum(serialize = "blocker on at-risk project")]
    BlockerAtRisk,
}

/// Whether to escalate, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertDecision {
    pub should_alert: bool,
    pub reason: Option<AlertReason>,
}

impl AlertDecision {
    fn alert(reason: AlertReason) -> Self {
        Self {
            should_alert: true,
            reason: Some(reason),
        }
    }

    fn quiet() -> Self {
        Self {
            should_alert: false,
            reason: None,
        }
    }
}

/// Decide whether the current report warrants a supervisory escalation.
///
/// `prior` must be ordered newest-first; entries beyond the first are
/// ignored.
pub fn evaluate(current: CurrentReport, prior: &[ProjectUpdate]) -> AlertDecision {
    if current.status == UpdateStatus::OffTrack {
        return AlertDecision::alert(AlertReason::OffTrack);
    }

    if current.status == UpdateStatus::AtRisk
        && prior.first().map(|u| u.status) == Some(UpdateStatus::AtRisk)
    {
        return AlertDecision::alert(AlertReason::ConsecutiveAtRisk);
    }

    if current.has_blockers && current.status != UpdateStatus::OnTrack {
        return AlertDecision::alert(AlertReason::BlockerAtRisk);
    }

    AlertDecision::quiet()
}
