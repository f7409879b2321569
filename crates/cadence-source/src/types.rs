// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the tracker API.
//!
//! The tracker wraps single resources in a `data` envelope and paginates
//! listing endpoints with an opaque `next_page.offset` cursor. Project
//! attributes the bot needs (owner, status, business ID, task counts)
//! arrive as named custom fields with pre-rendered display values.

use serde::Deserialize;

use cadence_core::traits::source::ProjectDetail;

/// `data` envelope around a single resource.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceWire {
    pub gid: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectStubWire {
    pub gid: String,
    pub name: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct NextPage {
    pub offset: String,
}

/// One page of a project listing.
#[derive(Debug, Deserialize)]
pub struct ProjectPageWire {
    pub data: Vec<ProjectStubWire>,
    #[serde(default)]
    pub next_page: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
pub struct CustomFieldWire {
    pub name: String,
    #[serde(default)]
    pub display_value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LatestNoteWire {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectDetailWire {
    pub gid: String,
    pub name: String,
    #[serde(default)]
    pub due_on: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldWire>,
    #[serde(default)]
    pub latest_note: Option<LatestNoteWire>,
}

// Custom field names the tracker admins maintain. The tracker cannot
// filter by these server-side, which is why the refresh engine exists.
const FIELD_OWNER: &str = "Owner";
const FIELD_STATUS: &str = "Status";
const FIELD_BUSINESS_ID: &str = "Business ID";
const FIELD_PROGRESS: &str = "Progress";
const FIELD_PENDING_TASKS: &str = "Pending Tasks";
const FIELD_TOTAL_TASKS: &str = "Total Tasks";

impl ProjectDetailWire {
    fn field(&self, name: &str) -> Option<String> {
        self.custom_fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .and_then(|f| f.display_value.clone())
            .filter(|v| !v.trim().is_empty())
    }

    /// Flatten the wire shape into the domain detail view.
    pub fn into_detail(self) -> ProjectDetail {
        let owner = self.field(FIELD_OWNER);
        let status_label = self.field(FIELD_STATUS);
        let business_id = self.field(FIELD_BUSINESS_ID);
        let progress_pct = self
            .field(FIELD_PROGRESS)
            .and_then(|v| v.trim_end_matches('%').trim().parse::<f64>().ok());
        let pending_tasks = self
            .field(FIELD_PENDING_TASKS)
            .and_then(|v| v.trim().parse::<u32>().ok());
        let total_tasks = self
            .field(FIELD_TOTAL_TASKS)
            .and_then(|v| v.trim().parse::<u32>().ok());
        let (last_note, last_note_at) = match self.latest_note {
            Some(note) => (note.text, note.created_at),
            None => (None, None),
        };

        ProjectDetail {
            id: self.gid,
            name: self.name,
            owner,
            status_label,
            business_id,
            due_date: self.due_on,
            last_note,
            last_note_at,
            progress_pct,
            pending_tasks,
            total_tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail_json(fields: serde_json::Value) -> ProjectDetailWire {
        serde_json::from_value(serde_json::json!({
            "gid": "p-1",
            "name": "Billing Revamp",
            "due_on": "2026-06-30",
            "custom_fields": fields,
        }))
        .unwrap()
    }

    #[test]
    fn named_fields_are_extracted_case_insensitively() {
        let wire = detail_json(serde_json::json!([
            {"name": "owner", "display_value": "Dana Okafor"},
            {"name": "STATUS", "display_value": "On Track"},
            {"name": "Business ID", "display_value": "PMO-911"},
        ]));
        let detail = wire.into_detail();
        assert_eq!(detail.owner.as_deref(), Some("Dana Okafor"));
        assert_eq!(detail.status_label.as_deref(), Some("On Track"));
        assert_eq!(detail.business_id.as_deref(), Some("PMO-911"));
        assert_eq!(detail.due_date.as_deref(), Some("2026-06-30"));
    }

    #[test]
    fn blank_display_values_read_as_absent() {
        let wire = detail_json(serde_json::json!([
            {"name": "Owner", "display_value": "  "},
            {"name": "Business ID", "display_value": null},
        ]));
        let detail = wire.into_detail();
        assert_eq!(detail.owner, None);
        assert_eq!(detail.business_id, None);
    }

    #[test]
    fn progress_and_task_counts_parse_numerically() {
        let wire = detail_json(serde_json::json!([
            {"name": "Progress", "display_value": "62%"},
            {"name": "Pending Tasks", "display_value": "4"},
            {"name": "Total Tasks", "display_value": "19"},
        ]));
        let detail = wire.into_detail();
        assert_eq!(detail.progress_pct, Some(62.0));
        assert_eq!(detail.pending_tasks, Some(4));
        assert_eq!(detail.total_tasks, Some(19));
    }

    #[test]
    fn malformed_numeric_fields_are_dropped_not_errors() {
        let wire = detail_json(serde_json::json!([
            {"name": "Progress", "display_value": "n/a"},
            {"name": "Total Tasks", "display_value": "many"},
        ]));
        let detail = wire.into_detail();
        assert_eq!(detail.progress_pct, None);
        assert_eq!(detail.total_tasks, None);
    }
}
