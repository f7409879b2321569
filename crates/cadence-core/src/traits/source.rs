// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External project tracker contract.
//!
//! The tracker cannot filter server-side by owner or status, so the
//! refresh engine lists everything and issues one detail call per
//! project. Errors distinguish rate limiting (retry with backoff) from
//! permission denial (skip the project).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// One tracker workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

/// Listing-call view of a project: identity and archival flag only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStub {
    pub id: String,
    pub name: String,
    pub archived: bool,
}

/// One page of a paginated project listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPage {
    pub projects: Vec<ProjectStub>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Detail-call view of a project, with the named custom attributes the
/// cache needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub id: String,
    pub name: String,
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

/// Read-only client for the external project tracker.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, SourceError>;

    /// One page of projects in a workspace. Pass the previous page's
    /// `next_cursor` to continue.
    async fn list_projects(
        &self,
        workspace_id: &str,
        cursor: Option<&str>,
    ) -> Result<ProjectPage, SourceError>;

    async fn project_detail(&self, project_id: &str) -> Result<ProjectDetail, SourceError>;
}
