// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock project source with a scripted project universe.
//!
//! `MockSource` implements `ProjectSource` over an in-memory set of
//! projects, with optional per-project permission denials and a scripted
//! run of rate-limit responses for backoff tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use cadence_core::SourceError;
use cadence_core::traits::source::{
    ProjectDetail, ProjectPage, ProjectSource, ProjectStub, Workspace,
};

/// Page size served by the mock listing endpoint.
const MOCK_PAGE_SIZE: usize = 2;

/// A project source backed by a scripted in-memory universe.
#[derive(Default)]
pub struct MockSource {
    projects: Arc<Mutex<Vec<ProjectDetail>>>,
    archived: Arc<Mutex<HashSet<String>>>,
    denied: Arc<Mutex<HashSet<String>>>,
    /// Detail calls that answer 429 before the universe responds.
    rate_limit_detail_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience detail record with only the fields most tests set.
    pub fn project(
        id: &str,
        name: &str,
        owner: Option<&str>,
        status_label: Option<&str>,
        business_id: Option<&str>,
    ) -> ProjectDetail {
        ProjectDetail {
            id: id.to_string(),
            name: name.to_string(),
            owner: owner.map(String::from),
            status_label: status_label.map(String::from),
            business_id: business_id.map(String::from),
            due_date: None,
            last_note: None,
            last_note_at: None,
            progress_pct: None,
            pending_tasks: None,
            total_tasks: None,
        }
    }

    pub async fn add_project(&self, detail: ProjectDetail) {
        self.projects.lock().await.push(detail);
    }

    pub async fn add_archived(&self, id: &str, name: &str) {
        self.archived.lock().await.insert(id.to_string());
        self.add_project(Self::project(id, name, None, None, None))
            .await;
    }

    pub async fn remove_project(&self, id: &str) {
        self.projects.lock().await.retain(|p| p.id != id);
    }

    /// Make detail calls for `id` fail with `PermissionDenied`.
    pub async fn deny_project(&self, id: &str) {
        self.denied.lock().await.insert(id.to_string());
    }

    /// Make the next `n` detail calls fail with `RateLimited`.
    pub fn rate_limit_next_details(&self, n: usize) {
        self.rate_limit_detail_calls.store(n, Ordering::SeqCst);
    }

    /// Total detail calls served, including rate-limited ones.
    pub fn detail_call_count(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectSource for MockSource {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, SourceError> {
        Ok(vec![Workspace {
            id: "ws-mock".into(),
            name: "Mock Workspace".into(),
        }])
    }

    async fn list_projects(
        &self,
        _workspace_id: &str,
        cursor: Option<&str>,
    ) -> Result<ProjectPage, SourceError> {
        let projects = self.projects.lock().await;
        let archived = self.archived.lock().await;

        let start = match cursor {
            Some(c) => c.parse::<usize>().map_err(|_| SourceError::Decode {
                message: format!("bad cursor {c:?}"),
            })?,
            None => 0,
        };
        let page: Vec<ProjectStub> = projects
            .iter()
            .skip(start)
            .take(MOCK_PAGE_SIZE)
            .map(|p| ProjectStub {
                id: p.id.clone(),
                name: p.name.clone(),
                archived: archived.contains(&p.id),
            })
            .collect();
        let next = start + page.len();
        let next_cursor = (next < projects.len()).then(|| next.to_string());

        Ok(ProjectPage {
            projects: page,
            next_cursor,
        })
    }

    async fn project_detail(&self, project_id: &str) -> Result<ProjectDetail, SourceError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.rate_limit_detail_calls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.rate_limit_detail_calls
                .store(remaining - 1, Ordering::SeqCst);
            return Err(SourceError::RateLimited { retry_after: None });
        }

        if self.denied.lock().await.contains(project_id) {
            return Err(SourceError::PermissionDenied {
                project_id: project_id.to_string(),
            });
        }

        self.projects
            .lock()
            .await
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
            .ok_or_else(|| SourceError::PermissionDenied {
                project_id: project_id.to_string(),
            })
    }
}
