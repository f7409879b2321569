// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the tracker API.
//!
//! Provides [`TrackerClient`], which handles request construction,
//! authentication, pagination decoding, and the mapping of HTTP failures
//! into the distinguished [`SourceError`] variants the refresh engine
//! branches on. Retry policy lives with the caller (see
//! [`crate::backoff`]), not here.

use std::time::Duration;

use async_trait::async_trait;
use cadence_config::model::SourceConfig;
use cadence_core::traits::source::{ProjectDetail, ProjectPage, ProjectSource, ProjectStub, Workspace};
use cadence_core::{CadenceError, SourceError};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use tracing::debug;

use crate::types::{Envelope, ProjectDetailWire, ProjectPageWire, WorkspaceWire};

/// Page size requested from listing endpoints.
const PAGE_LIMIT: u32 = 100;

/// HTTP client for the external project tracker.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    client: reqwest::Client,
    base_url: String,
}

impl TrackerClient {
    /// Creates a new tracker client from configuration.
    ///
    /// Fails fast when no API token is configured.
    pub fn new(config: &SourceConfig) -> Result<Self, CadenceError> {
        let token = config.token.as_deref().ok_or_else(|| {
            CadenceError::Config("source.token is required (or set CADENCE_SOURCE_TOKEN)".into())
        })?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| CadenceError::Config(format!("invalid source token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CadenceError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, SourceError> {
        let url = format!("{}{path}", self.base_url);
        self.client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Http {
                message: format!("GET {path} failed: {e}"),
                source: Some(Box::new(e)),
            })
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SourceError> {
        let body = response.text().await.map_err(|e| SourceError::Http {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| SourceError::Decode {
            message: format!("{e}"),
        })
    }
}

/// Parse a `Retry-After` header into a duration, if present and sane.
fn retry_after_hint(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Map a non-success status into the matching source error.
///
/// `denied_project` names the project whose detail call may legitimately
/// be forbidden; listing calls pass `None` so a 403 fails the cycle
/// instead of being silently skipped.
fn status_error(
    response: &reqwest::Response,
    denied_project: Option<&str>,
) -> SourceError {
    let status = response.status();
    match status {
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited {
            retry_after: retry_after_hint(response),
        },
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND if denied_project.is_some() => {
            SourceError::PermissionDenied {
                project_id: denied_project.unwrap_or_default().to_string(),
            }
        }
        _ => SourceError::Http {
            message: format!("tracker returned {status}"),
            source: None,
        },
    }
}

#[async_trait]
impl ProjectSource for TrackerClient {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, SourceError> {
        let response = self.get("/workspaces", &[]).await?;
        if !response.status().is_success() {
            return Err(status_error(&response, None));
        }
        let wire: Envelope<Vec<WorkspaceWire>> = Self::decode(response).await?;
        debug!(count = wire.data.len(), "workspaces listed");
        Ok(wire
            .data
            .into_iter()
            .map(|w| Workspace {
                id: w.gid,
                name: w.name,
            })
            .collect())
    }

    async fn list_projects(
        &self,
        workspace_id: &str,
        cursor: Option<&str>,
    ) -> Result<ProjectPage, SourceError> {
        let path = format!("/workspaces/{workspace_id}/projects");
        let limit = PAGE_LIMIT.to_string();
        let mut query: Vec<(&str, &str)> = vec![("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            query.push(("offset", cursor));
        }

        let response = self.get(&path, &query).await?;
        if !response.status().is_success() {
            return Err(status_error(&response, None));
        }
        let wire: ProjectPageWire = Self::decode(response).await?;
        debug!(
            workspace_id,
            count = wire.data.len(),
            has_more = wire.next_page.is_some(),
            "project page listed"
        );
        Ok(ProjectPage {
            projects: wire
                .data
                .into_iter()
                .map(|p| ProjectStub {
                    id: p.gid,
                    name: p.name,
                    archived: p.archived,
                })
                .collect(),
            next_cursor: wire.next_page.map(|n| n.offset),
        })
    }

    async fn project_detail(&self, project_id: &str) -> Result<ProjectDetail, SourceError> {
        let path = format!("/projects/{project_id}");
        let response = self.get(&path, &[]).await?;
        if !response.status().is_success() {
            return Err(status_error(&response, Some(project_id)));
        }
        let wire: Envelope<ProjectDetailWire> = Self::decode(response).await?;
        Ok(wire.data.into_detail())
    }
}
