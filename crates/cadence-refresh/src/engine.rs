// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk refresh of the project cache.
//!
//! Lists every project across every tracker workspace, fans detail calls
//! out in fixed-size batches, and classifies each result into upsert,
//! delete, or skip. Listing failures fail the cycle; a single project's
//! detail failure only drops that project. The cycle deadline truncates
//! between batches, never mid-batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_config::model::SourceConfig;
use cadence_core::traits::source::{ProjectDetail, ProjectStub};
use cadence_core::{CadenceError, ProjectCacheRecord, ProjectSource, RefreshSummary, StatusStore};
use cadence_source::retry_rate_limited;
use tracing::{debug, info, warn};

/// First backoff delay for rate-limited tracker calls.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Status label that marks a project as terminal.
const COMPLETED_LABEL: &str = "completed";

/// How one project was handled within a cycle.
enum Classified {
    Updated,
    Deleted,
    /// Not cached and not deleted: no cacheable identity, or the detail
    /// call failed for just this project.
    Skipped,
}

/// Orchestrates one full list-detail-classify refresh cycle.
pub struct RefreshEngine {
    source: Arc<dyn ProjectSource>,
    store: Arc<dyn StatusStore>,
    config: SourceConfig,
}

impl RefreshEngine {
    pub fn new(
        source: Arc<dyn ProjectSource>,
        store: Arc<dyn StatusStore>,
        config: SourceConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Runs one refresh cycle over the entire project universe.
    ///
    /// Returns partial counts with `truncated = true` when the deadline
    /// arrives before all batches ran. Only total inability to list
    /// projects or to reach the store fails the cycle.
    pub async fn refresh_all(&self) -> Result<RefreshSummary, CadenceError> {
        let started = Instant::now();
        let deadline = Duration::from_secs(self.config.cycle_deadline_secs);

        let stubs = self.list_live_projects().await?;
        let mut summary = RefreshSummary {
            total: stubs.len(),
            ..RefreshSummary::default()
        };
        info!(total = summary.total, "refresh cycle listing complete");

        let batch_size = self.config.batch_size.max(1);
        let mut batches = stubs.chunks(batch_size).peekable();
        while let Some(batch) = batches.next() {
            if started.elapsed() >= deadline {
                summary.truncated = true;
                warn!(
                    processed = summary.updated + summary.deleted + summary.skipped,
                    total = summary.total,
                    "cycle deadline reached, returning partial counts"
                );
                break;
            }

            let results =
                futures::future::join_all(batch.iter().map(|stub| self.fetch_and_classify(stub)))
                    .await;
            for result in results {
                match result? {
                    Classified::Updated => summary.updated += 1,
                    Classified::Deleted => summary.deleted += 1,
                    Classified::Skipped => summary.skipped += 1,
                }
            }

            if batches.peek().is_some() {
                tokio::time::sleep(Duration::from_millis(self.config.batch_pause_ms)).await;
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            updated = summary.updated,
            deleted = summary.deleted,
            skipped = summary.skipped,
            truncated = summary.truncated,
            elapsed_ms = summary.elapsed_ms,
            "refresh cycle complete"
        );
        Ok(summary)
    }

    /// Lists all non-archived projects across all workspaces. Archived
    /// entries are discarded here, before any detail call is spent on
    /// them.
    async fn list_live_projects(&self) -> Result<Vec<ProjectStub>, CadenceError> {
        let workspaces = retry_rate_limited(self.config.max_retries, RETRY_BASE_DELAY, || {
            self.source.list_workspaces()
        })
        .await?;

        let mut stubs = Vec::new();
        for workspace in &workspaces {
            let mut cursor: Option<String> = None;
            loop {
                let page = retry_rate_limited(self.config.max_retries, RETRY_BASE_DELAY, || {
                    self.source.list_projects(&workspace.id, cursor.as_deref())
                })
                .await?;
                stubs.extend(page.projects.into_iter().filter(|stub| !stub.archived));
                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
            debug!(workspace_id = %workspace.id, listed = stubs.len(), "workspace listed");
        }
        Ok(stubs)
    }

    /// One project's detail fetch and cache write.
    ///
    /// Tracker-side failures (rate-limit ceiling, permission denial)
    /// drop the project from this cycle and count as a skip; store
    /// failures propagate and fail the cycle.
    async fn fetch_and_classify(&self, stub: &ProjectStub) -> Result<Classified, CadenceError> {
        let detail = match retry_rate_limited(self.config.max_retries, RETRY_BASE_DELAY, || {
            self.source.project_detail(&stub.id)
        })
        .await
        {
            Ok(detail) => detail,
            Err(error) => {
                warn!(project_id = %stub.id, %error, "detail call failed, dropping project");
                return Ok(Classified::Skipped);
            }
        };

        if detail
            .status_label
            .as_deref()
            .is_some_and(|label| label.eq_ignore_ascii_case(COMPLETED_LABEL))
        {
            self.store.delete_project(&detail.id).await?;
            return Ok(Classified::Deleted);
        }
        if detail.owner.is_none() && detail.business_id.is_none() {
            debug!(project_id = %detail.id, "no owner or business ID, not cached");
            return Ok(Classified::Skipped);
        }

        self.store.upsert_project(&to_cache_record(detail)).await?;
        Ok(Classified::Updated)
    }
}

/// Full-overwrite cache record from a detail response.
fn to_cache_record(detail: ProjectDetail) -> ProjectCacheRecord {
    ProjectCacheRecord {
        project_id: detail.id,
        name: detail.name,
        owner: detail.owner,
        status_label: detail.status_label,
        business_id: detail.business_id,
        due_date: detail.due_date,
        last_note: detail.last_note,
        last_note_at: detail.last_note_at,
        progress_pct: detail.progress_pct,
        pending_tasks: detail.pending_tasks,
        total_tasks: detail.total_tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_config::model::StorageConfig;
    use cadence_store::SqliteStore;
    use cadence_test_utils::MockSource;
    use tempfile::TempDir;

    struct Harness {
        engine: RefreshEngine,
        source: Arc<MockSource>,
        store: Arc<SqliteStore>,
        _dir: TempDir,
    }

    async fn harness_with(config: SourceConfig) -> Harness {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            database_path: dir
                .path()
                .join("cadence.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteStore::open(&storage).await.unwrap());
        let source = Arc::new(MockSource::new());
        let engine = RefreshEngine::new(source.clone(), store.clone(), config);
        Harness {
            engine,
            source,
            store,
            _dir: dir,
        }
    }

    fn fast_config() -> SourceConfig {
        SourceConfig {
            batch_size: 3,
            batch_pause_ms: 0,
            max_retries: 3,
            cycle_deadline_secs: 600,
            ..SourceConfig::default()
        }
    }

    async fn harness() -> Harness {
        harness_with(fast_config()).await
    }

    #[tokio::test]
    async fn classifies_update_delete_and_skip() {
        let h = harness().await;
        h.source
            .add_project(MockSource::project(
                "p-1",
                "Alpha",
                Some("Dana"),
                Some("On Track"),
                Some("PMO-1"),
            ))
            .await;
        h.source
            .add_project(MockSource::project(
                "p-2",
                "Beta",
                Some("Dana"),
                Some("Completed"),
                Some("PMO-2"),
            ))
            .await;
        // No owner, no business ID.
        h.source
            .add_project(MockSource::project("p-3", "Gamma", None, None, None))
            .await;

        let summary = h.engine.refresh_all().await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.truncated);

        assert!(h.store.get_project("p-1").await.unwrap().is_some());
        assert!(h.store.get_project("p-2").await.unwrap().is_none());
        assert!(h.store.get_project("p-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn archived_projects_never_get_a_detail_call() {
        let h = harness().await;
        h.source
            .add_project(MockSource::project(
                "p-1",
                "Alpha",
                Some("Dana"),
                None,
                Some("PMO-1"),
            ))
            .await;
        h.source.add_archived("p-old", "Legacy").await;

        let summary = h.engine.refresh_all().await.unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(h.source.detail_call_count(), 1);
    }

    #[tokio::test]
    async fn completed_any_case_deletes_a_previously_cached_record() {
        let h = harness().await;
        h.source
            .add_project(MockSource::project(
                "p-1",
                "Alpha",
                Some("Dana"),
                Some("On Track"),
                Some("PMO-1"),
            ))
            .await;
        h.engine.refresh_all().await.unwrap();
        assert!(h.store.get_project("p-1").await.unwrap().is_some());

        h.source.remove_project("p-1").await;
        h.source
            .add_project(MockSource::project(
                "p-1",
                "Alpha",
                Some("Dana"),
                Some("COMPLETED"),
                Some("PMO-1"),
            ))
            .await;

        let summary = h.engine.refresh_all().await.unwrap();
        assert_eq!(summary.deleted, 1);
        assert!(h.store.get_project("p-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn permission_denied_drops_only_that_project() {
        let h = harness().await;
        h.source
            .add_project(MockSource::project(
                "p-1",
                "Alpha",
                Some("Dana"),
                None,
                Some("PMO-1"),
            ))
            .await;
        h.source
            .add_project(MockSource::project(
                "p-9",
                "Secret",
                Some("Dana"),
                None,
                Some("PMO-9"),
            ))
            .await;
        h.source.deny_project("p-9").await;

        let summary = h.engine.refresh_all().await.unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 1);
        assert!(h.store.get_project("p-1").await.unwrap().is_some());
        assert!(h.store.get_project("p-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rate_limited_detail_is_retried_to_success() {
        let h = harness().await;
        h.source
            .add_project(MockSource::project(
                "p-1",
                "Alpha",
                Some("Dana"),
                None,
                Some("PMO-1"),
            ))
            .await;
        h.source.rate_limit_next_details(2);

        let summary = h.engine.refresh_all().await.unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(h.source.detail_call_count(), 3);
    }

    #[tokio::test]
    async fn rate_limit_ceiling_drops_the_project() {
        let h = harness().await;
        h.source
            .add_project(MockSource::project(
                "p-1",
                "Alpha",
                Some("Dana"),
                None,
                Some("PMO-1"),
            ))
            .await;
        // More 429s than the retry ceiling allows.
        h.source.rate_limit_next_details(5);

        let summary = h.engine.refresh_all().await.unwrap();
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn two_runs_yield_identical_cache_and_counts() {
        let h = harness().await;
        for i in 0..5 {
            h.source
                .add_project(MockSource::project(
                    &format!("p-{i}"),
                    &format!("Project {i}"),
                    Some("Dana"),
                    Some("On Track"),
                    Some(&format!("PMO-{i}")),
                ))
                .await;
        }

        let first = h.engine.refresh_all().await.unwrap();
        let snapshot_a = h.store.projects_by_owner("Dana").await.unwrap();
        let second = h.engine.refresh_all().await.unwrap();
        let snapshot_b = h.store.projects_by_owner("Dana").await.unwrap();

        assert_eq!(first.updated, 5);
        assert_eq!(second.updated, 5);
        assert_eq!(second.deleted, 0);
        assert_eq!(second.skipped, first.skipped);
        assert_eq!(snapshot_a, snapshot_b);
    }

    #[tokio::test]
    async fn zero_deadline_truncates_before_the_first_batch() {
        let h = harness_with(SourceConfig {
            cycle_deadline_secs: 0,
            ..fast_config()
        })
        .await;
        h.source
            .add_project(MockSource::project(
                "p-1",
                "Alpha",
                Some("Dana"),
                None,
                Some("PMO-1"),
            ))
            .await;

        let summary = h.engine.refresh_all().await.unwrap();
        assert!(summary.truncated);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(h.source.detail_call_count(), 0);
    }

    #[tokio::test]
    async fn empty_universe_is_a_clean_no_op() {
        let h = harness().await;
        let summary = h.engine.refresh_all().await.unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.updated, 0);
        assert!(!summary.truncated);
    }
}
