// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only project update log.
//!
//! Rows are never updated or deleted. `created_at` is the descending sort
//! key; ISO-8601 strings keep lexicographic and chronological order
//! identical.

use cadence_core::{CadenceError, ProjectUpdate, UpdateStatus};
use rusqlite::params;

use crate::database::Database;

fn row_to_update(row: &rusqlite::Row<'_>) -> Result<ProjectUpdate, rusqlite::Error> {
    let status_label: String = row.get(2)?;
    let status: UpdateStatus = status_label.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ProjectUpdate {
        project_id: row.get(0)?,
        user_id: row.get(1)?,
        status,
        narrative: row.get(3)?,
        has_blockers: row.get::<_, i64>(4)? != 0,
        blocker_note: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Append one immutable update record.
pub async fn insert_update(db: &Database, update: &ProjectUpdate) -> Result<(), CadenceError> {
    let update = update.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO project_updates
                 (project_id, user_id, status, narrative, has_blockers, blocker_note, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    update.project_id,
                    update.user_id,
                    update.status.to_string(),
                    update.narrative,
                    update.has_blockers as i64,
                    update.blocker_note,
                    update.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

/// The `limit` most recent updates for one project, newest first.
pub async fn recent_updates(
    db: &Database,
    project_id: &str,
    limit: u32,
) -> Result<Vec<ProjectUpdate>, CadenceError> {
    let project_id = project_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT project_id, user_id, status, narrative, has_blockers, blocker_note, created_at
                 FROM project_updates
                 WHERE project_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![project_id, limit], row_to_update)?;
            let mut updates = Vec::new();
            for row in rows {
                updates.push(row?);
            }
            Ok(updates)
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

/// Distinct project IDs that received an update on the given UTC date
/// (`YYYY-MM-DD`).
pub async fn project_ids_updated_on(
    db: &Database,
    date: &str,
) -> Result<Vec<String>, CadenceError> {
    let day_start = format!("{date}T00:00:00.000Z");
    let day_end = format!("{date}T23:59:59.999Z");
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT project_id FROM project_updates
                 WHERE created_at >= ?1 AND created_at <= ?2",
            )?;
            let rows = stmt.query_map(params![day_start, day_end], |row| row.get(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_update(project_id: &str, created_at: &str, status: UpdateStatus) -> ProjectUpdate {
        ProjectUpdate {
            project_id: project_id.to_string(),
            user_id: "U1".to_string(),
            status,
            narrative: "steady progress".to_string(),
            has_blockers: false,
            blocker_note: None,
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn recent_updates_ordered_newest_first() {
        let (db, _dir) = setup_db().await;
        let earlier = make_update("p-1", "2026-03-01T09:00:00.000Z", UpdateStatus::OnTrack);
        let later = make_update("p-1", "2026-03-02T09:00:00.000Z", UpdateStatus::AtRisk);
        insert_update(&db, &earlier).await.unwrap();
        insert_update(&db, &later).await.unwrap();

        let updates = recent_updates(&db, "p-1", 2).await.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].status, UpdateStatus::AtRisk);
        assert_eq!(updates[1].status, UpdateStatus::OnTrack);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_updates_honors_limit_and_project_filter() {
        let (db, _dir) = setup_db().await;
        for day in 1..=5 {
            let update = make_update(
                "p-1",
                &format!("2026-03-0{day}T09:00:00.000Z"),
                UpdateStatus::OnTrack,
            );
            insert_update(&db, &update).await.unwrap();
        }
        insert_update(
            &db,
            &make_update("p-2", "2026-03-09T09:00:00.000Z", UpdateStatus::OffTrack),
        )
        .await
        .unwrap();

        let updates = recent_updates(&db, "p-1", 2).await.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].created_at, "2026-03-05T09:00:00.000Z");
        assert!(updates.iter().all(|u| u.project_id == "p-1"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn updated_on_returns_distinct_ids_for_the_day() {
        let (db, _dir) = setup_db().await;
        insert_update(
            &db,
            &make_update("p-1", "2026-03-05T08:00:00.000Z", UpdateStatus::OnTrack),
        )
        .await
        .unwrap();
        insert_update(
            &db,
            &make_update("p-1", "2026-03-05T15:00:00.000Z", UpdateStatus::OnTrack),
        )
        .await
        .unwrap();
        insert_update(
            &db,
            &make_update("p-2", "2026-03-04T23:59:00.000Z", UpdateStatus::OnTrack),
        )
        .await
        .unwrap();

        let ids = project_ids_updated_on(&db, "2026-03-05").await.unwrap();
        assert_eq!(ids, vec!["p-1".to_string()]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn blocker_note_round_trips() {
        let (db, _dir) = setup_db().await;
        let mut update = make_update("p-3", "2026-03-05T08:00:00.000Z", UpdateStatus::AtRisk);
        update.has_blockers = true;
        update.blocker_note = Some("waiting on vendor access".into());
        insert_update(&db, &update).await.unwrap();

        let updates = recent_updates(&db, "p-3", 1).await.unwrap();
        assert!(updates[0].has_blockers);
        assert_eq!(
            updates[0].blocker_note.as_deref(),
            Some("waiting on vendor access")
        );
        db.close().await.unwrap();
    }
}
