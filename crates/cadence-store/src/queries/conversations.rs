// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state CRUD with retention-window expiry.
//!
//! SQLite has no row TTL, so expiry is enforced here: reads treat rows
//! with `expires_at <= now` as absent, and the active-state scan purges
//! them opportunistically. Abandoned flows therefore disappear without an
//! explicit clear.

use cadence_core::types::now_iso;
use cadence_core::{CadenceError, ConversationState, ConversationStep, UpdateStatus};
use rusqlite::params;

use crate::database::Database;

const STATE_COLUMNS: &str = "user_id, step, queue, current_index, active_project, \
     status_answer, blockers_answer, last_prompted_at, snoozed_until, expires_at";

fn json_err(idx: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_state(row: &rusqlite::Row<'_>) -> Result<ConversationState, rusqlite::Error> {
    let step_label: String = row.get(1)?;
    let step: ConversationStep = step_label.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let queue_json: String = row.get(2)?;
    let queue = serde_json::from_str(&queue_json).map_err(|e| json_err(2, e))?;
    let active_json: Option<String> = row.get(4)?;
    let active_project = match active_json {
        Some(json) => Some(serde_json::from_str(&json).map_err(|e| json_err(4, e))?),
        None => None,
    };
    let status_label: Option<String> = row.get(5)?;
    let status_answer = match status_label {
        Some(label) => Some(label.parse::<UpdateStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };
    Ok(ConversationState {
        user_id: row.get(0)?,
        step,
        queue,
        current_index: row.get::<_, i64>(3)? as usize,
        active_project,
        status_answer,
        blockers_answer: row.get::<_, Option<i64>>(6)?.map(|v| v != 0),
        last_prompted_at: row.get(7)?,
        snoozed_until: row.get(8)?,
        expires_at: row.get(9)?,
    })
}

/// Insert or fully replace a conversation state.
pub async fn put_conversation(
    db: &Database,
    state: &ConversationState,
) -> Result<(), CadenceError> {
    let state = state.clone();
    let queue_json = serde_json::to_string(&state.queue).map_err(|e| CadenceError::Storage {
        source: Box::new(e),
    })?;
    let active_json = state
        .active_project
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| CadenceError::Storage {
            source: Box::new(e),
        })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO conversations
                 (user_id, step, queue, current_index, active_project,
                  status_answer, blockers_answer, last_prompted_at, snoozed_until, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    state.user_id,
                    state.step.to_string(),
                    queue_json,
                    state.current_index as i64,
                    active_json,
                    state.status_answer.map(|s| s.to_string()),
                    state.blockers_answer.map(|b| b as i64),
                    state.last_prompted_at,
                    state.snoozed_until,
                    state.expires_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

/// The user's conversation state, if present and not expired.
pub async fn get_conversation(
    db: &Database,
    user_id: &str,
) -> Result<Option<ConversationState>, CadenceError> {
    let user_id = user_id.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STATE_COLUMNS} FROM conversations
                 WHERE user_id = ?1 AND expires_at > ?2"
            ))?;
            let result = stmt.query_row(params![user_id, now], row_to_state);
            match result {
                Ok(state) => Ok(Some(state)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove a user's conversation state.
pub async fn clear_conversation(db: &Database, user_id: &str) -> Result<(), CadenceError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM conversations WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

/// All non-expired conversation states. Purges expired rows first.
pub async fn active_conversations(db: &Database) -> Result<Vec<ConversationState>, CadenceError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM conversations WHERE expires_at <= ?1",
                params![now],
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {STATE_COLUMNS} FROM conversations ORDER BY last_prompted_at ASC"
            ))?;
            let rows = stmt.query_map([], row_to_state)?;
            let mut states = Vec::new();
            for row in rows {
                states.push(row?);
            }
            Ok(states)
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::PendingProject;
    use cadence_core::types::iso_after;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_state(user_id: &str, expires_in: Duration) -> ConversationState {
        let project = PendingProject {
            project_id: "p-1".into(),
            name: "Platform Alpha".into(),
            business_id: Some("PMO-12".into()),
            last_status: Some("on_track".into()),
        };
        ConversationState {
            user_id: user_id.to_string(),
            step: ConversationStep::AwaitingStatus,
            queue: vec![project.clone()],
            current_index: 0,
            active_project: Some(project),
            status_answer: None,
            blockers_answer: None,
            last_prompted_at: now_iso(),
            snoozed_until: None,
            expires_at: iso_after(expires_in),
        }
    }

    #[tokio::test]
    async fn state_round_trips_including_queue_json() {
        let (db, _dir) = setup_db().await;
        let state = make_state("U1", Duration::from_secs(3600));
        put_conversation(&db, &state).await.unwrap();

        let retrieved = get_conversation(&db, "U1").await.unwrap().unwrap();
        assert_eq!(retrieved, state);
        assert!(retrieved.is_consistent());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_state_reads_as_absent() {
        let (db, _dir) = setup_db().await;
        let mut state = make_state("U1", Duration::from_secs(3600));
        state.expires_at = "2020-01-01T00:00:00.000Z".into();
        put_conversation(&db, &state).await.unwrap();

        assert!(get_conversation(&db, "U1").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn active_scan_purges_expired_rows() {
        let (db, _dir) = setup_db().await;
        put_conversation(&db, &make_state("U1", Duration::from_secs(3600)))
            .await
            .unwrap();
        let mut stale = make_state("U2", Duration::from_secs(3600));
        stale.expires_at = "2020-01-01T00:00:00.000Z".into();
        put_conversation(&db, &stale).await.unwrap();

        let active = active_conversations(&db).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, "U1");

        // The expired row is physically gone, not just filtered.
        let count: i64 = db
            .connection()
            .call(|conn| {
                Ok::<i64, rusqlite::Error>(conn.query_row(
                    "SELECT COUNT(*) FROM conversations",
                    [],
                    |r| r.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn put_overwrites_previous_state_for_same_user() {
        let (db, _dir) = setup_db().await;
        let mut state = make_state("U1", Duration::from_secs(3600));
        put_conversation(&db, &state).await.unwrap();

        state.step = ConversationStep::AwaitingBlockers;
        state.status_answer = Some(UpdateStatus::AtRisk);
        put_conversation(&db, &state).await.unwrap();

        let retrieved = get_conversation(&db, "U1").await.unwrap().unwrap();
        assert_eq!(retrieved.step, ConversationStep::AwaitingBlockers);
        assert_eq!(retrieved.status_answer, Some(UpdateStatus::AtRisk));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn clear_conversation_removes_row() {
        let (db, _dir) = setup_db().await;
        put_conversation(&db, &make_state("U1", Duration::from_secs(3600)))
            .await
            .unwrap();
        clear_conversation(&db, "U1").await.unwrap();
        assert!(get_conversation(&db, "U1").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
