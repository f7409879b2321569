// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project cache CRUD and lookup queries.
//!
//! Upsert is a full overwrite of the record, never a partial patch, so
//! re-running a refresh cycle against an unchanged source leaves the
//! cache byte-identical.

use cadence_core::{CadenceError, ProjectCacheRecord};
use rusqlite::params;

use crate::database::Database;

const PROJECT_COLUMNS: &str = "project_id, name, owner, status_label, business_id, due_date, \
     last_note, last_note_at, progress_pct, pending_tasks, total_tasks";

/// Lowercased, trimmed owner name used as the lookup key.
pub fn normalize_owner(owner: &str) -> String {
    owner.trim().to_lowercase()
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<ProjectCacheRecord, rusqlite::Error> {
    Ok(ProjectCacheRecord {
        project_id: row.get(0)?,
        name: row.get(1)?,
        owner: row.get(2)?,
        status_label: row.get(3)?,
        business_id: row.get(4)?,
        due_date: row.get(5)?,
        last_note: row.get(6)?,
        last_note_at: row.get(7)?,
        progress_pct: row.get(8)?,
        pending_tasks: row.get(9)?,
        total_tasks: row.get(10)?,
    })
}

/// Insert or fully replace a cache record.
pub async fn upsert_project(db: &Database, record: &ProjectCacheRecord) -> Result<(), CadenceError> {
    let record = record.clone();
    let owner_normalized = record.owner.as_deref().map(normalize_owner);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO project_cache
                 (project_id, name, owner, owner_normalized, status_label, business_id,
                  due_date, last_note, last_note_at, progress_pct, pending_tasks, total_tasks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.project_id,
                    record.name,
                    record.owner,
                    owner_normalized,
                    record.status_label,
                    record.business_id,
                    record.due_date,
                    record.last_note,
                    record.last_note_at,
                    record.progress_pct,
                    record.pending_tasks,
                    record.total_tasks,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

/// Remove a cache record. Absence is not an error.
pub async fn delete_project(db: &Database, project_id: &str) -> Result<(), CadenceError> {
    let project_id = project_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM project_cache WHERE project_id = ?1",
                params![project_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

/// Point lookup by tracker project ID.
pub async fn get_project(
    db: &Database,
    project_id: &str,
) -> Result<Option<ProjectCacheRecord>, CadenceError> {
    let project_id = project_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM project_cache WHERE project_id = ?1"
            ))?;
            let result = stmt.query_row(params![project_id], row_to_record);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Point lookup by human-facing business ID, case-insensitive.
pub async fn project_by_business_id(
    db: &Database,
    business_id: &str,
) -> Result<Option<ProjectCacheRecord>, CadenceError> {
    let business_id = business_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM project_cache
                 WHERE business_id = ?1 COLLATE NOCASE"
            ))?;
            let result = stmt.query_row(params![business_id], row_to_record);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All cached projects for one owner, by normalized name.
pub async fn projects_by_owner(
    db: &Database,
    owner: &str,
) -> Result<Vec<ProjectCacheRecord>, CadenceError> {
    let owner_normalized = normalize_owner(owner);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM project_cache
                 WHERE owner_normalized = ?1 ORDER BY name"
            ))?;
            let rows = stmt.query_map(params![owner_normalized], row_to_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

/// Case-insensitive substring search across cached project names.
pub async fn search_projects(
    db: &Database,
    needle: &str,
) -> Result<Vec<ProjectCacheRecord>, CadenceError> {
    // Escape LIKE metacharacters so user input matches literally.
    let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    let pattern = format!("%{escaped}%");
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM project_cache
                 WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name"
            ))?;
            let rows = stmt.query_map(params![pattern], row_to_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}
