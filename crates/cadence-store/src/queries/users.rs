// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User profile CRUD operations.

use cadence_core::{CadenceError, UserProfile};
use rusqlite::params;

use crate::database::Database;

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<UserProfile, rusqlite::Error> {
    Ok(UserProfile {
        user_id: row.get(0)?,
        tracker_name: row.get(1)?,
        timezone: row.get(2)?,
        onboarded: row.get::<_, i64>(3)? != 0,
        cached_projects: row.get(4)?,
        projects_cached_at: row.get(5)?,
    })
}

const USER_COLUMNS: &str =
    "user_id, tracker_name, timezone, onboarded, cached_projects, projects_cached_at";

/// Insert or fully replace a user profile.
pub async fn put_user(db: &Database, user: &UserProfile) -> Result<(), CadenceError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO users
                 (user_id, tracker_name, timezone, onboarded, cached_projects, projects_cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.user_id,
                    user.tracker_name,
                    user.timezone,
                    user.onboarded as i64,
                    user.cached_projects,
                    user.projects_cached_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

/// Get a user profile by ID.
pub async fn get_user(db: &Database, user_id: &str) -> Result<Option<UserProfile>, CadenceError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"))?;
            let result = stmt.query_row(params![user_id], row_to_user);
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a user profile. Historical updates are untouched.
pub async fn delete_user(db: &Database, user_id: &str) -> Result<(), CadenceError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM users WHERE user_id = ?1", params![user_id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}

/// All users that completed onboarding.
pub async fn onboarded_users(db: &Database) -> Result<Vec<UserProfile>, CadenceError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE onboarded = 1 ORDER BY user_id"
            ))?;
            let rows = stmt.query_map([], row_to_user)?;
            let mut users = Vec::new();
            for row in rows {
                users.push(row?);
            }
            Ok(users)
        })
        .await
        .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)
}
