// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`StatusStore`] trait.

use async_trait::async_trait;
use tracing::debug;

use cadence_config::model::StorageConfig;
use cadence_core::types::today_utc;
use cadence_core::{
    CadenceError, ConversationState, ProjectCacheRecord, ProjectUpdate, StatusStore, UserProfile,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed status store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. Constructed fully initialized at process start and
/// passed by `Arc` to every component that needs it.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the configured database, running migrations if needed.
    pub async fn open(config: &StorageConfig) -> Result<Self, CadenceError> {
        let db = Database::open(&config.database_path).await?;
        if !config.wal_mode {
            db.connection()
                .call(|conn| {
                    conn.execute_batch("PRAGMA journal_mode = DELETE;")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err::<tokio_rusqlite::Error>)?;
        }
        debug!(path = %config.database_path, wal = config.wal_mode, "SQLite store ready");
        Ok(Self { db })
    }

    /// Checkpoint and release the underlying connection.
    pub async fn close(&self) -> Result<(), CadenceError> {
        self.db.close().await
    }

    /// The underlying database handle, for maintenance tooling.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl StatusStore for SqliteStore {
    // --- Users ---

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, CadenceError> {
        queries::users::get_user(&self.db, user_id).await
    }

    async fn put_user(&self, user: &UserProfile) -> Result<(), CadenceError> {
        queries::users::put_user(&self.db, user).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), CadenceError> {
        queries::users::delete_user(&self.db, user_id).await
    }

    async fn onboarded_users(&self) -> Result<Vec<UserProfile>, CadenceError> {
        queries::users::onboarded_users(&self.db).await
    }

    // --- Project updates ---

    async fn insert_update(&self, update: &ProjectUpdate) -> Result<(), CadenceError> {
        queries::updates::insert_update(&self.db, update).await
    }

    async fn recent_updates(
        &self,
        project_id: &str,
        limit: u32,
    ) -> Result<Vec<ProjectUpdate>, CadenceError> {
        queries::updates::recent_updates(&self.db, project_id, limit).await
    }

    async fn project_ids_updated_today(&self) -> Result<Vec<String>, CadenceError> {
        queries::updates::project_ids_updated_on(&self.db, &today_utc()).await
    }

    // --- Conversation state ---

    async fn get_conversation(
        &self,
        user_id: &str,
    ) -> Result<Option<ConversationState>, CadenceError> {
        queries::conversations::get_conversation(&self.db, user_id).await
    }

    async fn put_conversation(&self, state: &ConversationState) -> Result<(), CadenceError> {
        queries::conversations::put_conversation(&self.db, state).await
    }

    async fn clear_conversation(&self, user_id: &str) -> Result<(), CadenceError> {
        queries::conversations::clear_conversation(&self.db, user_id).await
    }

    async fn active_conversations(&self) -> Result<Vec<ConversationState>, CadenceError> {
        queries::conversations::active_conversations(&self.db).await
    }

    // --- Project cache ---

    async fn upsert_project(&self, record: &ProjectCacheRecord) -> Result<(), CadenceError> {
        queries::projects::upsert_project(&self.db, record).await
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), CadenceError> {
        queries::projects::delete_project(&self.db, project_id).await
    }

    async fn get_project(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectCacheRecord>, CadenceError> {
        queries::projects::get_project(&self.db, project_id).await
    }

    async fn project_by_business_id(
        &self,
        business_id: &str,
    ) -> Result<Option<ProjectCacheRecord>, CadenceError> {
        queries::projects::project_by_business_id(&self.db, business_id).await
    }

    async fn projects_by_owner(
        &self,
        owner: &str,
    ) -> Result<Vec<ProjectCacheRecord>, CadenceError> {
        queries::projects::projects_by_owner(&self.db, owner).await
    }

    async fn search_projects(
        &self,
        needle: &str,
    ) -> Result<Vec<ProjectCacheRecord>, CadenceError> {
        queries::projects::search_projects(&self.db, needle).await
    }
}
