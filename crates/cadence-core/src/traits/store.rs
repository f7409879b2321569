// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent store contract for users, updates, conversation state, and
//! the project cache.

use async_trait::async_trait;

use crate::error::CadenceError;
use crate::types::{ConversationState, ProjectCacheRecord, ProjectUpdate, UserProfile};

/// The store contract the bot core requires.
///
/// Entities are partitioned by natural key (user, project); no operation
/// spans more than one entity's record, so the backend never needs
/// cross-entity transactions.
#[async_trait]
pub trait StatusStore: Send + Sync {
    // --- Users ---

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, CadenceError>;

    /// Full overwrite of the profile row (insert or replace).
    async fn put_user(&self, user: &UserProfile) -> Result<(), CadenceError>;

    /// Removes the profile. Historical updates are never touched.
    async fn delete_user(&self, user_id: &str) -> Result<(), CadenceError>;

    async fn onboarded_users(&self) -> Result<Vec<UserProfile>, CadenceError>;

    // --- Project updates (append-only) ---

    async fn insert_update(&self, update: &ProjectUpdate) -> Result<(), CadenceError>;

    /// The `limit` most recent updates for a project, newest first.
    async fn recent_updates(
        &self,
        project_id: &str,
        limit: u32,
    ) -> Result<Vec<ProjectUpdate>, CadenceError>;

    /// Distinct project identifiers with an update created today (UTC).
    async fn project_ids_updated_today(&self) -> Result<Vec<String>, CadenceError>;

    // --- Conversation state ---

    /// The user's conversation state, if one exists and has not expired.
    async fn get_conversation(
        &self,
        user_id: &str,
    ) -> Result<Option<ConversationState>, CadenceError>;

    /// Full overwrite of the state row (insert or replace).
    async fn put_conversation(&self, state: &ConversationState) -> Result<(), CadenceError>;

    async fn clear_conversation(&self, user_id: &str) -> Result<(), CadenceError>;

    /// All non-expired conversation states.
    async fn active_conversations(&self) -> Result<Vec<ConversationState>, CadenceError>;

    // --- Project cache ---

    /// Full overwrite of the cache record, never a partial patch.
    async fn upsert_project(&self, record: &ProjectCacheRecord) -> Result<(), CadenceError>;

    async fn delete_project(&self, project_id: &str) -> Result<(), CadenceError>;

    async fn get_project(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectCacheRecord>, CadenceError>;

    async fn project_by_business_id(
        &self,
        business_id: &str,
    ) -> Result<Option<ProjectCacheRecord>, CadenceError>;

    /// Cache records whose owner matches `owner` case-insensitively.
    async fn projects_by_owner(
        &self,
        owner: &str,
    ) -> Result<Vec<ProjectCacheRecord>, CadenceError>;

    /// Substring search across cached project names.
    async fn search_projects(
        &self,
        needle: &str,
    ) -> Result<Vec<ProjectCacheRecord>, CadenceError>;
}
