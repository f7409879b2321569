// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cadence status bot.
//!
//! Provides the error types, domain model, deterministic risk evaluation,
//! and the adapter traits for the store, messaging gateway, and external
//! project source. Every other workspace crate builds on this one.

pub mod error;
pub mod risk;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CadenceError, SourceError};
pub use traits::{MessagingGateway, ProjectSource, StatusStore};
pub use types::{
    ActionKind, ActionPayload, ConversationState, ConversationStep, Escalation, PendingProject,
    ProjectCacheRecord, ProjectUpdate, Recipient, RefreshSummary, SweepSummary, TextEvent,
    UpdateStatus, UserProfile,
};
