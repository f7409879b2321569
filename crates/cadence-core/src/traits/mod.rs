// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the three external seams of the bot:
//! the persistent store, the messaging gateway, and the project source.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility, so
//! components hold `Arc<dyn ...>` handles constructed once at startup.

pub mod gateway;
pub mod source;
pub mod store;

pub use gateway::MessagingGateway;
pub use source::{ProjectDetail, ProjectPage, ProjectSource, ProjectStub, Workspace};
pub use store::StatusStore;
