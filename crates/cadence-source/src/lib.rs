// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the external project tracker.
//!
//! The tracker offers no server-side filtering by owner or status, so the
//! bot lists everything and fetches one detail per project; this crate
//! provides that client plus the backoff helper callers use around
//! rate-limited calls.

pub mod backoff;
pub mod client;
pub mod types;

pub use backoff::retry_rate_limited;
pub use client::TrackerClient;
