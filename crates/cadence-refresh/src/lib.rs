// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project-cache refresh pipeline for the Cadence status bot.

pub mod engine;

pub use engine::RefreshEngine;
