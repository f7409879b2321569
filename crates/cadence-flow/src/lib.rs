// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation flow for the Cadence status bot.
//!
//! The per-user state machine lives in [`reducer`] as a pure function
//! over explicit commands; [`handler`] wires it to the store and the
//! messaging gateway, [`outreach`] builds the daily pending queue, and
//! [`reminder`] nudges stalled flows.

pub mod commands;
pub mod handler;
pub mod outreach;
pub mod reducer;
pub mod reminder;

pub use handler::FlowEngine;
pub use outreach::OutreachSummary;
pub use reminder::ReminderSweep;
