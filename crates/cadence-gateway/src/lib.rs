// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat platform messaging gateway.
//!
//! Implements [`cadence_core::MessagingGateway`] over the platform's
//! HTTP message API. Message copy and button construction live in
//! [`messages`]; transport and authentication in [`client`].

pub mod client;
pub mod messages;

pub use client::ChatClient;
