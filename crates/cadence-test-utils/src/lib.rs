// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles for the Cadence workspace.
//!
//! [`MockGateway`] captures outbound messaging for assertion and
//! [`MockSource`] serves a scripted project universe, so flow and
//! refresh tests run without network access.

pub mod mock_gateway;
pub mod mock_source;

pub use mock_gateway::{MockGateway, Sent};
pub use mock_source::MockSource;
