// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cadence status bot.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Cadence traits and core operations.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging gateway errors (delivery failure, malformed payload).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// External project source errors.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors returned by the external project source.
///
/// The refresh engine branches on these: rate limits are retried with
/// backoff, permission-denied drops the single project from the cycle,
/// everything else fails the call that issued it.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source rate-limited the request. Carries the server-provided
    /// retry-after hint when one was present.
    #[error("rate limited by project source")]
    RateLimited { retry_after: Option<Duration> },

    /// The credential cannot read this project. Skip, don't fail the batch.
    #[error("permission denied for project {project_id}")]
    PermissionDenied { project_id: String },

    /// Transport-level failure (connect, TLS, non-2xx without a known shape).
    #[error("source request failed: {message}")]
    Http {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode source response: {message}")]
    Decode { message: String },
}

impl SourceError {
    /// True when the error is worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }
}
