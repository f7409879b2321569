// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered TOML configuration for the Cadence status bot.
//!
//! Figment merges compiled defaults, system/XDG/local TOML files, and
//! `CADENCE_*` environment variables. Unknown keys are rejected at load
//! time.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CadenceConfig;

/// Load configuration and run semantic validation beyond what serde
/// enforces structurally.
///
/// Returns all validation failures at once so operators can fix a config
/// in one pass.
#[allow(clippy::result_large_err)]
pub fn load_and_validate() -> Result<CadenceConfig, Vec<String>> {
    let config = load_config().map_err(|e| vec![e.to_string()])?;
    let errors = validate(&config);
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(errors)
    }
}

/// Semantic validation of a loaded configuration.
pub fn validate(config: &CadenceConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.source.batch_size == 0 {
        errors.push("source.batch_size must be at least 1".to_string());
    }
    if config.source.cycle_deadline_secs == 0 {
        errors.push("source.cycle_deadline_secs must be at least 1".to_string());
    }
    if config.flow.retention_hours == 0 {
        errors.push("flow.retention_hours must be at least 1".to_string());
    }
    if config.reminders.stale_after_secs == 0 {
        errors.push("reminders.stale_after_secs must be at least 1".to_string());
    }
    if config.gateway.supervisor_channel.trim().is_empty() {
        errors.push("gateway.supervisor_channel must not be empty".to_string());
    }

    errors
}

/// Print validation errors to stderr in a consistent format.
pub fn render_errors(errors: &[String]) {
    eprintln!("cadence: invalid configuration");
    for error in errors {
        eprintln!("  - {error}");
    }
}
