// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cadence status bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Cadence configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CadenceConfig {
    /// Bot identity and logging settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// External project tracker settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Chat platform gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversation flow settings.
    #[serde(default)]
    pub flow: FlowConfig,

    /// Reminder sweep settings.
    #[serde(default)]
    pub reminders: ReminderConfig,

    /// Scheduled outreach and refresh trigger settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// HTTP trigger server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Bot identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name of the bot.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "cadence".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cadence").join("cadence.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("cadence.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// External project tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Base URL of the tracker API.
    #[serde(default = "default_source_base_url")]
    pub base_url: String,

    /// API token. `None` requires the environment override.
    #[serde(default)]
    pub token: Option<String>,

    /// Concurrent detail calls per refresh batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between refresh batches, milliseconds.
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Retry ceiling for rate-limited calls.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Overall refresh cycle deadline, seconds. Approaching it finishes
    /// the in-flight batch and returns partial counts.
    #[serde(default = "default_cycle_deadline_secs")]
    pub cycle_deadline_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_base_url(),
            token: None,
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
            max_retries: default_max_retries(),
            cycle_deadline_secs: default_cycle_deadline_secs(),
        }
    }
}

fn default_source_base_url() -> String {
    "https://tracker.example.com/api/1.0".to_string()
}

fn default_batch_size() -> usize {
    15
}

fn default_batch_pause_ms() -> u64 {
    1_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_cycle_deadline_secs() -> u64 {
    600
}

/// Chat platform gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the chat platform's message API.
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,

    /// Bearer token for the message API. `None` requires the environment
    /// override.
    #[serde(default)]
    pub token: Option<String>,

    /// Channel identifier that receives escalations.
    #[serde(default = "default_supervisor_channel")]
    pub supervisor_channel: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_base_url(),
            token: None,
            supervisor_channel: default_supervisor_channel(),
        }
    }
}

fn default_gateway_base_url() -> String {
    "https://chat.example.com/api".to_string()
}

fn default_supervisor_channel() -> String {
    "pm-escalations".to_string()
}

/// Conversation flow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FlowConfig {
    /// Hours an abandoned conversation state survives before expiring.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Seconds a snooze request defers reminder nudges.
    #[serde(default = "default_snooze_secs")]
    pub snooze_secs: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            snooze_secs: default_snooze_secs(),
        }
    }
}

fn default_retention_hours() -> u64 {
    72
}

fn default_snooze_secs() -> u64 {
    3_600
}

/// Reminder sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReminderConfig {
    /// Seconds since the last prompt before a conversation counts as
    /// stale.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_stale_after_secs() -> u64 {
    3_600
}

/// Scheduled trigger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Cron expression for the daily outreach trigger.
    #[serde(default = "default_outreach_cron")]
    pub outreach_cron: String,

    /// Seconds between cache refresh cycles.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Seconds between reminder sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            outreach_cron: default_outreach_cron(),
            refresh_interval_secs: default_refresh_interval_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_outreach_cron() -> String {
    // 09:00 UTC, Monday through Friday.
    "0 9 * * 1-5".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    3_600
}

fn default_sweep_interval_secs() -> u64 {
    900
}

/// HTTP trigger server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8710
}
