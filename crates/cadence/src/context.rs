// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared construction of the store, clients, and engines.
//!
//! Every client is built exactly once here and handed out by `Arc`;
//! subcommands and request handlers never construct their own.

use std::sync::Arc;

use cadence_config::model::CadenceConfig;
use cadence_core::{CadenceError, MessagingGateway, ProjectSource, StatusStore};
use cadence_flow::{FlowEngine, ReminderSweep};
use cadence_gateway::ChatClient;
use cadence_refresh::RefreshEngine;
use cadence_source::TrackerClient;
use cadence_store::SqliteStore;
use tracing::info;

/// Everything a trigger needs, constructed once at process start.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub flow: Arc<FlowEngine>,
    pub sweep: Arc<ReminderSweep>,
    pub refresh: Arc<RefreshEngine>,
}

impl AppContext {
    /// Opens the store and builds both HTTP clients and all engines.
    pub async fn initialize(config: &CadenceConfig) -> Result<Self, CadenceError> {
        let store = Arc::new(SqliteStore::open(&config.storage).await?);
        let gateway: Arc<dyn MessagingGateway> = Arc::new(ChatClient::new(&config.gateway)?);
        let source: Arc<dyn ProjectSource> = Arc::new(TrackerClient::new(&config.source)?);
        let store_dyn: Arc<dyn StatusStore> = store.clone();

        let flow = Arc::new(FlowEngine::new(
            store_dyn.clone(),
            gateway.clone(),
            config.flow.clone(),
        ));
        let sweep = Arc::new(ReminderSweep::new(
            store_dyn.clone(),
            gateway.clone(),
            config.reminders.clone(),
        ));
        let refresh = Arc::new(RefreshEngine::new(
            source,
            store_dyn,
            config.source.clone(),
        ));

        info!(database = %config.storage.database_path, "application context ready");
        Ok(Self {
            store,
            flow,
            sweep,
            refresh,
        })
    }

    /// Checkpoints and closes the store.
    pub async fn shutdown(&self) -> Result<(), CadenceError> {
        self.store.close().await
    }
}
