// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot trigger subcommands.
//!
//! Each runs a single cycle the way the serve loops would and prints the
//! structured summary as JSON, so operators and cron-style invocations
//! can consume the counts.

use cadence_config::model::CadenceConfig;
use cadence_core::CadenceError;

use crate::context::AppContext;

pub async fn run_refresh(config: CadenceConfig) -> Result<(), CadenceError> {
    let ctx = AppContext::initialize(&config).await?;
    let summary = ctx.refresh.refresh_all().await?;
    print_summary(&summary)?;
    ctx.shutdown().await
}

pub async fn run_sweep(config: CadenceConfig) -> Result<(), CadenceError> {
    let ctx = AppContext::initialize(&config).await?;
    let summary = ctx.sweep.sweep().await?;
    print_summary(&summary)?;
    ctx.shutdown().await
}

pub async fn run_outreach(config: CadenceConfig) -> Result<(), CadenceError> {
    let ctx = AppContext::initialize(&config).await?;
    let summary = ctx.flow.run_outreach().await?;
    print_summary(&summary)?;
    ctx.shutdown().await
}

fn print_summary<T: serde::Serialize>(summary: &T) -> Result<(), CadenceError> {
    let rendered = serde_json::to_string_pretty(summary)
        .map_err(|e| CadenceError::Internal(format!("summary encode: {e}")))?;
    println!("{rendered}");
    Ok(())
}
