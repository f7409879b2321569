// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cadence serve` command implementation.
//!
//! Runs the HTTP trigger server plus three background loops: the
//! cron-scheduled outreach, the fixed-interval cache refresh, and the
//! fixed-interval reminder sweep. All four share one [`AppContext`] and
//! shut down together on SIGTERM/SIGINT.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cadence_config::model::CadenceConfig;
use cadence_core::{ActionPayload, CadenceError, TextEvent};
use croner::Cron;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::context::AppContext;

/// Runs the `cadence serve` command.
pub async fn run_serve(config: CadenceConfig) -> Result<(), CadenceError> {
    info!("starting cadence serve");

    // The cron expression is parsed up front so a bad one fails startup,
    // not the first scheduled firing.
    let outreach_cron: Cron = config
        .schedule
        .outreach_cron
        .parse()
        .map_err(|e| CadenceError::Config(format!("schedule.outreach_cron: {e}")))?;

    let ctx = Arc::new(AppContext::initialize(&config).await?);
    let cancel = install_signal_handler();

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(outreach_loop(
        ctx.clone(),
        outreach_cron,
        cancel.clone(),
    )));
    tasks.push(tokio::spawn(interval_loop(
        ctx.clone(),
        LoopKind::Refresh,
        Duration::from_secs(config.schedule.refresh_interval_secs),
        cancel.clone(),
    )));
    tasks.push(tokio::spawn(interval_loop(
        ctx.clone(),
        LoopKind::Sweep,
        Duration::from_secs(config.schedule.sweep_interval_secs),
        cancel.clone(),
    )));

    serve_http(&config, ctx.clone(), cancel.clone()).await?;

    // The server returned, so the token is cancelled; drain the loops.
    for task in tasks {
        if let Err(error) = task.await {
            warn!(%error, "background task panicked during shutdown");
        }
    }
    ctx.shutdown().await?;
    info!("cadence serve shutdown complete");
    Ok(())
}

/// Routes served to inbound triggers.
fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/v1/events/action", post(post_action))
        .route("/v1/events/message", post(post_message))
        .route("/v1/triggers/outreach", post(post_trigger_outreach))
        .route("/v1/triggers/refresh", post(post_trigger_refresh))
        .route("/v1/triggers/sweep", post(post_trigger_sweep))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn serve_http(
    config: &CadenceConfig,
    ctx: Arc<AppContext>,
    cancel: CancellationToken,
) -> Result<(), CadenceError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CadenceError::Internal(format!("failed to bind {addr}: {e}")))?;
    info!("trigger server listening on {addr}");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| CadenceError::Internal(format!("trigger server error: {e}")))
}

async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn post_action(
    State(ctx): State<Arc<AppContext>>,
    Json(payload): Json<ActionPayload>,
) -> Result<StatusCode, ApiError> {
    ctx.flow.handle_action(&payload).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn post_message(
    State(ctx): State<Arc<AppContext>>,
    Json(event): Json<TextEvent>,
) -> Result<StatusCode, ApiError> {
    ctx.flow.handle_message(&event).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn post_trigger_outreach(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = ctx.flow.run_outreach().await?;
    Ok(Json(serde_json::to_value(summary).map_err(internal)?))
}

async fn post_trigger_refresh(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = ctx.refresh.refresh_all().await?;
    Ok(Json(serde_json::to_value(summary).map_err(internal)?))
}

async fn post_trigger_sweep(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = ctx.sweep.sweep().await?;
    Ok(Json(serde_json::to_value(summary).map_err(internal)?))
}

fn internal(e: serde_json::Error) -> ApiError {
    ApiError(CadenceError::Internal(format!("summary encode: {e}")))
}

/// Error wrapper mapping [`CadenceError`] onto an HTTP response.
///
/// The detail goes to the log; the response body carries only a generic
/// message.
struct ApiError(CadenceError);

impl From<CadenceError> for ApiError {
    fn from(error: CadenceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "trigger failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "internal error" })),
        )
            .into_response()
    }
}

/// Which fixed-interval loop is running, for dispatch and log lines.
#[derive(Debug, Clone, Copy)]
enum LoopKind {
    Refresh,
    Sweep,
}

async fn interval_loop(
    ctx: Arc<AppContext>,
    kind: LoopKind,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the loop waits
    // a full period before its first run.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(?kind, "interval loop cancelled");
                return;
            }
            _ = interval.tick() => {
                let result = match kind {
                    LoopKind::Refresh => ctx.refresh.refresh_all().await.map(|_| ()),
                    LoopKind::Sweep => ctx.sweep.sweep().await.map(|_| ()),
                };
                if let Err(error) = result {
                    warn!(?kind, %error, "scheduled cycle failed");
                }
            }
        }
    }
}

async fn outreach_loop(ctx: Arc<AppContext>, cron: Cron, cancel: CancellationToken) {
    loop {
        let next = match cron.find_next_occurrence(&chrono::Utc::now(), false) {
            Ok(next) => next,
            Err(error) => {
                error!(%error, "no next outreach occurrence, stopping scheduler");
                return;
            }
        };
        let wait = (next - chrono::Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        debug!(next = %next, "next outreach scheduled");

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("outreach loop cancelled");
                return;
            }
            _ = tokio::time::sleep(wait) => {
                if let Err(error) = ctx.flow.run_outreach().await {
                    warn!(%error, "scheduled outreach failed");
                }
            }
        }
    }
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal
/// is received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
                error!("failed to install SIGTERM handler");
                let _ = ctrl_c.await;
                token_clone.cancel();
                return;
            };

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}
