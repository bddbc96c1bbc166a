//! Built-in plugins registered by the `marvin` binary.

use std::sync::Arc;

use anyhow::anyhow;
use axum::routing::get;
use axum::Json;
use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::adapters::Adapter;
use crate::robot::{Robot, RobotError};

/// `@marvin ping` → `@user PONG`.
///
/// # Errors
///
/// Never fails; the pattern is fixed.
pub fn ping(robot: &mut Robot) -> Result<(), RobotError> {
    robot.respond(r"^ping$", |request| async move {
        request.reply("PONG").await?;
        Ok(())
    })
}

/// `@marvin echo <text>` → `<text>` posted back to the channel.
///
/// # Errors
///
/// Never fails; the pattern is fixed.
pub fn echo(robot: &mut Robot) -> Result<(), RobotError> {
    robot.respond(r"^echo (.+)$", |request| async move {
        let text = request.query.first().cloned().unwrap_or_default();
        request.send(&text).await?;
        Ok(())
    })
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: String,
    /// RFC 3339 time the response was produced.
    pub timestamp: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /health` on the auxiliary HTTP server.
///
/// # Errors
///
/// Never fails.
pub fn health(robot: &mut Robot) -> Result<(), RobotError> {
    robot.route("/health", get(health_check));
    Ok(())
}

/// Deferred plugin posting `<name> is online` to `channel_name` once the
/// adapter is connected.
pub fn announce(
    channel_name: String,
) -> impl FnOnce(&mut Robot) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static {
    move |robot: &mut Robot| -> BoxFuture<'static, anyhow::Result<()>> {
        let text = format!("{} is online", robot.name());
        Box::pin(post_to(robot.adapter(), channel_name, text))
    }
}

async fn post_to(adapter: Arc<dyn Adapter>, channel_name: String, text: String) -> anyhow::Result<()> {
    let channel = adapter
        .find_channel(&channel_name)
        .ok_or_else(|| anyhow!("unknown channel #{channel_name}"))?;
    adapter.send(&channel, &text).await?;
    Ok(())
}
