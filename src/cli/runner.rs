//! CLI execution runner.
//!
//! Drives one tracking run: build the sink, watch the clipboard until the
//! idle timeout or Ctrl-C, then report why the run stopped.

use anyhow::{Context, Result};

use crate::source::ChangeSource;
use crate::tracker::{track, StopReason};

use super::bootstrap::CliContext;

/// Track clipboard changes until the run stops.
pub async fn execute(ctx: &CliContext) -> Result<StopReason> {
    let mut source = ctx.build_source();
    execute_with_source(ctx, &mut source).await
}

/// Track changes from an arbitrary source.
pub async fn execute_with_source<S>(ctx: &CliContext, source: &mut S) -> Result<StopReason>
where
    S: ChangeSource + ?Sized,
{
    if ctx.args.verbose {
        if let (Some(kind), Some(idle)) = (ctx.settings.app.sink, ctx.settings.app.idle) {
            eprintln!(
                "[cli] Forwarding clipboard changes to {} (idle timeout {})",
                kind,
                humantime::format_duration(idle)
            );
        }
    }

    let watcher = spawn_interrupt_watcher(ctx);

    let result = track(
        &ctx.settings,
        &ctx.registry,
        source,
        ctx.shutdown.child_token(),
    )
    .await
    .context("Clipboard tracking failed");

    // Stops the interrupt watcher
    ctx.shutdown.cancel();
    let _ = watcher.await;

    let reason = result?;
    tracing::info!("Tracking stopped: {}", reason);
    Ok(reason)
}

/// Render the resolved settings as pretty JSON, token masked.
pub fn render_config(ctx: &CliContext) -> Result<String> {
    serde_json::to_string_pretty(&ctx.redacted_settings()).context("Failed to serialize settings")
}

fn spawn_interrupt_watcher(ctx: &CliContext) -> tokio::task::JoinHandle<()> {
    let shutdown = ctx.shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => tracing::info!("Interrupted, stopping"),
                    Err(e) => tracing::warn!("Failed to listen for Ctrl-C: {}", e),
                }
                shutdown.cancel();
            }
        }
    })
}
