//! Watch command handler
//!
//! Prints the note, then every update the server pushes, until Ctrl-C.

use anyhow::{Context, Result};
use tracing::info;

use padsync_core::sync::{
    spawn_channel, ChannelCommand, HttpTransport, SavePolicy, SyncClient, SyncHandle, WsConnector,
};
use padsync_core::Config;

use super::resolve_endpoints;
use crate::output::Output;
use crate::presenter::{RenderTarget, TerminalPresenter};

/// Follow a note read-only
pub async fn watch(target: &str, config: &Config, output: &Output) -> Result<()> {
    let endpoints = resolve_endpoints(target, config)?;
    let transport = HttpTransport::new(&endpoints);

    let initial = transport
        .fetch_initial()
        .await
        .context("Could not load the note")?;
    output.message(&format!("Watching {} (Ctrl-C to stop)", endpoints.page_url()));

    let presenter = TerminalPresenter::new(RenderTarget::Stdout, config.toast_duration());
    let channel = spawn_channel(config.channel_config(endpoints.channel_url()), WsConnector);
    let (handle, commands) = SyncHandle::new();

    // Nothing is ever typed, so snapshots are always applied and no save is
    // ever issued
    let mut client =
        SyncClient::new(initial, SavePolicy::default(), transport, presenter, || false);
    info!("Session {} watching {}", client.session_id(), endpoints.doc_id());

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        handle.unload().await;
    });

    client.run(commands, channel.event_rx).await;
    let _ = channel.command_tx.send(ChannelCommand::Shutdown).await;

    Ok(())
}
