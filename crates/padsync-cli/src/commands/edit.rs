//! Edit command handler
//!
//! Appends stdin to the note line by line while the push channel keeps the
//! local copy current. EOF or Ctrl-C flushes and exits.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use padsync_core::sync::{
    spawn_channel, ChannelCommand, FocusTracker, HttpTransport, SyncClient, SyncHandle,
    WsConnector,
};
use padsync_core::Config;

use super::resolve_endpoints;
use crate::output::Output;
use crate::presenter::{RenderTarget, TerminalPresenter};

/// How long to wait for in-flight saves after unload
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for `padsync edit`
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    /// Keep a copy of the synced content in this file
    pub view: Option<PathBuf>,
    /// Treat the editor as focused: remote pushes never replace local text
    pub hold_remote: bool,
}

/// Edit a note from stdin
pub async fn edit(
    target: &str,
    config: &Config,
    options: EditOptions,
    output: &Output,
) -> Result<()> {
    let endpoints = resolve_endpoints(target, config)?;
    let transport = HttpTransport::new(&endpoints);

    let initial = transport
        .fetch_initial()
        .await
        .context("Could not load the note")?;
    output.message(&format!(
        "Editing {} ({} bytes). Type to append, Ctrl-D to finish.",
        endpoints.page_url(),
        initial.len()
    ));

    let view = match options.view {
        Some(path) => RenderTarget::File(path),
        None => RenderTarget::Discard,
    };
    let presenter = TerminalPresenter::new(view, config.toast_duration());

    let focus = FocusTracker::new();
    if options.hold_remote {
        focus.focus_editor();
    }

    let channel = spawn_channel(config.channel_config(endpoints.channel_url()), WsConnector);
    let (handle, commands) = SyncHandle::new();
    let mut client = SyncClient::new(initial, config.save_policy(), transport, presenter, focus);
    info!("Session {} editing {}", client.session_id(), endpoints.doc_id());

    tokio::spawn(forward_stdin(handle));

    let in_flight = client.run(commands, channel.event_rx).await;
    let _ = channel.command_tx.send(ChannelCommand::Shutdown).await;

    if in_flight > 0 {
        debug!("Waiting for {} in-flight save(s)", in_flight);
    }
    let Some(failures) = client.finish(FLUSH_TIMEOUT).await else {
        output.warning("Timed out waiting for the final save");
        anyhow::bail!("Final save did not complete within {:?}", FLUSH_TIMEOUT);
    };

    let document = client.document();
    let unsaved = document.needs_save();
    if output.is_json() {
        println!(
            "{}",
            serde_json::json!({
                "note": endpoints.doc_id().to_string(),
                "url": endpoints.page_url(),
                "saved_bytes": document.last_synced().len(),
                "unsaved_changes": unsaved
            })
        );
    } else if unsaved {
        output.warning("Some changes were not saved");
    } else if !output.is_quiet() {
        output.success(&format!("Saved {} bytes", document.last_synced().len()));
    }

    // The presenter already showed the failure
    if unsaved {
        if let Some(err) = failures.last() {
            anyhow::bail!("Final save failed: {}", err);
        }
    }

    Ok(())
}

/// Feed stdin lines to the client until EOF or Ctrl-C, then unload
async fn forward_stdin(handle: SyncHandle) {
    let mut lines = spawn_stdin_reader();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.recv() => {
                match line {
                    Some(line) => {
                        handle.append(format!("{}\n", line)).await;
                        handle.newline().await;
                    }
                    None => break,
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    handle.unload().await;
}

/// Read stdin on a plain thread so a pending read never holds up shutdown
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (line_tx, line_rx) = mpsc::channel(64);

    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    line_rx
}
