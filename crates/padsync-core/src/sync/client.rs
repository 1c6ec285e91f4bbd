//! Sync client implementation
//!
//! Owns the document state, the save scheduler and the presenter, and runs
//! them from a single event loop. Inbound snapshots, local input, the
//! debounce deadline and save completions are handled one at a time, so the
//! document needs no locking.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::channel::ChannelEvent;
use super::error::SaveError;
use super::focus::EditingProbe;
use super::scheduler::{SavePolicy, SaveScheduler, SaveTicket};
use super::transport::SaveTransport;
use crate::document::DocumentState;
use crate::presenter::Presenter;

/// Commands sent to a running client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// The editor now holds exactly this text
    Input(String),
    /// Text typed at the end of the editor
    Append(String),
    /// The user completed a line
    Newline,
    /// Save immediately
    SaveNow,
    /// The session is being torn down; flush and stop
    Unload,
}

/// Sender side for [`ClientCommand`]s
#[derive(Debug, Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<ClientCommand>,
}

impl SyncHandle {
    /// Create a handle and the receiver to pass to [`SyncClient::run`]
    pub fn new() -> (Self, mpsc::Receiver<ClientCommand>) {
        let (command_tx, command_rx) = mpsc::channel(64);
        (Self { command_tx }, command_rx)
    }

    pub async fn input(&self, content: impl Into<String>) {
        self.send(ClientCommand::Input(content.into())).await;
    }

    pub async fn append(&self, text: impl Into<String>) {
        self.send(ClientCommand::Append(text.into())).await;
    }

    pub async fn newline(&self) {
        self.send(ClientCommand::Newline).await;
    }

    pub async fn save_now(&self) {
        self.send(ClientCommand::SaveNow).await;
    }

    pub async fn unload(&self) {
        self.send(ClientCommand::Unload).await;
    }

    async fn send(&self, command: ClientCommand) {
        if self.command_tx.send(command).await.is_err() {
            debug!("Sync client already stopped");
        }
    }
}

/// Result of one save request, reported back to the loop
#[derive(Debug)]
struct SaveCompletion {
    ticket: SaveTicket,
    content: String,
    result: Result<(), SaveError>,
}

/// Sync client for one document
pub struct SyncClient<T, P, E> {
    /// Short ID used in log lines
    session_id: String,
    doc: DocumentState,
    scheduler: SaveScheduler,
    transport: Arc<T>,
    presenter: P,
    probe: E,
    /// Join handles of requests that have not reported back yet
    in_flight: BTreeMap<u64, JoinHandle<Result<(), SaveError>>>,
    completion_tx: mpsc::UnboundedSender<SaveCompletion>,
    completion_rx: mpsc::UnboundedReceiver<SaveCompletion>,
}

impl<T, P, E> SyncClient<T, P, E>
where
    T: SaveTransport,
    P: Presenter,
    E: EditingProbe,
{
    /// Create a client starting from `initial`, the content loaded with the page
    pub fn new(
        initial: impl Into<String>,
        policy: SavePolicy,
        transport: T,
        presenter: P,
        probe: E,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let session_id = format!("padsync-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);

        Self {
            session_id,
            doc: DocumentState::new(initial),
            scheduler: SaveScheduler::new(policy),
            transport: Arc::new(transport),
            presenter,
            probe,
            in_flight: BTreeMap::new(),
            completion_tx,
            completion_rx,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn document(&self) -> &DocumentState {
        &self.doc
    }

    pub fn scheduler(&self) -> &SaveScheduler {
        &self.scheduler
    }

    /// Number of save requests that have not reported back
    pub fn saves_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Render the current content into the read-only view
    pub fn render_current(&mut self) {
        self.presenter.render(self.doc.editable());
    }

    /// Local input replaced the editor content
    pub fn on_input(&mut self, content: impl Into<String>) {
        self.doc.set_editable(content);
        self.scheduler.schedule(Instant::now());
    }

    /// Local input appended to the editor content
    pub fn on_append(&mut self, text: &str) {
        self.doc.append(text);
        self.scheduler.schedule(Instant::now());
    }

    /// The user completed a line
    pub fn on_newline(&mut self) {
        if self.scheduler.policy().flush_on_newline {
            self.save_now();
        } else {
            self.scheduler.schedule(Instant::now());
        }
    }

    /// Reconcile a snapshot pushed by the server
    ///
    /// Ignored while the user is editing or when it matches the editor.
    /// Otherwise it becomes both the editable content and the synced baseline.
    /// Returns true if the snapshot was applied.
    pub fn on_inbound_snapshot(&mut self, content: String) -> bool {
        if self.probe.is_editing() {
            debug!("[{}] Snapshot ignored: local edit in progress", self.session_id);
            return false;
        }
        if self.doc.is_current(&content) {
            return false;
        }

        debug!("[{}] Applying snapshot ({} bytes)", self.session_id, content.len());
        self.doc.accept_snapshot(content);
        self.presenter.render(self.doc.editable());
        true
    }

    /// Save immediately, cancelling any pending debounce
    ///
    /// Returns the sequence number of the issued request, or `None` when
    /// there is nothing new to save. The request runs on its own task and is
    /// not cancelled by later edits.
    pub fn save_now(&mut self) -> Option<u64> {
        self.scheduler.cancel();

        if !self.doc.needs_save() {
            return None;
        }
        let content = self.doc.editable().to_string();
        if self.scheduler.is_outstanding(&content) {
            debug!("[{}] Identical save already in flight", self.session_id);
            return None;
        }

        let ticket = self.scheduler.begin(&content);
        debug!(
            "[{}] Saving #{} ({} bytes)",
            self.session_id,
            ticket.seq,
            content.len()
        );

        let transport = Arc::clone(&self.transport);
        let completion_tx = self.completion_tx.clone();
        let handle = tokio::spawn(async move {
            let result = transport.save(&content).await;
            let _ = completion_tx.send(SaveCompletion {
                ticket,
                content,
                result: result.clone(),
            });
            result
        });
        self.in_flight.insert(ticket.seq, handle);

        Some(ticket.seq)
    }

    /// Apply a finished save
    fn on_save_completed(&mut self, completion: SaveCompletion) {
        let SaveCompletion {
            ticket,
            content,
            result,
        } = completion;
        self.in_flight.remove(&ticket.seq);
        self.scheduler.finish(ticket);

        match result {
            Ok(()) if self.scheduler.should_apply(ticket) => {
                self.scheduler.record_applied(ticket);
                self.doc.mark_saved(content);
                self.presenter.render(self.doc.last_synced());
                debug!("[{}] Save #{} applied", self.session_id, ticket.seq);
            }
            Ok(()) => {
                debug!(
                    "[{}] Save #{} completed after #{}; ignored",
                    self.session_id,
                    ticket.seq,
                    self.scheduler.applied_seq()
                );
            }
            Err(e) => {
                warn!("[{}] Save #{} failed: {}", self.session_id, ticket.seq, e);
                self.presenter.notify(&e.user_message());
            }
        }
    }

    /// Wait for the next save completion and apply it
    ///
    /// Returns false if nothing is in flight.
    pub async fn process_next_completion(&mut self) -> bool {
        if self.in_flight.is_empty() {
            return false;
        }
        match self.completion_rx.recv().await {
            Some(completion) => {
                self.on_save_completed(completion);
                true
            }
            None => false,
        }
    }

    /// Flush pending edits and wait up to `timeout` for every save in flight
    ///
    /// Completions are applied as they arrive, so a successful final save
    /// advances the synced baseline. Returns the failures seen while
    /// draining, or `None` if the timeout elapsed first.
    pub async fn finish(&mut self, timeout: Duration) -> Option<Vec<SaveError>> {
        self.save_now();

        let drain = async {
            let mut failures = Vec::new();
            while !self.in_flight.is_empty() {
                let Some(completion) = self.completion_rx.recv().await else {
                    break;
                };
                if let Err(e) = &completion.result {
                    failures.push(e.clone());
                }
                self.on_save_completed(completion);
            }
            failures
        };

        let drained = tokio::time::timeout(timeout, drain).await;
        match drained {
            Ok(failures) => Some(failures),
            Err(_) => {
                warn!(
                    "[{}] {} save(s) still in flight after {:?}",
                    self.session_id,
                    self.in_flight.len(),
                    timeout
                );
                None
            }
        }
    }

    /// Run the event loop until [`ClientCommand::Unload`] or until every
    /// [`SyncHandle`] is dropped
    ///
    /// Renders the initial content first. Channel events are optional: once
    /// the channel receiver closes, the client keeps serving local input.
    /// On exit pending edits are flushed without waiting for any request;
    /// returns the number of saves still in flight. Use
    /// [`SyncClient::finish`] to wait for them.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<ClientCommand>,
        mut channel_events: mpsc::Receiver<ChannelEvent>,
    ) -> usize {
        info!("[{}] Sync session started", self.session_id);
        self.render_current();
        let mut channel_open = true;

        loop {
            let deadline = self.scheduler.deadline();
            let debounce = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(ClientCommand::Input(content)) => self.on_input(content),
                        Some(ClientCommand::Append(text)) => self.on_append(&text),
                        Some(ClientCommand::Newline) => self.on_newline(),
                        Some(ClientCommand::SaveNow) => {
                            self.save_now();
                        }
                        Some(ClientCommand::Unload) | None => break,
                    }
                }
                event = channel_events.recv(), if channel_open => {
                    match event {
                        Some(ChannelEvent::Snapshot(content)) => {
                            self.on_inbound_snapshot(content);
                        }
                        Some(ChannelEvent::StateChanged(state)) => {
                            debug!("[{}] Channel state: {:?}", self.session_id, state);
                        }
                        Some(ChannelEvent::ReconnectScheduled { attempt, delay }) => {
                            debug!(
                                "[{}] Channel reconnect #{} in {:?}",
                                self.session_id, attempt, delay
                            );
                        }
                        None => {
                            debug!("[{}] Channel closed", self.session_id);
                            channel_open = false;
                        }
                    }
                }
                _ = debounce => {
                    self.save_now();
                }
                Some(completion) = self.completion_rx.recv() => {
                    self.on_save_completed(completion);
                }
            }
        }

        info!("[{}] Sync session ending", self.session_id);
        self.save_now();
        self.in_flight.len()
    }
}
