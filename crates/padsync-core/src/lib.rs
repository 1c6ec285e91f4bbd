//! padsync Core Library
//!
//! This crate keeps a single text note synchronized with a notepad server.
//! Inbound updates arrive over a WebSocket push channel, outbound updates are
//! form-encoded HTTP submissions.
//!
//! # Architecture
//!
//! - **Document state**: the editable text plus the last content known to be
//!   durable on the server
//! - **Transport channel**: receive-only WebSocket with a fixed-delay
//!   reconnect loop
//! - **Save scheduler**: debounce deadline, newline flush, unload flush and
//!   sequence-tagged save requests
//! - **Sync client**: the coordinator that owns all of the above and runs a
//!   single event loop
//!
//! # Quick Start
//!
//! ```text
//! let endpoints = Endpoints::from_page_url("http://localhost:8080/abc12")?;
//! let transport = HttpTransport::new(&endpoints);
//! let initial = transport.fetch_initial().await?;
//!
//! let channel = spawn_channel(ChannelConfig::new(endpoints.channel_url()), WsConnector);
//! let (handle, commands) = SyncHandle::new();
//! let mut client = SyncClient::new(initial, policy, transport, presenter, || false);
//! let pending = client.run(commands, channel.event_rx).await;
//! ```
//!
//! # Modules
//!
//! - `document_id`: document identity and endpoint derivation
//! - `document`: editable vs. last-synced content
//! - `presenter`: rendering and notification interface
//! - `sync`: channel, scheduler, transport and the sync client
//! - `config`: application configuration

pub mod config;
pub mod document;
pub mod document_id;
pub mod presenter;
pub mod sync;

pub use config::Config;
pub use document::DocumentState;
pub use document_id::{DocumentId, DocumentIdError, EndpointError, Endpoints};
pub use presenter::{Presenter, RecordingPresenter, ToastState};
