//! Sync layer
//!
//! Keeps the local note and the server copy in step.
//!
//! ## Flow
//!
//! 1. The channel task connects to `/ws/<id>` and forwards every frame as a
//!    snapshot, reconnecting after a fixed delay whenever the socket drops
//! 2. The client ignores snapshots while the user is editing, otherwise it
//!    adopts them as both the editable text and the synced baseline
//! 3. Local input arms the debounce deadline; newline and unload flush
//!    immediately
//! 4. Saves are tagged with sequence numbers so a slow, older response can
//!    never roll the baseline back
//!
//! ## Usage
//!
//! ```ignore
//! let channel = spawn_channel(ChannelConfig::new(endpoints.channel_url()), WsConnector);
//! let (handle, commands) = SyncHandle::new();
//! client.run(commands, channel.event_rx).await;
//! client.finish(Duration::from_secs(5)).await;
//! ```

mod channel;
mod client;
mod error;
mod focus;
mod scheduler;
mod transport;

pub use channel::{
    spawn_channel, ChannelCommand, ChannelConfig, ChannelEvent, ChannelHandle, ConnectionState,
    Connector, WsConnector, DEFAULT_RECONNECT_DELAY,
};
pub use client::{ClientCommand, SyncClient, SyncHandle};
pub use error::{ChannelError, SaveError, GENERIC_FAILURE_MESSAGE, TRANSPORT_FAILURE_MESSAGE};
pub use focus::{EditingProbe, FocusTracker};
pub use scheduler::{SavePolicy, SaveScheduler, SaveTicket, DEFAULT_SAVE_DELAY};
pub use transport::{HttpTransport, SaveTransport};
