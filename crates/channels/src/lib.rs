//! The duplex message channel between Steward and its host.
//!
//! One JSON object per line in each direction. The orchestrator issues
//! nested request/response exchanges (shell approval, editor queries) on the
//! same stream the main pump reads, so `MessageChannel` correlates replies
//! by `(type, id)` and parks everything else for later delivery.
//!
//! - **protocol**: typed inbound/outbound messages
//! - **message_channel**: the correlated reader/writer
//! - **approver**: `ShellApprover` over the channel
//! - **host**: `HostQuery` over the channel

pub mod approver;
pub mod host;
pub mod message_channel;
pub mod protocol;

use std::sync::Arc;
use tokio::sync::Mutex;

pub use approver::ChannelApprover;
pub use host::HostBridge;
pub use message_channel::MessageChannel;
pub use protocol::{Envelope, Inbound, MessageMode, Outbound};

/// The channel as shared between the main pump and nested exchanges.
pub type SharedChannel = Arc<Mutex<MessageChannel>>;

/// Wrap a channel for sharing.
pub fn shared(channel: MessageChannel) -> SharedChannel {
    Arc::new(Mutex::new(channel))
}
