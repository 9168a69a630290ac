//! Editor host queries over the message channel.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use steward_core::error::ChannelError;
use steward_core::host::HostQuery;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::SharedChannel;
use crate::protocol::{Inbound, Outbound};

pub const QUERY_RESPONSE: &str = "editor_query_response";

/// Name used in the fail-closed `NoResponse` error.
pub const HOST_NAME: &str = "editor host";

/// Sends `editor_query` and waits a bounded time for the matching
/// `editor_query_response`.
pub struct HostBridge {
    channel: SharedChannel,
    timeout: Duration,
}

impl HostBridge {
    pub fn new(channel: SharedChannel, timeout: Duration) -> Self {
        Self { channel, timeout }
    }
}

#[async_trait]
impl HostQuery for HostBridge {
    async fn query(&self, query: &str, payload: Option<Value>) -> Result<Value, ChannelError> {
        let id = Uuid::new_v4().to_string();
        let mut channel = self.channel.lock().await;

        debug!(%id, query, "Sending editor query");
        channel
            .send(&Outbound::EditorQuery {
                query: query.to_string(),
                id: id.clone(),
                payload,
            })
            .await?;

        let Some(reply) = channel.wait_for(QUERY_RESPONSE, Some(&id), Some(self.timeout)).await? else {
            warn!(%id, query, "Editor query got no response");
            return Err(ChannelError::NoResponse(HOST_NAME.to_string()));
        };

        match Inbound::from_envelope(&reply) {
            Inbound::EditorQueryResponse { error: Some(error), .. } if !error.is_empty() => {
                Err(ChannelError::Host(error))
            }
            Inbound::EditorQueryResponse { result, .. } => Ok(result.unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        }
    }
}
