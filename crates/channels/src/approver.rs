//! Shell approval over the message channel.

use async_trait::async_trait;
use steward_core::approval::{ApprovalDecision, ShellApprover};
use steward_core::error::ChannelError;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::SharedChannel;
use crate::protocol::Outbound;

pub const APPROVAL_RESPONSE: &str = "shell_approval_response";

/// Sends `shell_approval_request` and waits, without a timeout, for the
/// response carrying the same id.
pub struct ChannelApprover {
    channel: SharedChannel,
}

impl ChannelApprover {
    pub fn new(channel: SharedChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ShellApprover for ChannelApprover {
    async fn request_approval(
        &self,
        command: &str,
        cancel: &CancellationToken,
    ) -> Result<ApprovalDecision, ChannelError> {
        let id = Uuid::new_v4().to_string();
        let mut channel = self.channel.lock().await;

        info!(%id, command, "Requesting shell approval");
        channel
            .send(&Outbound::ShellApprovalRequest {
                command: command.to_string(),
                id: id.clone(),
            })
            .await?;

        let reply = channel
            .wait_for_cancellable(APPROVAL_RESPONSE, Some(&id), cancel)
            .await?
            .ok_or(ChannelError::Closed)?;

        Ok(ApprovalDecision::from_flags(
            reply.bool_field("approved"),
            reply.bool_field("approve_all"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageChannel, shared};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn approval_round_trip() {
        let (inbound, mut host_tx) = tokio::io::duplex(4096);
        let (outbound, host_rx) = tokio::io::duplex(4096);
        let approver = ChannelApprover::new(shared(MessageChannel::new(inbound, outbound)));

        let host = tokio::spawn(async move {
            let mut lines = BufReader::new(host_rx).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let request: serde_json::Value = serde_json::from_str(&line).unwrap();
            assert_eq!(request["type"], "shell_approval_request");
            assert_eq!(request["command"], "ls -la");
            let id = request["id"].as_str().unwrap().to_string();

            // an unrelated message and a stale response arrive first
            host_tx.write_all(b"{\"type\":\"toggle_debug\"}\n").await.unwrap();
            host_tx
                .write_all(b"{\"type\":\"shell_approval_response\",\"id\":\"stale\",\"approved\":true}\n")
                .await
                .unwrap();
            let reply = serde_json::json!({
                "type": "shell_approval_response",
                "id": id,
                "approved": true,
                "approve_all": true,
            });
            host_tx.write_all(format!("{reply}\n").as_bytes()).await.unwrap();
            host_tx
        });

        let decision = approver
            .request_approval("ls -la", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(decision, ApprovalDecision::ApproveAll);
        let _host_tx = host.await.unwrap();

        let channel = approver.channel.lock().await;
        assert_eq!(channel.pending_len(), 2);
    }

    #[tokio::test]
    async fn closed_channel_is_an_error() {
        let (inbound, host_tx) = tokio::io::duplex(4096);
        let (outbound, _host_rx) = tokio::io::duplex(4096);
        drop(host_tx);
        let approver = ChannelApprover::new(shared(MessageChannel::new(inbound, outbound)));

        let err = approver
            .request_approval("rm -rf /tmp/x", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }
}
