//! Host-environment query seam.
//!
//! The process runs inside an editor host that can answer structured
//! questions (diagnostics, open editors, workspace info). Queries are
//! correlated request/response exchanges with a bounded wait.

use async_trait::async_trait;
use crate::error::ChannelError;

#[async_trait]
pub trait HostQuery: Send + Sync {
    /// Ask the host `query` with an optional JSON payload.
    ///
    /// Fails closed with `ChannelError::NoResponse` when the host stays silent
    /// past the configured timeout and with `ChannelError::Host` when it
    /// answers with an error.
    async fn query(
        &self,
        query: &str,
        payload: Option<serde_json::Value>,
    ) -> std::result::Result<serde_json::Value, ChannelError>;
}
