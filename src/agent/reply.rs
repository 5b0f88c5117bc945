//! Reply sink abstraction
//!
//! The orchestrator only ever talks to the user through a [`ReplySink`], which
//! keeps it independent of the messaging platform.

use anyhow::Result;
use async_trait::async_trait;

/// Destination for plain-text replies to the user
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Deliver one reply
    async fn reply(&self, text: &str) -> Result<()>;
}
