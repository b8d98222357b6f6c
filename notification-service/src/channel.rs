use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// External delivery capability (email/SMS/push provider). The core only
/// depends on the send contract, not on any transport.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Stand-in channel: a bounded delay followed by success.
pub struct SimulatedChannel {
    delay: Duration,
}

impl SimulatedChannel {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(500),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationChannel for SimulatedChannel {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        info!(%recipient, %subject, "notification dispatched");
        Ok(())
    }
}
