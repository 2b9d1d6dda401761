use async_trait::async_trait;

use crate::clients::telegram_client;

/// Outbound chat seam. Reminder loops, rescue sweeps and approval prompts all
/// send through this, so tests substitute a recorder and an SMS gateway would
/// slot in without touching the callers.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: &str, content: &str) -> Result<(), String>;
}

pub struct TelegramSender {
    token: String,
}

impl TelegramSender {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_message(&self, chat_id: &str, content: &str) -> Result<(), String> {
        telegram_client::send_message(&self.token, chat_id, content)
            .await
            .map_err(|e| format!("Error sending message: {:?}", e))
    }
}
