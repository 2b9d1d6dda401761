use async_trait::async_trait;
use chrono_tz::Tz;
use std::sync::Arc;

use crate::handlers::action::{Action, ActionPayload, ScheduleDraft};
use crate::service::agenda_service::render_block_time;
use crate::service::messaging::MessageSender;

#[async_trait]
pub trait ApprovalPrompt: Send + Sync {
    async fn prompt(&self, action: &mut Action) -> Result<(), String>;
    async fn update_status(&self, action: &Action, message: &str) -> Result<(), String>;
    async fn update_status_message(
        &self,
        chat_id: &str,
        user_id: &str,
        message: &str,
    ) -> Result<(), String>;
}

pub fn render_draft_message(draft: &ScheduleDraft, tz: &Tz) -> String {
    let mut body = format!(
        "Please confirm this block:\nTitle: {}\nTime: {}",
        draft.title,
        render_block_time(draft.start, draft.end, tz)
    );
    if let Some(ctx) = &draft.extra_context {
        if !ctx.trim().is_empty() {
            body.push_str(&format!("\nAdditional context: {}", ctx.trim()));
        }
    }
    if draft.conflicts {
        body.push_str("\nThis overlaps something on your calendar.");
        if !draft.alternatives.is_empty() {
            body.push_str(" Free alternatives:");
            for (idx, slot) in draft.alternatives.iter().enumerate() {
                body.push_str(&format!(
                    "\n{}) {}",
                    idx + 1,
                    render_block_time(slot.start, slot.end, tz)
                ));
            }
        }
    }
    body.push_str("\nReply \"yes\" to confirm, \"no\" to cancel, or anything else as a correction.");
    body
}

/// Sends approval prompts and status updates through whatever chat channel
/// the runtime wired up.
pub struct SenderApprovalPrompt {
    sender: Arc<dyn MessageSender>,
    tz: Tz,
}

impl SenderApprovalPrompt {
    pub fn new(sender: Arc<dyn MessageSender>, tz: Tz) -> Self {
        Self { sender, tz }
    }
}

#[async_trait]
impl ApprovalPrompt for SenderApprovalPrompt {
    async fn prompt(&self, action: &mut Action) -> Result<(), String> {
        let draft = match action.payload.as_ref() {
            Some(ActionPayload::ScheduleDraft(draft)) => draft,
            _ => return Err("unsupported action payload".to_string()),
        };
        let message_body = render_draft_message(draft, &self.tz);
        self.sender
            .send_message(&draft.chat_id, &message_body)
            .await
    }

    async fn update_status(&self, action: &Action, message: &str) -> Result<(), String> {
        self.sender.send_message(&action.chat_id, message).await
    }

    async fn update_status_message(
        &self,
        chat_id: &str,
        _user_id: &str,
        message: &str,
    ) -> Result<(), String> {
        self.sender.send_message(chat_id, message).await
    }
}
