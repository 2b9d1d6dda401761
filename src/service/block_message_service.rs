use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::block::ScheduleBlock;
use crate::service::openai_service::OpenAIClient;

#[derive(Serialize)]
struct MessageContext<'a> {
    title: &'a str,
    start_time: DateTime<Utc>,
    hours_remaining: i64,
}

pub struct BlockMessageService;

impl BlockMessageService {
    /// Writes the reminder text for a block, preferring the model's phrasing
    /// and falling back to a deterministic line when the call fails.
    pub async fn build_message<C: OpenAIClient + ?Sized>(
        block: &ScheduleBlock,
        openai: &C,
        now: DateTime<Utc>,
    ) -> String {
        let hours_remaining = (block.start - now).num_hours();
        let context = MessageContext {
            title: block.title.as_str(),
            start_time: block.start,
            hours_remaining,
        };
        let structured = match serde_json::to_string(&context) {
            Ok(v) => v,
            Err(_) => return format!("Reminder: {} at {}", block.title, block.start),
        };

        match openai.generate_prompt(&structured, "block_message").await {
            Ok(body) if !body.trim().is_empty() => body,
            _ => format!("Reminder: {} at {}", block.title, block.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::block::BlockStatus;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FakeOpenAI {
        response: Result<String, String>,
    }

    #[async_trait]
    impl OpenAIClient for FakeOpenAI {
        async fn generate_prompt(
            &self,
            _prompt: &str,
            _prompt_type: &str,
        ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err(err) => Err(err.clone().into()),
            }
        }
    }

    fn gym_block() -> ScheduleBlock {
        ScheduleBlock {
            id: "b1".to_string(),
            user_id: "u1".to_string(),
            chat_id: "123".to_string(),
            title: "gym".to_string(),
            start: Utc.with_ymd_and_hms(2026, 2, 10, 18, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 2, 10, 19, 0, 0).unwrap(),
            goal_id: None,
            status: BlockStatus::Planned,
            reminder_times: Vec::new(),
        }
    }

    #[tokio::test]
    async fn build_message_uses_ai_response() {
        let fake = FakeOpenAI {
            response: Ok("Gym starts at 6, you have an hour to get ready.".to_string()),
        };
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 17, 0, 0).unwrap();
        let msg = BlockMessageService::build_message(&gym_block(), &fake, now).await;
        assert_eq!(msg, "Gym starts at 6, you have an hour to get ready.");
    }

    #[tokio::test]
    async fn build_message_falls_back_on_error() {
        let fake = FakeOpenAI {
            response: Err("boom".to_string()),
        };
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 17, 0, 0).unwrap();
        let msg = BlockMessageService::build_message(&gym_block(), &fake, now).await;
        assert!(msg.contains("Reminder: gym"));
        assert!(msg.contains("2026-02-10"));
    }
}
