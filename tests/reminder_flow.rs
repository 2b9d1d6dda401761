use std::collections::HashMap;
use std::env;
use std::sync::{Mutex, OnceLock};

use chrono::TimeZone;
use goalPilot::models::block::{BlockStatus, ScheduleBlock};
use goalPilot::service::messaging::MessageSender;
use goalPilot::service::openai_service::OpenAIClient;
use goalPilot::tasks::reminder_loop::reminder_tick;
use tokio::sync::Mutex as TokioMutex;

struct FakeOpenAI {
    response: Result<String, String>,
}

#[async_trait::async_trait]
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

struct MockSender {
    sent: TokioMutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl MessageSender for MockSender {
    async fn send_message(&self, chat_id: &str, content: &str) -> Result<(), String> {
        let mut sent = self.sent.lock().await;
        sent.push((chat_id.to_string(), content.to_string()));
        Ok(())
    }
}

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

#[tokio::test]
async fn reminder_tick_sends_and_drains_due_reminders() {
    let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
    let temp_dir = env::temp_dir().join(format!("goalpilot_it_{}", uuid::Uuid::new_v4()));
    unsafe {
        env::set_var("DB_LOCATION", &temp_dir);
    }

    let now = chrono::Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap();
    let mut db: HashMap<String, ScheduleBlock> = HashMap::new();
    db.insert(
        "b1".to_string(),
        ScheduleBlock {
            id: "b1".to_string(),
            user_id: "@u".to_string(),
            chat_id: "123".to_string(),
            title: "gym".to_string(),
            start: now + chrono::Duration::hours(1),
            end: now + chrono::Duration::hours(2),
            goal_id: None,
            status: BlockStatus::Planned,
            reminder_times: vec![now - chrono::Duration::minutes(1)],
        },
    );

    let openai = FakeOpenAI {
        response: Ok("Gym starts in an hour, get moving.".to_string()),
    };
    let sender = MockSender {
        sent: TokioMutex::new(Vec::new()),
    };

    reminder_tick(&mut db, &sender, &openai, now)
        .await
        .expect("tick should succeed");

    let block = db.get("b1").expect("block should survive the tick");
    assert!(block.reminder_times.is_empty());
    assert_eq!(block.status, BlockStatus::Planned);

    let sent = sender.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "123");
    assert!(sent[0].1.contains("Gym starts in an hour"));
}

#[tokio::test]
async fn reminder_tick_ignores_future_reminders_and_missed_blocks() {
    let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
    let temp_dir = env::temp_dir().join(format!("goalpilot_it_{}", uuid::Uuid::new_v4()));
    unsafe {
        env::set_var("DB_LOCATION", &temp_dir);
    }

    let now = chrono::Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap();
    let mut db: HashMap<String, ScheduleBlock> = HashMap::new();
    db.insert(
        "future".to_string(),
        ScheduleBlock {
            id: "future".to_string(),
            user_id: "@u".to_string(),
            chat_id: "123".to_string(),
            title: "essay draft".to_string(),
            start: now + chrono::Duration::days(1),
            end: now + chrono::Duration::days(1) + chrono::Duration::hours(1),
            goal_id: None,
            status: BlockStatus::Planned,
            reminder_times: vec![now + chrono::Duration::hours(23)],
        },
    );
    db.insert(
        "missed".to_string(),
        ScheduleBlock {
            id: "missed".to_string(),
            user_id: "@u".to_string(),
            chat_id: "123".to_string(),
            title: "old block".to_string(),
            start: now - chrono::Duration::days(1),
            end: now - chrono::Duration::hours(23),
            goal_id: None,
            status: BlockStatus::Missed,
            reminder_times: vec![now - chrono::Duration::days(2)],
        },
    );

    let openai = FakeOpenAI {
        response: Err("should not be called".to_string()),
    };
    let sender = MockSender {
        sent: TokioMutex::new(Vec::new()),
    };

    reminder_tick(&mut db, &sender, &openai, now)
        .await
        .expect("tick should succeed");

    let sent = sender.sent.lock().await;
    assert!(sent.is_empty());
    assert_eq!(db.get("future").unwrap().reminder_times.len(), 1);
}
