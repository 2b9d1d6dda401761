use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::models::block::{BlockStatus, ScheduleBlock, get_db_location};
use crate::service::block_message_service::BlockMessageService;
use crate::service::messaging::MessageSender;
use crate::service::openai_service::OpenAIClient;
use crate::storage::{DB, save_db};

pub async fn run_reminder_loop(
    db: Arc<Mutex<DB<ScheduleBlock>>>,
    sender: Arc<dyn MessageSender>,
    openai: Arc<dyn OpenAIClient>,
) {
    loop {
        sleep(Duration::from_secs(60)).await;
        let mut db = db.lock().await;
        if let Err(err) =
            reminder_tick(&mut db, sender.as_ref(), openai.as_ref(), Utc::now()).await
        {
            eprintln!("Reminder tick failed: {}", err);
        }
    }
}

/// Fires every reminder whose time has passed and drains it from the block.
/// Blocks themselves stay in the store; the rescue sweep decides their fate.
pub async fn reminder_tick<C: OpenAIClient + ?Sized, S: MessageSender + ?Sized>(
    db: &mut DB<ScheduleBlock>,
    sender: &S,
    openai: &C,
    now: DateTime<Utc>,
) -> Result<(), String> {
    let mut fired_any = false;
    for block in db.values_mut() {
        if block.status != BlockStatus::Planned {
            continue;
        }
        while let Some(reminder_time) = block.reminder_times.first().copied() {
            if reminder_time >= now {
                break;
            }
            let message_body = BlockMessageService::build_message(block, openai, now).await;
            sender.send_message(&block.chat_id, &message_body).await?;
            block.reminder_times.remove(0);
            fired_any = true;
        }
    }
    if fired_any {
        save_db(&get_db_location(), db).map_err(|e| e.to_string())?;
    }
    Ok(())
}
