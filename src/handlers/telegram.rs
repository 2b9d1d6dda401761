use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::clients::telegram_client;
use crate::handlers::inbound::{InboundDeps, handle_inbound_text};

/// Long-polls the Bot API and feeds each text message through the shared
/// inbound flow. Never returns; poll failures back off and retry.
pub async fn run_telegram_loop(token: Arc<String>, deps: InboundDeps) {
    let mut offset: i64 = 0;
    loop {
        let updates = match telegram_client::get_updates(&token, offset).await {
            Ok(updates) => updates,
            Err(err) => {
                eprintln!("Failed to poll Telegram updates: {}", err);
                sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            let Some(text) = message.text else {
                continue;
            };
            let Some(from) = message.from else {
                continue;
            };
            let chat_id = message.chat.id.to_string();
            let user_id = format!("@{}", from.id);

            if let Some(reply) =
                handle_inbound_text(&deps, &user_id, &chat_id, &text, Utc::now()).await
            {
                if let Err(err) = telegram_client::send_message(&token, &chat_id, &reply).await {
                    eprintln!("Failed to send Telegram reply: {}", err);
                }
            }
        }
    }
}
