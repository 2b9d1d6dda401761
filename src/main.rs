#![allow(non_snake_case)]

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use goalPilot::cli;
use goalPilot::config::AppConfig;
use goalPilot::models::block::{self, ScheduleBlock};
use goalPilot::models::goal::{self, Goal};
use goalPilot::models::prefs::UserPrefs;
use goalPilot::runtime;
use goalPilot::storage::{DB, load_db};

const DEFAULT_RUN_MODE: &str = "cli";
const DEFAULT_HTTP_PORT: u32 = 3030;

#[tokio::main]
async fn main() {
    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };

    let blocks_db: DB<ScheduleBlock> =
        load_db(&block::get_db_location()).expect("Unable to load block database.");
    let shared_blocks = Arc::new(tokio::sync::Mutex::new(blocks_db));
    let goals_db: DB<Goal> =
        load_db(&goal::get_db_location()).unwrap_or_else(|_| HashMap::new());
    let shared_goals = Arc::new(tokio::sync::Mutex::new(goals_db));

    let prefs = UserPrefs::from_config(&config);
    let run_mode = config.get_or("RUN_MODE", DEFAULT_RUN_MODE);
    if run_mode == "api" {
        let telegram_token = config
            .get("TELEGRAM_BOT_TOKEN")
            .expect("TELEGRAM_BOT_TOKEN must be set for bot mode");
        let openai_api_key = config
            .get("OPENAI_API_KEY")
            .expect("OPENAI_API_KEY environment variable not set");
        let http_port = config.get_u32("HTTP_PORT").unwrap_or(DEFAULT_HTTP_PORT) as u16;
        runtime::run_api(
            shared_blocks,
            prefs,
            telegram_token,
            openai_api_key,
            http_port,
        )
        .await;
    } else if run_mode == "cli" {
        let default_user = config
            .get("DEFAULT_USER_ID")
            .expect("DEFAULT_USER_ID environment variable not set");
        let default_chat = config
            .get("DEFAULT_CHAT_ID")
            .expect("DEFAULT_CHAT_ID environment variable not set");
        let openai_api_key = config
            .get("OPENAI_API_KEY")
            .expect("OPENAI_API_KEY environment variable not set");
        cli::cli(
            shared_blocks,
            shared_goals,
            prefs,
            default_user,
            default_chat,
            openai_api_key,
        )
        .await;
    } else {
        println!("Invalid run mode {}", run_mode);
    }
}
