use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::events::queue::EventBus;
use crate::events::worker::run_event_worker;
use crate::handlers::action::{ActionEngine, ActionStore};
use crate::handlers::inbound::InboundDeps;
use crate::handlers::telegram::run_telegram_loop;
use crate::handlers::webhook::run_http_server;
use crate::models::block::ScheduleBlock;
use crate::models::prefs::UserPrefs;
use crate::service::approval_prompt::{ApprovalPrompt, SenderApprovalPrompt};
use crate::service::calendar::{BlockCalendar, CalendarSource};
use crate::service::messaging::{MessageSender, TelegramSender};
use crate::service::openai_service::{OpenAIClient, OpenAIService};
use crate::service::routing::OpenAIRouter;
use crate::storage::DB;
use crate::tasks::reminder_loop::run_reminder_loop;
use crate::tasks::rescue_loop::run_rescue_loop;
use crate::tasks::task_runner::TaskRunner;

pub async fn run_api(
    blocks_db: Arc<Mutex<DB<ScheduleBlock>>>,
    prefs: UserPrefs,
    telegram_token: String,
    openai_api_key: String,
    http_port: u16,
) {
    let token_arc = Arc::new(telegram_token.clone());
    let openai: Arc<dyn OpenAIClient> =
        Arc::new(OpenAIService::new(openai_api_key, prefs.tz.to_string()));
    let sender: Arc<dyn MessageSender> = Arc::new(TelegramSender::new(telegram_token));
    let approval: Arc<dyn ApprovalPrompt> =
        Arc::new(SenderApprovalPrompt::new(sender.clone(), prefs.tz));
    let calendar: Arc<dyn CalendarSource> = Arc::new(BlockCalendar::new(blocks_db.clone()));

    let store = Arc::new(Mutex::new(ActionStore::new()));
    let (bus, rx) = EventBus::new(32);
    let engine = Arc::new(ActionEngine::new(
        store.clone(),
        openai.clone(),
        approval,
        calendar,
        blocks_db.clone(),
        prefs.clone(),
    ));

    let deps = InboundDeps {
        bus,
        store,
        router: Arc::new(OpenAIRouter::new(openai.clone())),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let mut task_runner = TaskRunner::new();
    task_runner.add_task("event worker", {
        move || {
            tokio::spawn(run_event_worker(rx, engine));
        }
    });
    task_runner.add_task("reminder loop", {
        let db = blocks_db.clone();
        let sender = sender.clone();
        let openai = openai.clone();
        move || {
            tokio::spawn(run_reminder_loop(db, sender, openai));
        }
    });
    task_runner.add_task("rescue loop", {
        let db = blocks_db.clone();
        let prefs = prefs.clone();
        let sender = sender.clone();
        move || {
            tokio::spawn(run_rescue_loop(db, prefs, sender));
        }
    });
    task_runner.add_task("http server", {
        let deps = deps.clone();
        move || {
            tokio::spawn(run_http_server(deps, http_port));
        }
    });
    task_runner.start_all();

    run_telegram_loop(token_arc, deps).await;
}
