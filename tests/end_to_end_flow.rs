use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::UTC;
use goalPilot::events::queue::EventBus;
use goalPilot::events::worker::run_event_worker;
use goalPilot::handlers::action::{Action, ActionEngine, ActionStore};
use goalPilot::handlers::inbound::{InboundDeps, handle_inbound_text};
use goalPilot::models::block::ScheduleBlock;
use goalPilot::models::prefs::UserPrefs;
use goalPilot::scheduler::availability::{AvailabilityWindow, BusyInterval};
use goalPilot::service::approval_prompt::ApprovalPrompt;
use goalPilot::service::calendar::CalendarSource;
use goalPilot::service::openai_service::OpenAIClient;
use goalPilot::service::routing::HeuristicRouter;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep, timeout};

static ENV_LOCK: StdMutex<()> = StdMutex::new(());

fn prepare_db_location(test_name: &str) -> std::sync::MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock().unwrap();
    let base = format!("./data/test_{}", test_name);
    std::fs::create_dir_all(&base).unwrap();
    unsafe {
        std::env::set_var("DB_LOCATION", &base);
    }
    guard
}

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

struct CapturingApprovalPrompt {
    prompts: Mutex<Vec<String>>,
}

impl CapturingApprovalPrompt {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }

    async fn latest_action_id(&self) -> Option<String> {
        let prompts = self.prompts.lock().await;
        prompts.last().cloned()
    }
}

#[async_trait]
impl ApprovalPrompt for CapturingApprovalPrompt {
    async fn prompt(&self, action: &mut Action) -> Result<(), String> {
        let mut prompts = self.prompts.lock().await;
        prompts.push(action.id.clone());
        Ok(())
    }

    async fn update_status(&self, _action: &Action, _message: &str) -> Result<(), String> {
        Ok(())
    }

    async fn update_status_message(
        &self,
        _chat_id: &str,
        _user_id: &str,
        _message: &str,
    ) -> Result<(), String> {
        Ok(())
    }
}

struct EmptyCalendar;

#[async_trait]
impl CalendarSource for EmptyCalendar {
    async fn busy_between(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, String> {
        Ok(Vec::new())
    }
}

fn test_prefs() -> UserPrefs {
    UserPrefs {
        tz: UTC,
        windows: vec![AvailabilityWindow {
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        }],
        display_tzs: Vec::new(),
    }
}

const GYM_JSON: &str =
    "{\"action\":\"create\",\"title\":\"gym\",\"start\":\"2027-06-01T18:00:00Z\",\"end\":\"2027-06-01T19:00:00Z\"}";

#[tokio::test]
async fn end_to_end_schedule_confirm_flow() {
    let _guard = prepare_db_location("end_to_end_schedule_confirm_flow");

    let (bus, rx) = EventBus::new(16);
    let store = Arc::new(Mutex::new(ActionStore::new()));
    let openai = Arc::new(FakeOpenAI {
        response: Ok(GYM_JSON.to_string()),
    });
    let approval = Arc::new(CapturingApprovalPrompt::new());
    let blocks_db = Arc::new(Mutex::new(HashMap::<String, ScheduleBlock>::new()));

    let engine = Arc::new(ActionEngine::new(
        store.clone(),
        openai,
        approval.clone(),
        Arc::new(EmptyCalendar),
        blocks_db.clone(),
        test_prefs(),
    ));
    let worker = tokio::spawn(run_event_worker(rx, engine));

    let deps = InboundDeps {
        bus: bus.clone(),
        store: store.clone(),
        router: Arc::new(HeuristicRouter),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let reply = handle_inbound_text(&deps, "@u", "123", "add gym tomorrow at 6", Utc::now()).await;
    assert_eq!(reply.as_deref(), Some("Got it, working on your schedule."));

    // Wait for the worker to process the request and prompt for approval.
    let _action_id = timeout(Duration::from_secs(2), async {
        loop {
            if let Some(id) = approval.latest_action_id().await {
                break id;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("prompt not received");

    // A bare "yes" reply resolves the pending approval.
    let reply = handle_inbound_text(&deps, "@u", "123", "yes", Utc::now()).await;
    assert!(reply.is_none());

    drop(deps);
    drop(bus);
    let _ = worker.await;

    let db = blocks_db.lock().await;
    assert_eq!(db.len(), 1);
    let block = db.values().next().unwrap();
    assert_eq!(block.title, "gym");
    assert_eq!(block.chat_id, "123");
}

#[tokio::test]
async fn end_to_end_unclear_message_asks_for_clarification() {
    let _guard = prepare_db_location("end_to_end_unclear_message");

    let (bus, _rx) = EventBus::new(16);
    let deps = InboundDeps {
        bus,
        store: Arc::new(Mutex::new(ActionStore::new())),
        router: Arc::new(HeuristicRouter),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let reply = handle_inbound_text(&deps, "@u", "123", "study linear algebra", Utc::now()).await;
    assert_eq!(
        reply.as_deref(),
        Some("When would you like to do that? Give me a day or a time.")
    );
    assert!(deps.sessions.lock().await.len() == 1);
}
