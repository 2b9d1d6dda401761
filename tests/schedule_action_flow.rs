use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::UTC;
use goalPilot::handlers::action::{
    Action, ActionEngine, ActionEvent, ActionPayload, ActionStatus, ActionStore, ActionType,
    ScheduleDraft,
};
use goalPilot::models::block::ScheduleBlock;
use goalPilot::models::prefs::UserPrefs;
use goalPilot::scheduler::availability::{AvailabilityWindow, BusyInterval};
use goalPilot::service::approval_prompt::ApprovalPrompt;
use goalPilot::service::calendar::CalendarSource;
use goalPilot::service::openai_service::OpenAIClient;
use tokio::sync::Mutex;

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

#[derive(Default)]
struct FakeApprovalPrompt {
    prompts: Mutex<Vec<String>>,
    status_messages: Mutex<Vec<String>>,
}

#[async_trait]
impl ApprovalPrompt for FakeApprovalPrompt {
    async fn prompt(&self, action: &mut Action) -> Result<(), String> {
        let mut prompts = self.prompts.lock().await;
        prompts.push(action.id.clone());
        Ok(())
    }

    async fn update_status(&self, _action: &Action, message: &str) -> Result<(), String> {
        let mut messages = self.status_messages.lock().await;
        messages.push(message.to_string());
        Ok(())
    }

    async fn update_status_message(
        &self,
        _chat_id: &str,
        _user_id: &str,
        message: &str,
    ) -> Result<(), String> {
        let mut messages = self.status_messages.lock().await;
        messages.push(message.to_string());
        Ok(())
    }
}

struct FakeCalendar {
    busy: Vec<BusyInterval>,
}

#[async_trait]
impl CalendarSource for FakeCalendar {
    async fn busy_between(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, String> {
        Ok(self.busy.clone())
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

static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn prepare_db_location(test_name: &str) -> std::sync::MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock().unwrap();
    let base = format!("./data/test_{}", test_name);
    std::fs::create_dir_all(&base).unwrap();
    unsafe {
        std::env::set_var("DB_LOCATION", &base);
    }
    guard
}

// Far-future so the suggestion sanity check passes regardless of when the
// suite runs.
const GYM_JSON: &str =
    "{\"action\":\"create\",\"title\":\"gym\",\"start\":\"2027-06-01T18:00:00Z\",\"end\":\"2027-06-01T19:00:00Z\"}";

fn engine_with(
    openai_response: Result<String, String>,
    busy: Vec<BusyInterval>,
) -> (
    Arc<Mutex<ActionStore>>,
    Arc<FakeApprovalPrompt>,
    Arc<Mutex<HashMap<String, ScheduleBlock>>>,
    ActionEngine,
) {
    let store = Arc::new(Mutex::new(ActionStore::new()));
    let openai = Arc::new(FakeOpenAI {
        response: openai_response,
    });
    let approval = Arc::new(FakeApprovalPrompt::default());
    let calendar = Arc::new(FakeCalendar { busy });
    let blocks_db = Arc::new(Mutex::new(HashMap::<String, ScheduleBlock>::new()));
    let engine = ActionEngine::new(
        store.clone(),
        openai,
        approval.clone(),
        calendar,
        blocks_db.clone(),
        test_prefs(),
    );
    (store, approval, blocks_db, engine)
}

#[tokio::test]
async fn approval_confirmed_persists_block() {
    let _guard = prepare_db_location("approval_confirmed_persists_block");
    let (store, _approval, blocks_db, engine) = engine_with(Ok(GYM_JSON.to_string()), Vec::new());

    engine
        .handle_event(ActionEvent::ScheduleRequested {
            text: "add gym tomorrow at 6".to_string(),
            user_id: "@u".to_string(),
            chat_id: "123".to_string(),
        })
        .await;

    let action_id = {
        let guard = store.lock().await;
        guard.ids().into_iter().next().expect("action exists")
    };

    {
        let guard = store.lock().await;
        let action = guard.get(&action_id).unwrap();
        assert_eq!(action.status, ActionStatus::AwaitingApproval);
        assert_eq!(action.action_type, ActionType::CreateBlock);
        let draft = action.schedule_draft().unwrap();
        assert!(!draft.conflicts);
        assert!(draft.alternatives.is_empty());
    }

    engine
        .handle_event(ActionEvent::ApprovalConfirmed {
            action_id: action_id.clone(),
            user_id: "@u".to_string(),
        })
        .await;

    let db = blocks_db.lock().await;
    assert_eq!(db.len(), 1);
    let block = db.values().next().unwrap();
    assert_eq!(block.title, "gym");
    assert_eq!(block.chat_id, "123");
    assert_eq!(
        block.start,
        Utc.with_ymd_and_hms(2027, 6, 1, 18, 0, 0).unwrap()
    );

    let guard = store.lock().await;
    assert_eq!(guard.get(&action_id).unwrap().status, ActionStatus::Completed);
}

#[tokio::test]
async fn conflicting_draft_carries_alternatives() {
    let _guard = prepare_db_location("conflicting_draft_carries_alternatives");
    let busy = vec![BusyInterval {
        start: Utc.with_ymd_and_hms(2027, 6, 1, 18, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2027, 6, 1, 19, 0, 0).unwrap(),
    }];
    let (store, _approval, _blocks_db, engine) = engine_with(Ok(GYM_JSON.to_string()), busy.clone());

    engine
        .handle_event(ActionEvent::ScheduleRequested {
            text: "add gym tomorrow at 6".to_string(),
            user_id: "@u".to_string(),
            chat_id: "123".to_string(),
        })
        .await;

    let guard = store.lock().await;
    let action_id = guard.ids().into_iter().next().expect("action exists");
    let draft = guard.get(&action_id).unwrap().schedule_draft().unwrap().clone();

    assert!(draft.conflicts);
    assert!(!draft.alternatives.is_empty());
    for slot in &draft.alternatives {
        for interval in &busy {
            assert!(!(slot.start < interval.end && slot.end > interval.start));
        }
    }
}

#[tokio::test]
async fn rejected_suggestion_never_becomes_an_action() {
    let _guard = prepare_db_location("rejected_suggestion_never_becomes_an_action");
    // The model hallucinated a block in the past.
    let stale = "{\"action\":\"create\",\"title\":\"gym\",\"start\":\"2020-06-01T18:00:00Z\",\"end\":\"2020-06-01T19:00:00Z\"}";
    let (store, approval, blocks_db, engine) = engine_with(Ok(stale.to_string()), Vec::new());

    engine
        .handle_event(ActionEvent::ScheduleRequested {
            text: "add gym".to_string(),
            user_id: "@u".to_string(),
            chat_id: "123".to_string(),
        })
        .await;

    assert!(store.lock().await.ids().is_empty());
    assert!(blocks_db.lock().await.is_empty());
    let messages = approval.status_messages.lock().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("I can't schedule that"));
}

#[tokio::test]
async fn approval_canceled_marks_rejected() {
    let _guard = prepare_db_location("approval_canceled_marks_rejected");
    let (store, _approval, blocks_db, engine) = engine_with(Ok(GYM_JSON.to_string()), Vec::new());

    let draft = ScheduleDraft {
        user_id: "@u".to_string(),
        chat_id: "123".to_string(),
        title: "gym".to_string(),
        start: Utc.with_ymd_and_hms(2027, 6, 1, 18, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2027, 6, 1, 19, 0, 0).unwrap(),
        original_text: "add gym tomorrow at 6".to_string(),
        extra_context: None,
        expires_at: Utc.with_ymd_and_hms(2027, 6, 1, 18, 5, 0).unwrap(),
        move_target: None,
        conflicts: false,
        alternatives: Vec::new(),
    };

    let action_id = "a1".to_string();
    let action = Action {
        id: action_id.clone(),
        action_type: ActionType::CreateBlock,
        status: ActionStatus::AwaitingApproval,
        user_id: "@u".to_string(),
        chat_id: "123".to_string(),
        payload: Some(ActionPayload::ScheduleDraft(draft)),
        created_at: Utc.with_ymd_and_hms(2027, 6, 1, 17, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2027, 6, 1, 17, 0, 0).unwrap(),
    };

    {
        let mut guard = store.lock().await;
        guard.insert(action);
    }

    engine
        .handle_event(ActionEvent::ApprovalCanceled {
            action_id: action_id.clone(),
            user_id: "@u".to_string(),
        })
        .await;

    let guard = store.lock().await;
    assert_eq!(guard.get(&action_id).unwrap().status, ActionStatus::Rejected);
    assert!(blocks_db.lock().await.is_empty());
}
