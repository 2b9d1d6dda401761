use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::block::{self, AIBlock, BlockStatus, ScheduleBlock};
use crate::models::prefs::UserPrefs;
use crate::scheduler::availability::{CandidateSlot, SearchConfig, find_slots};
use crate::scheduler::validation::check_suggestion;
use crate::service::agenda_service::{parse_requested_minutes, render_slots};
use crate::service::approval_prompt::ApprovalPrompt;
use crate::service::block_service::BlockService;
use crate::service::calendar::CalendarSource;
use crate::service::openai_service::OpenAIClient;
use crate::storage::{DB, save_db};

pub type ActionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Unknown,
    CreateBlock,
    MoveBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    AwaitingApproval,
    Approved,
    Rejected,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub user_id: String,
    pub chat_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub original_text: String,
    pub extra_context: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Id of the existing block being rescheduled, when the action is a move.
    pub move_target: Option<String>,
    pub conflicts: bool,
    pub alternatives: Vec<CandidateSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionPayload {
    ScheduleDraft(ScheduleDraft),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub action_type: ActionType,
    pub status: ActionStatus,
    pub user_id: String,
    pub chat_id: String,
    pub payload: Option<ActionPayload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Action {
    pub fn schedule_draft(&self) -> Option<&ScheduleDraft> {
        match &self.payload {
            Some(ActionPayload::ScheduleDraft(draft)) => Some(draft),
            None => None,
        }
    }

    pub fn schedule_draft_mut(&mut self) -> Option<&mut ScheduleDraft> {
        match &mut self.payload {
            Some(ActionPayload::ScheduleDraft(draft)) => Some(draft),
            None => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionStore {
    actions: HashMap<ActionId, Action>,
}

impl ActionStore {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, action: Action) {
        self.actions.insert(action.id.clone(), action);
    }

    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn ids(&self) -> Vec<ActionId> {
        self.actions.keys().cloned().collect()
    }

    /// The most recent action in this chat still waiting on the user, so a
    /// bare "yes"/"no" reply can be attached to it.
    pub fn latest_awaiting_for(&self, user_id: &str, chat_id: &str) -> Option<ActionId> {
        self.actions
            .values()
            .filter(|a| {
                a.status == ActionStatus::AwaitingApproval
                    && a.user_id == user_id
                    && a.chat_id == chat_id
            })
            .max_by_key(|a| a.updated_at)
            .map(|a| a.id.clone())
    }
}

#[derive(Debug)]
pub enum ActionEvent {
    ScheduleRequested {
        text: String,
        user_id: String,
        chat_id: String,
    },
    AvailabilityRequested {
        text: String,
        user_id: String,
        chat_id: String,
    },
    ApprovalConfirmed {
        action_id: String,
        user_id: String,
    },
    ApprovalCanceled {
        action_id: String,
        user_id: String,
    },
    ContextSubmitted {
        action_id: String,
        user_id: String,
        context: String,
    },
}

pub struct ActionEngine {
    store: Arc<Mutex<ActionStore>>,
    openai: Arc<dyn OpenAIClient>,
    approval: Arc<dyn ApprovalPrompt>,
    calendar: Arc<dyn CalendarSource>,
    blocks_db: Arc<Mutex<DB<ScheduleBlock>>>,
    prefs: UserPrefs,
}

impl ActionEngine {
    pub fn new(
        store: Arc<Mutex<ActionStore>>,
        openai: Arc<dyn OpenAIClient>,
        approval: Arc<dyn ApprovalPrompt>,
        calendar: Arc<dyn CalendarSource>,
        blocks_db: Arc<Mutex<DB<ScheduleBlock>>>,
        prefs: UserPrefs,
    ) -> Self {
        Self {
            store,
            openai,
            approval,
            calendar,
            blocks_db,
            prefs,
        }
    }

    pub async fn handle_event(&self, event: ActionEvent) {
        match event {
            ActionEvent::ScheduleRequested {
                text,
                user_id,
                chat_id,
            } => {
                self.handle_schedule_requested(text, user_id, chat_id).await;
            }
            ActionEvent::AvailabilityRequested {
                text,
                user_id,
                chat_id,
            } => {
                self.handle_availability_requested(text, user_id, chat_id)
                    .await;
            }
            ActionEvent::ApprovalConfirmed { action_id, user_id } => {
                self.handle_approval_confirmed(action_id, user_id).await;
            }
            ActionEvent::ApprovalCanceled { action_id, user_id } => {
                self.handle_approval_canceled(action_id, user_id).await;
            }
            ActionEvent::ContextSubmitted {
                action_id,
                user_id,
                context,
            } => {
                self.handle_context_submitted(action_id, user_id, context)
                    .await;
            }
        }
    }

    async fn handle_schedule_requested(&self, text: String, user_id: String, chat_id: String) {
        let payload = match self.openai.generate_prompt(&text, "calendar_action").await {
            Ok(p) => p,
            Err(err) => {
                let _ = self
                    .approval
                    .update_status_message(
                        &chat_id,
                        &user_id,
                        &format!("Failed to call OpenAI for scheduling: {}", err),
                    )
                    .await;
                return;
            }
        };

        let ai_block: AIBlock = match serde_json::from_str(&payload) {
            Ok(r) => r,
            Err(err) => {
                let _ = self
                    .approval
                    .update_status_message(
                        &chat_id,
                        &user_id,
                        &format!("Failed to parse calendar action JSON: {}", err),
                    )
                    .await;
                return;
            }
        };

        let now = Utc::now();
        let check = check_suggestion(ai_block.start, ai_block.end, now, self.prefs.tz);
        if let Some(reason) = check.reason() {
            let _ = self
                .approval
                .update_status_message(
                    &chat_id,
                    &user_id,
                    &format!("I can't schedule that: {}.", reason),
                )
                .await;
            return;
        }

        let move_target = if ai_block.action == "move" {
            let db = self.blocks_db.lock().await;
            find_move_target(&db, &user_id, &ai_block.title)
        } else {
            None
        };

        let (conflicts, alternatives) = match self
            .conflict_report(&ai_block, move_target.as_deref(), now)
            .await
        {
            Ok(r) => r,
            Err(err) => {
                let _ = self
                    .approval
                    .update_status_message(
                        &chat_id,
                        &user_id,
                        &format!("Failed to read your calendar: {}", err),
                    )
                    .await;
                return;
            }
        };

        let action_type = if move_target.is_some() {
            ActionType::MoveBlock
        } else {
            ActionType::CreateBlock
        };
        let pending_id = Uuid::new_v4().to_string();
        let mut action = Action {
            id: pending_id,
            action_type,
            status: ActionStatus::AwaitingApproval,
            user_id: user_id.clone(),
            chat_id: chat_id.clone(),
            payload: Some(ActionPayload::ScheduleDraft(ScheduleDraft {
                user_id,
                chat_id,
                title: ai_block.title,
                start: ai_block.start,
                end: ai_block.end,
                original_text: text,
                extra_context: None,
                expires_at: now + Duration::minutes(5),
                move_target,
                conflicts,
                alternatives,
            })),
            created_at: now,
            updated_at: now,
        };

        if self.approval.prompt(&mut action).await.is_err() {
            action.status = ActionStatus::Failed;
        }

        let mut store = self.store.lock().await;
        store.insert(action);
    }

    async fn handle_availability_requested(&self, text: String, user_id: String, chat_id: String) {
        let minutes = parse_requested_minutes(&text).unwrap_or(60);
        let now = Utc::now();
        let config = SearchConfig::new(Duration::minutes(i64::from(minutes)), self.prefs.tz);
        let horizon_end = now + Duration::days(i64::from(config.horizon_days));

        let busy = match self.calendar.busy_between(now, horizon_end).await {
            Ok(b) => b,
            Err(err) => {
                let _ = self
                    .approval
                    .update_status_message(
                        &chat_id,
                        &user_id,
                        &format!("Failed to read your calendar: {}", err),
                    )
                    .await;
                return;
            }
        };

        let slots = find_slots(&busy, &self.prefs.windows, &config, now);
        let _ = self
            .approval
            .update_status_message(&chat_id, &user_id, &render_slots(&slots, &self.prefs))
            .await;
    }

    async fn handle_approval_confirmed(&self, action_id: String, user_id: String) {
        let action_snapshot = {
            let store = self.store.lock().await;
            store.get(&action_id).cloned()
        };

        let Some(mut action) = action_snapshot else {
            return;
        };

        if action.user_id != user_id || action.status != ActionStatus::AwaitingApproval {
            return;
        }

        let now = Utc::now();
        if action
            .schedule_draft()
            .is_some_and(|draft| draft.expires_at < now)
        {
            action.status = ActionStatus::Rejected;
            action.updated_at = now;
            let _ = self
                .approval
                .update_status(&action, "This schedule request has expired.")
                .await;
            let mut store = self.store.lock().await;
            store.insert(action);
            return;
        }

        action.status = ActionStatus::Approved;
        action.updated_at = now;

        let Some(draft) = action.schedule_draft().cloned() else {
            action.status = ActionStatus::Failed;
            action.updated_at = Utc::now();
            let _ = self
                .approval
                .update_status_message(
                    &action.chat_id,
                    &action.user_id,
                    "Failed to save the block.",
                )
                .await;
            let mut store = self.store.lock().await;
            store.insert(action);
            return;
        };

        let result = self.persist_draft(&action, &draft).await;

        if result.is_ok() {
            action.status = ActionStatus::Completed;
            action.updated_at = Utc::now();
            let verb = if draft.move_target.is_some() {
                "Moved"
            } else {
                "Scheduled"
            };
            let message = format!("{} \"{}\" for {}.", verb, draft.title, draft.start);
            let _ = self.approval.update_status(&action, &message).await;
        } else {
            action.status = ActionStatus::Failed;
            action.updated_at = Utc::now();
            let _ = self
                .approval
                .update_status_message(
                    &action.chat_id,
                    &action.user_id,
                    "Failed to save the block.",
                )
                .await;
        }

        let mut store = self.store.lock().await;
        store.insert(action);
    }

    async fn persist_draft(&self, action: &Action, draft: &ScheduleDraft) -> Result<(), String> {
        let mut db = self.blocks_db.lock().await;
        match &draft.move_target {
            Some(target_id) => {
                let Some(existing) = db.get_mut(target_id) else {
                    return Err("move target no longer exists".to_string());
                };
                existing.start = draft.start;
                existing.end = draft.end;
                existing.reminder_times = vec![
                    draft.start - Duration::days(1),
                    draft.start - Duration::hours(1),
                ];
                save_db(&block::get_db_location(), &db).map_err(|e| e.to_string())
            }
            None => BlockService::create(
                &mut db,
                &action.user_id,
                &action.chat_id,
                &draft.title,
                &draft.start,
                &draft.end,
                None,
            )
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
        }
    }

    async fn handle_approval_canceled(&self, action_id: String, user_id: String) {
        let action_snapshot = {
            let store = self.store.lock().await;
            store.get(&action_id).cloned()
        };

        let Some(mut action) = action_snapshot else {
            return;
        };

        if action.user_id != user_id || action.status != ActionStatus::AwaitingApproval {
            return;
        }

        action.status = ActionStatus::Rejected;
        action.updated_at = Utc::now();
        let _ = self
            .approval
            .update_status(&action, "Canceled schedule request.")
            .await;

        let mut store = self.store.lock().await;
        store.insert(action);
    }

    async fn handle_context_submitted(&self, action_id: String, user_id: String, context: String) {
        let action_snapshot = {
            let store = self.store.lock().await;
            store.get(&action_id).cloned()
        };

        let Some(mut action) = action_snapshot else {
            return;
        };

        if action.user_id != user_id || action.status != ActionStatus::AwaitingApproval {
            return;
        }

        let mut combined_prompt = if let Some(draft) = action.schedule_draft() {
            draft.original_text.clone()
        } else {
            return;
        };

        if !context.trim().is_empty() {
            combined_prompt = format!(
                "Original request: {original}\nCorrection note: {context}",
                original = combined_prompt,
                context = context.trim()
            );
        }

        let refreshed = match self
            .openai
            .generate_prompt(&combined_prompt, "calendar_correction")
            .await
        {
            Ok(payload) => serde_json::from_str::<AIBlock>(&payload).ok(),
            Err(_) => None,
        };

        if let Some(updated) = refreshed {
            let now = Utc::now();
            let (conflicts, alternatives) =
                match self.conflict_report(&updated, None, now).await {
                    Ok(r) => r,
                    Err(_) => (false, Vec::new()),
                };
            if let Some(draft) = action.schedule_draft_mut() {
                if !context.trim().is_empty() {
                    draft.extra_context = Some(context.trim().to_string());
                }
                draft.title = updated.title;
                draft.start = updated.start;
                draft.end = updated.end;
                draft.conflicts = conflicts;
                draft.alternatives = alternatives;
            }

            let _ = self.approval.prompt(&mut action).await;
            action.updated_at = now;

            let mut store = self.store.lock().await;
            store.insert(action);
        }
    }

    /// Checks the draft against existing busy time and, when it collides,
    /// asks the resolver for a few replacement slots of the same length.
    async fn conflict_report(
        &self,
        ai_block: &AIBlock,
        move_target: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(bool, Vec<CandidateSlot>), String> {
        let mut config = SearchConfig::new(ai_block.end - ai_block.start, self.prefs.tz);
        config.max_results = 3;

        let horizon_end = now + Duration::days(i64::from(config.horizon_days));
        let fetch_end = if ai_block.end > horizon_end {
            ai_block.end
        } else {
            horizon_end
        };
        let mut busy = self.calendar.busy_between(now, fetch_end).await?;
        // A moved block should not conflict with its own current slot.
        if let Some(target_id) = move_target {
            let db = self.blocks_db.lock().await;
            if let Some(target) = db.get(target_id) {
                busy.retain(|b| b.start != target.start || b.end != target.end);
            }
        }

        let conflicts = busy
            .iter()
            .any(|b| b.overlaps(ai_block.start, ai_block.end));
        if !conflicts {
            return Ok((false, Vec::new()));
        }
        Ok((true, find_slots(&busy, &self.prefs.windows, &config, now)))
    }
}

fn find_move_target(db: &DB<ScheduleBlock>, user_id: &str, title: &str) -> Option<String> {
    db.values()
        .filter(|b| {
            b.user_id == user_id
                && b.status == BlockStatus::Planned
                && b.title.eq_ignore_ascii_case(title)
        })
        .min_by_key(|b| b.start)
        .map(|b| b.id.clone())
}
