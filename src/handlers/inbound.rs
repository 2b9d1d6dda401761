use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::events::queue::EventBus;
use crate::handlers::action::{ActionEvent, ActionStore};
use crate::service::confirm_flow::{PendingSession, RouteDecision, SessionKey, route_message};
use crate::service::routing::IntentRouter;

/// Everything an inbound chat surface needs: Telegram, the SMS webhook and
/// the web chat route all share one instance.
#[derive(Clone)]
pub struct InboundDeps {
    pub bus: EventBus,
    pub store: Arc<Mutex<ActionStore>>,
    pub router: Arc<dyn IntentRouter>,
    pub sessions: Arc<Mutex<HashMap<SessionKey, PendingSession>>>,
}

/// Handles one inbound message and returns the immediate reply text, if any.
/// Scheduling work continues on the event bus and replies through the
/// outbound sender.
pub async fn handle_inbound_text(
    deps: &InboundDeps,
    user_id: &str,
    chat_id: &str,
    text: &str,
    now: DateTime<Utc>,
) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // A reply while an approval is pending resolves that approval rather
    // than starting a new request.
    let awaiting = {
        let store = deps.store.lock().await;
        store.latest_awaiting_for(user_id, chat_id)
    };
    if let Some(action_id) = awaiting {
        let event = match trimmed.to_lowercase().as_str() {
            "yes" | "y" | "confirm" | "ok" => ActionEvent::ApprovalConfirmed {
                action_id,
                user_id: user_id.to_string(),
            },
            "no" | "n" | "cancel" => ActionEvent::ApprovalCanceled {
                action_id,
                user_id: user_id.to_string(),
            },
            _ => ActionEvent::ContextSubmitted {
                action_id,
                user_id: user_id.to_string(),
                context: trimmed.to_string(),
            },
        };
        deps.bus.emit(event).await;
        return None;
    }

    let key: SessionKey = (user_id.to_string(), chat_id.to_string());
    let decision = {
        let mut sessions = deps.sessions.lock().await;
        route_message(
            deps.router.as_ref(),
            &mut sessions,
            key,
            trimmed.to_string(),
            now,
        )
        .await
    };

    match decision {
        RouteDecision::EmitSchedule { normalized_text } => {
            deps.bus
                .emit(ActionEvent::ScheduleRequested {
                    text: normalized_text,
                    user_id: user_id.to_string(),
                    chat_id: chat_id.to_string(),
                })
                .await;
            Some("Got it, working on your schedule.".to_string())
        }
        RouteDecision::EmitAvailability { normalized_text } => {
            deps.bus
                .emit(ActionEvent::AvailabilityRequested {
                    text: normalized_text,
                    user_id: user_id.to_string(),
                    chat_id: chat_id.to_string(),
                })
                .await;
            Some("Let me check your calendar.".to_string())
        }
        RouteDecision::NeedClarification => {
            Some("When would you like to do that? Give me a day or a time.".to_string())
        }
    }
}
