use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::service::routing::{Intent, IntentRouter};

pub type SessionKey = (String, String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unknown,
    PendingSchedule,
}

#[derive(Debug, Clone)]
pub struct PendingSession {
    pub state: SessionState,
    pub original_text: String,
    pub last_prompt_at: DateTime<Utc>,
}

pub enum RouteDecision {
    EmitSchedule { normalized_text: String },
    EmitAvailability { normalized_text: String },
    NeedClarification,
}

/// Routes an inbound message against the per-(user, chat) clarification
/// session. An unclear message is held for five minutes; a follow-up inside
/// that span is concatenated with it and re-routed, so "study for calc" then
/// "tomorrow at 3" lands as one schedule request.
pub async fn route_message(
    router: &dyn IntentRouter,
    sessions: &mut HashMap<SessionKey, PendingSession>,
    session_key: SessionKey,
    text: String,
    now: DateTime<Utc>,
) -> RouteDecision {
    let mut combined_text = text;
    if let Some(session) = sessions.get(&session_key) {
        if now - session.last_prompt_at > Duration::minutes(5) {
            sessions.remove(&session_key);
        } else if session.state == SessionState::Unknown {
            combined_text = format!("{} {}", session.original_text, combined_text);
        }
    }

    let routing = router.route(&combined_text).await;
    match routing.intent {
        Intent::Schedule => {
            let session = PendingSession {
                state: SessionState::PendingSchedule,
                original_text: combined_text,
                last_prompt_at: now,
            };
            sessions.insert(session_key, session);
            RouteDecision::EmitSchedule {
                normalized_text: routing.normalized_text,
            }
        }
        Intent::Availability => {
            sessions.remove(&session_key);
            RouteDecision::EmitAvailability {
                normalized_text: routing.normalized_text,
            }
        }
        Intent::Unknown => {
            let session = PendingSession {
                state: SessionState::Unknown,
                original_text: combined_text,
                last_prompt_at: now,
            };
            sessions.insert(session_key, session);
            RouteDecision::NeedClarification
        }
    }
}
