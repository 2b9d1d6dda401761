use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::service::openai_service::OpenAIClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Schedule,
    Availability,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct IntentResult {
    pub intent: Intent,
    pub normalized_text: String,
}

#[async_trait]
pub trait IntentRouter: Send + Sync {
    async fn route(&self, text: &str) -> IntentResult;
}

pub struct HeuristicRouter;

#[async_trait]
impl IntentRouter for HeuristicRouter {
    async fn route(&self, text: &str) -> IntentResult {
        route_intent(text)
    }
}

pub struct OpenAIRouter {
    openai: Arc<dyn OpenAIClient>,
}

impl OpenAIRouter {
    pub fn new(openai: Arc<dyn OpenAIClient>) -> Self {
        Self { openai }
    }
}

#[async_trait]
impl IntentRouter for OpenAIRouter {
    async fn route(&self, text: &str) -> IntentResult {
        match self.openai.generate_prompt(text, "intent_router").await {
            Ok(payload) => parse_router_payload(&payload).unwrap_or_else(|| route_intent(text)),
            Err(_) => route_intent(text),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouterPayload {
    intent: String,
    normalized_text: String,
}

fn parse_router_payload(payload: &str) -> Option<IntentResult> {
    let parsed: RouterPayload = serde_json::from_str(payload).ok()?;
    let intent = match parsed.intent.as_str() {
        "schedule" => Intent::Schedule,
        "availability" => Intent::Availability,
        _ => Intent::Unknown,
    };
    Some(IntentResult {
        intent,
        normalized_text: parsed.normalized_text.trim().to_string(),
    })
}

const AVAILABILITY_PHRASES: [&str; 6] = [
    "free",
    "available",
    "availability",
    "when can i",
    "when could i",
    "open slot",
];

const TIME_PHRASES: [&str; 11] = [
    "today", "tomorrow", "tonight", "morning", "afternoon", "evening", "next ", "this ", "at ",
    "in ", "on ",
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

pub fn route_intent(text: &str) -> IntentResult {
    let normalized = text.trim().to_string();
    if normalized.is_empty() {
        return IntentResult {
            intent: Intent::Unknown,
            normalized_text: normalized,
        };
    }

    let lower = normalized.to_lowercase();
    // Free-time questions win over time tokens: "am I free tomorrow?" is a
    // query, not a booking.
    let intent = if AVAILABILITY_PHRASES.iter().any(|p| lower.contains(p)) {
        Intent::Availability
    } else if has_time_tokens(&lower) {
        Intent::Schedule
    } else {
        Intent::Unknown
    };

    IntentResult {
        intent,
        normalized_text: normalized,
    }
}

fn has_time_tokens(lower: &str) -> bool {
    if TIME_PHRASES.iter().any(|t| lower.contains(t))
        || WEEKDAYS.iter().any(|d| lower.contains(d))
        || MONTHS.iter().any(|m| lower.contains(m))
    {
        return true;
    }

    if (lower.contains('/') || lower.contains(':')) && lower.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }

    has_am_pm(lower)
}

// Matches "5pm" and "10 am" but not the verb in "i am busy".
fn has_am_pm(lower: &str) -> bool {
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    for (i, word) in words.iter().enumerate() {
        if let Some(prefix) = word.strip_suffix("am").or_else(|| word.strip_suffix("pm")) {
            if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
                return true;
            }
            if prefix.is_empty() && i > 0 && words[i - 1].chars().all(|c| c.is_ascii_digit()) {
                return true;
            }
        }
    }
    false
}
