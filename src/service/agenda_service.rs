use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::prefs::UserPrefs;
use crate::scheduler::availability::CandidateSlot;

fn format_range(start: DateTime<Utc>, end: DateTime<Utc>, tz: &Tz) -> String {
    format!(
        "{}-{} {}",
        start.with_timezone(tz).format("%a %b %d %H:%M"),
        end.with_timezone(tz).format("%H:%M"),
        start.with_timezone(tz).format("%Z")
    )
}

/// Renders resolver output as a numbered list in the user's zone, echoing
/// each slot in any extra display zones.
pub fn render_slots(slots: &[CandidateSlot], prefs: &UserPrefs) -> String {
    if slots.is_empty() {
        return "No free slots found in the next two weeks.".to_string();
    }
    let mut body = String::from("Here is your free time:");
    for (idx, slot) in slots.iter().enumerate() {
        body.push_str(&format!(
            "\n{}) {}",
            idx + 1,
            format_range(slot.start, slot.end, &prefs.tz)
        ));
        let echoes: Vec<String> = prefs
            .display_tzs
            .iter()
            .map(|tz| {
                format!(
                    "{} {}",
                    slot.start.with_timezone(tz).format("%H:%M"),
                    slot.start.with_timezone(tz).format("%Z")
                )
            })
            .collect();
        if !echoes.is_empty() {
            body.push_str(&format!(" ({})", echoes.join(", ")));
        }
    }
    body
}

pub fn render_block_time(start: DateTime<Utc>, end: DateTime<Utc>, tz: &Tz) -> String {
    format_range(start, end, tz)
}

/// Pulls an explicit duration out of a free-time question ("any 30 minute
/// gaps on Friday?"). Defaults are the caller's business.
pub fn parse_requested_minutes(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    for (i, word) in words.iter().enumerate() {
        let Ok(amount) = word.parse::<u32>() else {
            continue;
        };
        if let Some(unit) = words.get(i + 1) {
            if unit.starts_with("min") {
                return Some(amount);
            }
            if unit.starts_with("hour") || *unit == "h" || *unit == "hr" || *unit == "hrs" {
                return Some(amount * 60);
            }
        }
    }
    None
}
