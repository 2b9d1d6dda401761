use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;

// Returns the directory where the schedule block store lives.
// Defaults to a relative "./data/blocks" directory.
pub fn get_db_location() -> String {
    if let Ok(path) = env::var("BLOCKS_DB_LOCATION") {
        return path;
    }
    let base = env::var("DB_LOCATION").unwrap_or("./data".to_string());
    format!("{}/blocks", base)
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Planned,
    Completed,
    Missed,
}

/// A committed calendar block: a study session, workout, meeting or similar.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScheduleBlock {
    pub id: String,
    pub user_id: String,
    pub chat_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub goal_id: Option<String>,
    pub status: BlockStatus,
    pub reminder_times: Vec<DateTime<Utc>>,
}

/// Shape of the JSON the model returns for a "calendar_action" prompt.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AIBlock {
    pub action: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
