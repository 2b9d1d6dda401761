use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

use crate::storage::{DB, StoreError, save_db};

// Returns the directory where the goal store lives.
// Defaults to a relative "./data/goals" directory.
pub fn get_db_location() -> String {
    if let Ok(path) = env::var("GOALS_DB_LOCATION") {
        return path;
    }
    let base = env::var("DB_LOCATION").unwrap_or("./data".to_string());
    format!("{}/goals", base)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub target_hours_per_week: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

pub fn create_goal(
    db: &mut DB<Goal>,
    user_id: &str,
    name: &str,
    target_hours_per_week: Option<u32>,
) -> Result<String, StoreError> {
    let id = Uuid::new_v4().to_string();
    db.insert(
        id.clone(),
        Goal {
            id: id.clone(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            target_hours_per_week,
            created_at: Utc::now(),
            archived_at: None,
        },
    );
    save_db(&get_db_location(), db)?;
    Ok(id)
}

pub fn active_goals(db: &DB<Goal>, user_id: &str) -> Vec<Goal> {
    let mut goals: Vec<Goal> = db
        .values()
        .filter(|g| g.user_id == user_id && g.archived_at.is_none())
        .cloned()
        .collect();
    goals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    goals
}
