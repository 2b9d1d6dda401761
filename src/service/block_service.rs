use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::block::{self, BlockStatus, ScheduleBlock};
use crate::storage::{DB, StoreError, save_db};

pub struct BlockService;

impl BlockService {
    /// Persists a confirmed block and derives its reminder schedule: one day
    /// and one hour before the start, whichever of those are representable.
    pub async fn create(
        db: &mut DB<ScheduleBlock>,
        user_id: &str,
        chat_id: &str,
        title: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        goal_id: Option<String>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut reminder_times: Vec<DateTime<Utc>> = Vec::new();
        if let Some(one_day_before) = start.checked_sub_signed(Duration::days(1)) {
            reminder_times.push(one_day_before);
        }
        if let Some(one_hour_before) = start.checked_sub_signed(Duration::hours(1)) {
            reminder_times.push(one_hour_before);
        }
        reminder_times.sort();
        db.insert(
            id.clone(),
            ScheduleBlock {
                id: id.clone(),
                user_id: user_id.to_string(),
                chat_id: chat_id.to_string(),
                title: title.to_string(),
                start: *start,
                end: *end,
                goal_id,
                status: BlockStatus::Planned,
                reminder_times,
            },
        );
        save_db(&block::get_db_location(), db)?;
        Ok(id)
    }
}
