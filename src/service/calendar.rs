use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::block::{BlockStatus, ScheduleBlock};
use crate::scheduler::availability::BusyInterval;
use crate::storage::DB;

/// Busy-time feed. The resolver never queries a calendar itself; whoever
/// invokes it materializes the busy list through this seam first. A hosted
/// calendar (Google etc.) plugs in as another implementation.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn busy_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, String>;
}

/// Derives busy intervals from the local block store. Missed blocks no longer
/// occupy their slot.
pub struct BlockCalendar {
    db: Arc<Mutex<DB<ScheduleBlock>>>,
}

impl BlockCalendar {
    pub fn new(db: Arc<Mutex<DB<ScheduleBlock>>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CalendarSource for BlockCalendar {
    async fn busy_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, String> {
        let db = self.db.lock().await;
        let mut busy: Vec<BusyInterval> = db
            .values()
            .filter(|block| block.status != BlockStatus::Missed)
            .filter(|block| block.start < to && block.end > from)
            .map(|block| BusyInterval {
                start: block.start,
                end: block.end,
            })
            .collect();
        busy.sort_by_key(|b| b.start);
        Ok(busy)
    }
}
