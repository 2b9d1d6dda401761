use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::models::block::{BlockStatus, ScheduleBlock, get_db_location};
use crate::models::prefs::UserPrefs;
use crate::scheduler::availability::{BusyInterval, SearchConfig, find_slots};
use crate::service::agenda_service::render_slots;
use crate::service::messaging::MessageSender;
use crate::storage::{DB, save_db};

const RESCUE_HOUR: u32 = 7;

pub async fn run_rescue_loop(
    db: Arc<Mutex<DB<ScheduleBlock>>>,
    prefs: UserPrefs,
    sender: Arc<dyn MessageSender>,
) {
    loop {
        let next_run = next_daily_run(Utc::now(), &prefs);
        let sleep_for = (next_run - Utc::now())
            .to_std()
            .unwrap_or_else(|_| std::time::Duration::from_secs(60));
        sleep(sleep_for).await;
        let mut db = db.lock().await;
        if let Err(err) = rescue_tick(&mut db, &prefs, sender.as_ref(), Utc::now()).await {
            eprintln!("Rescue tick failed: {}", err);
        }
    }
}

fn next_daily_run(now: DateTime<Utc>, prefs: &UserPrefs) -> DateTime<Utc> {
    let now_local = now.with_timezone(&prefs.tz);
    let today = now_local.date_naive();
    let target_naive = today.and_hms_opt(RESCUE_HOUR, 0, 0).unwrap();
    let target_local = prefs
        .tz
        .from_local_datetime(&target_naive)
        .single()
        .unwrap_or_else(|| prefs.tz.from_utc_datetime(&target_naive));

    if now_local < target_local {
        target_local.with_timezone(&Utc)
    } else {
        (target_local + Duration::days(1)).with_timezone(&Utc)
    }
}

/// Marks fully-elapsed planned blocks as missed and proposes make-up slots of
/// the same length. "Fully elapsed" uses the half-open convention: a block
/// ending exactly now is already over.
pub async fn rescue_tick<S: MessageSender + ?Sized>(
    db: &mut DB<ScheduleBlock>,
    prefs: &UserPrefs,
    sender: &S,
    now: DateTime<Utc>,
) -> Result<(), String> {
    let mut missed: Vec<ScheduleBlock> = Vec::new();
    for block in db.values_mut() {
        if block.status == BlockStatus::Planned && block.end <= now {
            block.status = BlockStatus::Missed;
            missed.push(block.clone());
        }
    }

    if missed.is_empty() {
        return Ok(());
    }

    let busy: Vec<BusyInterval> = db
        .values()
        .filter(|b| b.status == BlockStatus::Planned)
        .map(|b| BusyInterval {
            start: b.start,
            end: b.end,
        })
        .collect();

    missed.sort_by_key(|b| b.start);
    for block in &missed {
        let mut config = SearchConfig::new(block.end - block.start, prefs.tz);
        config.max_results = 3;
        let slots = find_slots(&busy, &prefs.windows, &config, now);
        let body = format!(
            "You missed \"{}\". {}",
            block.title,
            if slots.is_empty() {
                "I couldn't find a free slot to make it up in the next two weeks.".to_string()
            } else {
                format!("Want to make it up?\n{}", render_slots(&slots, prefs))
            }
        );
        sender.send_message(&block.chat_id, &body).await?;
    }

    save_db(&get_db_location(), db).map_err(|e| e.to_string())?;
    Ok(())
}
