use chrono::{DateTime, Datelike, Days, Duration, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range already occupied on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }
}

/// A recurring day-of-week plus time-of-day range in which new blocks may be
/// placed. Times are wall-clock in the search timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub days: Vec<Weekday>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// A computed, not-yet-committed placement. `end - start` is always the
/// requested duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub duration: Duration,
    pub horizon_days: u32,
    pub step_minutes: u32,
    pub max_results: usize,
    pub tz: Tz,
}

impl SearchConfig {
    pub fn new(duration: Duration, tz: Tz) -> Self {
        Self {
            duration,
            horizon_days: 14,
            step_minutes: 30,
            max_results: 10,
            tz,
        }
    }
}

/// Enumerates conflict-free start times across the search horizon, in
/// chronological order (days ascending, time-of-day ascending within a day,
/// regardless of the order windows are supplied in).
///
/// Degenerate input never errors: empty windows, a non-positive duration or
/// step, or a zero result cap all yield an empty list. `busy` may be unsorted
/// and is never mutated.
pub fn find_slots(
    busy: &[BusyInterval],
    windows: &[AvailabilityWindow],
    config: &SearchConfig,
    now: DateTime<Utc>,
) -> Vec<CandidateSlot> {
    if windows.is_empty()
        || config.duration <= Duration::zero()
        || config.step_minutes == 0
        || config.max_results == 0
    {
        return Vec::new();
    }

    let duration_secs = config.duration.num_seconds();
    let step_secs = i64::from(config.step_minutes) * 60;
    let today = now.with_timezone(&config.tz).date_naive();

    let mut results: Vec<CandidateSlot> = Vec::new();
    for offset in 0..config.horizon_days {
        let Some(day) = today.checked_add_days(Days::new(u64::from(offset))) else {
            break;
        };
        let weekday = day.weekday();

        let mut day_slots: Vec<CandidateSlot> = Vec::new();
        for window in windows.iter().filter(|w| w.days.contains(&weekday)) {
            let open = i64::from(window.start_time.num_seconds_from_midnight());
            let close = i64::from(window.end_time.num_seconds_from_midnight());

            let mut cursor = open;
            // A slot must fit entirely inside the window; it may end exactly
            // on the boundary.
            while cursor + duration_secs <= close {
                let time = NaiveTime::from_num_seconds_from_midnight_opt(cursor as u32, 0)
                    .expect("cursor stays within a civil day");
                // Nonexistent local times (spring-forward gap) have no valid
                // instant and are skipped; ambiguous ones take the earlier.
                if let Some(local) = config.tz.from_local_datetime(&day.and_time(time)).earliest()
                {
                    let start = local.with_timezone(&Utc);
                    let end = start + config.duration;
                    if start >= now && !busy.iter().any(|b| b.overlaps(start, end)) {
                        day_slots.push(CandidateSlot { start, end });
                    }
                }
                cursor += step_secs;
            }
        }

        // Overlapping windows can visit the same start twice.
        day_slots.sort_by_key(|slot| slot.start);
        day_slots.dedup_by_key(|slot| slot.start);

        for slot in day_slots {
            results.push(slot);
            if results.len() >= config.max_results {
                return results;
            }
        }
    }
    results
}
