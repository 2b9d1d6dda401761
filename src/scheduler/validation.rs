use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;

// Bounds for AI-suggested blocks. The model occasionally hallucinates a 3am
// study session or a nine-hour one; everything outside these limits is
// rejected before the user ever sees a confirmation prompt.
pub const MIN_BLOCK_MINUTES: i64 = 15;
pub const MAX_BLOCK_HOURS: i64 = 4;
pub const EARLIEST_START_HOUR: u32 = 6;
pub const LATEST_START_HOUR: u32 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionCheck {
    Pass,
    Fail(&'static str),
}

impl SuggestionCheck {
    pub fn is_pass(&self) -> bool {
        matches!(self, SuggestionCheck::Pass)
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            SuggestionCheck::Pass => None,
            SuggestionCheck::Fail(reason) => Some(reason),
        }
    }
}

/// Sanity check for an AI-suggested block. Pure: the caller supplies `now`
/// and the wall-clock zone the hour bound is judged in.
pub fn check_suggestion(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: Tz,
) -> SuggestionCheck {
    if end <= start {
        return SuggestionCheck::Fail("the block ends before it starts");
    }
    if start < now {
        return SuggestionCheck::Fail("the block starts in the past");
    }
    let length = end - start;
    if length < Duration::minutes(MIN_BLOCK_MINUTES) {
        return SuggestionCheck::Fail("the block is shorter than 15 minutes");
    }
    if length > Duration::hours(MAX_BLOCK_HOURS) {
        return SuggestionCheck::Fail("the block is longer than 4 hours");
    }
    let local_hour = start.with_timezone(&tz).hour();
    if !(EARLIEST_START_HOUR..LATEST_START_HOUR).contains(&local_hour) {
        return SuggestionCheck::Fail("the block starts outside waking hours");
    }
    SuggestionCheck::Pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::UTC;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, h, m, 0).unwrap()
    }

    #[test]
    fn accepts_a_reasonable_block() {
        let check = check_suggestion(at(10, 0), at(11, 0), at(8, 0), UTC);
        assert!(check.is_pass());
        assert_eq!(check.reason(), None);
    }

    #[test]
    fn rejects_inverted_and_past_blocks() {
        assert!(!check_suggestion(at(11, 0), at(10, 0), at(8, 0), UTC).is_pass());
        assert!(!check_suggestion(at(7, 0), at(8, 0), at(9, 0), UTC).is_pass());
    }

    #[test]
    fn rejects_out_of_bounds_durations() {
        assert_eq!(
            check_suggestion(at(10, 0), at(10, 5), at(8, 0), UTC).reason(),
            Some("the block is shorter than 15 minutes")
        );
        assert_eq!(
            check_suggestion(at(10, 0), at(15, 0), at(8, 0), UTC).reason(),
            Some("the block is longer than 4 hours")
        );
    }

    #[test]
    fn rejects_night_starts_in_local_time() {
        let start = Utc.with_ymd_and_hms(2026, 2, 3, 3, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 2, 3, 4, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 1, 0, 0).unwrap();
        assert_eq!(
            check_suggestion(start, end, now, UTC).reason(),
            Some("the block starts outside waking hours")
        );
        // The same instant is 22:00 of the previous day in Eastern time and
        // passes the hour bound there.
        assert!(check_suggestion(start, end, now, chrono_tz::America::New_York).is_pass());
    }
}
