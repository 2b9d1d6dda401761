use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;

use crate::config::AppConfig;
use crate::scheduler::availability::AvailabilityWindow;

/// Per-user scheduling preferences: where window wall-clock times live, which
/// recurring windows placement is allowed in, and any extra zones slots should
/// be echoed in when presented.
#[derive(Debug, Clone)]
pub struct UserPrefs {
    pub tz: Tz,
    pub windows: Vec<AvailabilityWindow>,
    pub display_tzs: Vec<Tz>,
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            tz: chrono_tz::America::New_York,
            windows: vec![
                AvailabilityWindow {
                    days: vec![
                        Weekday::Mon,
                        Weekday::Tue,
                        Weekday::Wed,
                        Weekday::Thu,
                        Weekday::Fri,
                    ],
                    start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
                },
                AvailabilityWindow {
                    days: vec![Weekday::Sat, Weekday::Sun],
                    start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                },
            ],
            display_tzs: Vec::new(),
        }
    }
}

impl UserPrefs {
    /// Builds prefs from config keys, falling back to defaults per key:
    /// `TIMEZONE`, `DISPLAY_TIMEZONES` (comma-separated), and `AVAILABILITY`
    /// ("Mon,Tue,Wed 09:00-21:00; Sat 10:00-18:00").
    pub fn from_config(config: &AppConfig) -> Self {
        let mut prefs = Self::default();
        if let Some(tz) = config.get("TIMEZONE").and_then(|v| v.parse::<Tz>().ok()) {
            prefs.tz = tz;
        }
        if let Some(raw) = config.get("DISPLAY_TIMEZONES") {
            prefs.display_tzs = raw
                .split(',')
                .filter_map(|name| name.trim().parse::<Tz>().ok())
                .collect();
        }
        if let Some(raw) = config.get("AVAILABILITY") {
            if let Some(windows) = parse_windows(&raw) {
                prefs.windows = windows;
            } else {
                eprintln!("Ignoring malformed AVAILABILITY setting: {}", raw);
            }
        }
        prefs
    }
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_windows(raw: &str) -> Option<Vec<AvailabilityWindow>> {
    let mut windows = Vec::new();
    for entry in raw.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (days_part, times_part) = entry.rsplit_once(' ')?;
        let (start_raw, end_raw) = times_part.split_once('-')?;
        let start_time = NaiveTime::parse_from_str(start_raw.trim(), "%H:%M").ok()?;
        let end_time = NaiveTime::parse_from_str(end_raw.trim(), "%H:%M").ok()?;
        let days: Vec<Weekday> = days_part
            .split(',')
            .map(|d| parse_weekday(d.trim()))
            .collect::<Option<Vec<_>>>()?;
        if days.is_empty() || end_time <= start_time {
            return None;
        }
        windows.push(AvailabilityWindow {
            days,
            start_time,
            end_time,
        });
    }
    if windows.is_empty() { None } else { Some(windows) }
}
