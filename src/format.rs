//! Time parsing and display-width aware text helpers.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::error::{Result, TrackError};

const ELLIPSIS: &str = "...";

/// `95` becomes `1h35m`.
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h{:02}m", minutes / 60, minutes % 60)
}

pub fn format_clock(timestamp: NaiveDateTime) -> String {
    timestamp.format("%H:%M").to_string()
}

/// Accepts `HH:MM`.
pub fn parse_clock(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| TrackError::invalid(format!("invalid time `{}` (use HH:MM)", raw.trim())))
}

pub fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| TrackError::invalid(format!("invalid date `{}` (use YYYY-MM-DD)", raw.trim())))
}

pub fn on_day(day: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    day.and_time(time)
}

pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    let days_from_monday = day.weekday().num_days_from_monday() as i64;
    day - Duration::days(days_from_monday)
}

pub fn floor_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp.date().and_time(NaiveTime::MIN) + Duration::hours(timestamp.hour() as i64)
}

pub fn weekday_label(day: NaiveDate) -> String {
    day.format("%a").to_string()
}

pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Left-justifies to `width` terminal columns.
pub fn pad_right(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(text));
    format!("{text}{}", " ".repeat(pad))
}

/// Fits `text` into `max_width` columns on one line, ending in `...` when cut.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    let single_line: String = text
        .chars()
        .filter(|ch| *ch != '\r')
        .map(|ch| if ch == '\n' { ' ' } else { ch })
        .collect();
    if display_width(&single_line) <= max_width {
        return single_line;
    }

    let budget = max_width.saturating_sub(ELLIPSIS.len());
    let mut truncated = String::new();
    let mut used = 0;
    for ch in single_line.chars() {
        let width = ch.width().unwrap_or(0);
        if used + width > budget {
            break;
        }
        truncated.push(ch);
        used += width;
    }
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Share of `total` with two decimals, e.g. `33.33%`.
pub fn percent(value: f64, total: f64) -> String {
    let ratio = if total > 0.0 { value / total } else { 0.0 };
    format!("{:.2}%", ratio * 100.0)
}
