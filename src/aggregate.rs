//! Turns stored day logs into the numbers the views draw: spans, per-day and
//! per-range totals, hour buckets and bar lengths.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::{DayLog, merge_by_description};
use crate::format::floor_hour;

pub const BAR_UNITS: usize = 10;

/// One session flattened out of its task, with `end` resolved against now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpan {
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub is_running: bool,
    pub note: Option<String>,
}

impl SessionSpan {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTotal {
    pub minutes: i64,
    pub earliest_start: NaiveDateTime,
    pub latest_end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeTotal {
    pub description: String,
    pub minutes: i64,
    pub earliest_start: NaiveDateTime,
    pub latest_end: NaiveDateTime,
    pub is_running: bool,
    /// The description that concluded most recently within the range.
    pub top: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub description: String,
    pub first_start: NaiveDateTime,
    pub last_end: NaiveDateTime,
    pub minutes: i64,
    pub is_running: bool,
    /// The task that concluded most recently.
    pub top: bool,
}

/// A span clipped to one clock hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub description: String,
    pub note: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub is_running: bool,
}

impl Piece {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourRow {
    pub hour: NaiveDateTime,
    pub pieces: Vec<Piece>,
}

/// Every session in `logs` whose description contains `filter`, sorted by start.
pub fn collect_spans(logs: &[DayLog], filter: Option<&str>, now: NaiveDateTime) -> Vec<SessionSpan> {
    let mut spans: Vec<SessionSpan> = logs
        .iter()
        .flat_map(|log| log.tasks.iter())
        .filter(|task| filter.is_none_or(|needle| task.description.contains(needle)))
        .flat_map(|task| {
            task.sessions.iter().map(move |session| SessionSpan {
                description: task.description.clone(),
                start: session.start_time,
                end: session.effective_end(now),
                is_running: session.is_running(),
                note: session.note.clone(),
            })
        })
        .collect();
    spans.sort_by_key(|span| span.start);
    spans
}

pub fn total_minutes(spans: &[SessionSpan]) -> i64 {
    spans.iter().map(SessionSpan::minutes).sum()
}

/// Cuts spans at midnight so each calendar day only counts its own share.
pub fn split_by_day(spans: &[SessionSpan]) -> BTreeMap<NaiveDate, BTreeMap<String, DayTotal>> {
    let mut days: BTreeMap<NaiveDate, BTreeMap<String, DayTotal>> = BTreeMap::new();

    for span in spans {
        let mut day = span.start.date();
        while day <= span.end.date() {
            let day_start = day.and_time(NaiveTime::MIN);
            let next_day = day_start + Duration::days(1);
            let from = span.start.max(day_start);
            let to = span.end.min(next_day);

            if from < to {
                let minutes = (to - from).num_minutes();
                days.entry(day)
                    .or_default()
                    .entry(span.description.clone())
                    .and_modify(|total| {
                        total.minutes += minutes;
                        total.earliest_start = total.earliest_start.min(from);
                        total.latest_end = total.latest_end.max(to);
                    })
                    .or_insert(DayTotal {
                        minutes,
                        earliest_start: from,
                        latest_end: to,
                    });
            }

            let Some(next) = day.succ_opt() else {
                break;
            };
            day = next;
        }
    }

    days
}

/// One row per description across the whole range, longest first.
pub fn group_range(spans: &[SessionSpan]) -> Vec<RangeTotal> {
    let mut seconds: Vec<i64> = Vec::new();
    let mut groups: Vec<RangeTotal> = Vec::new();

    for span in spans {
        let elapsed = (span.end - span.start).num_seconds();
        match groups
            .iter()
            .position(|group| group.description == span.description)
        {
            Some(index) => {
                let group = &mut groups[index];
                seconds[index] += elapsed;
                group.earliest_start = group.earliest_start.min(span.start);
                group.latest_end = group.latest_end.max(span.end);
                group.is_running |= span.is_running;
            }
            None => {
                seconds.push(elapsed);
                groups.push(RangeTotal {
                    description: span.description.clone(),
                    minutes: 0,
                    earliest_start: span.start,
                    latest_end: span.end,
                    is_running: span.is_running,
                    top: false,
                });
            }
        }
    }

    for (group, seconds) in groups.iter_mut().zip(seconds) {
        group.minutes = seconds / 60;
    }
    let top = groups
        .iter()
        .enumerate()
        .filter(|(_, group)| !group.is_running)
        .max_by_key(|(_, group)| group.latest_end)
        .map(|(index, _)| index);
    if let Some(index) = top {
        groups[index].top = true;
    }
    groups.sort_by(|left, right| right.minutes.cmp(&left.minutes));
    groups
}

/// Per-description rows for one day, longest first.
pub fn summarize_day(log: &DayLog, now: NaiveDateTime) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = merge_by_description(log.tasks.iter().cloned())
        .into_iter()
        .filter_map(|task| {
            Some(SummaryRow {
                first_start: task.first_start()?,
                last_end: task.last_end(now)?,
                minutes: task.total(now).num_minutes(),
                is_running: task.is_running(),
                top: false,
                description: task.description,
            })
        })
        .collect();

    let top = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.is_running)
        .max_by_key(|(_, row)| row.last_end)
        .map(|(index, _)| index);
    if let Some(index) = top {
        rows[index].top = true;
    }

    rows.sort_by(|left, right| right.minutes.cmp(&left.minutes));
    rows
}

/// Buckets spans into clock hours. A span running past the hour is cut at
/// the boundary and continues in the next row; only its last piece keeps
/// the running flag.
pub fn hour_rows(spans: &[SessionSpan]) -> Vec<HourRow> {
    let (Some(first), Some(last_end)) = (
        spans.iter().map(|span| span.start).min(),
        spans.iter().map(|span| span.end).max(),
    ) else {
        return Vec::new();
    };

    let mut pending: Vec<&SessionSpan> = spans.iter().collect();
    pending.sort_by_key(|span| span.start);

    let last = floor_hour(last_end) + Duration::hours(1);
    let mut hour = floor_hour(first);
    let mut cursor = 0;
    let mut carried: Vec<&SessionSpan> = Vec::new();
    let mut rows = Vec::new();

    while hour < last {
        let next = hour + Duration::hours(1);
        let mut active: Vec<(NaiveDateTime, &SessionSpan)> =
            carried.drain(..).map(|span| (hour, span)).collect();
        while let Some(span) = pending.get(cursor).copied() {
            if span.start >= next {
                break;
            }
            active.push((span.start, span));
            cursor += 1;
        }

        let mut pieces = Vec::new();
        for (start, span) in active {
            if span.end <= next {
                pieces.push(piece(span, start, span.end, span.is_running));
            } else {
                pieces.push(piece(span, start, next, false));
                carried.push(span);
            }
        }

        rows.push(HourRow { hour, pieces });
        hour = next;
    }

    rows
}

fn piece(span: &SessionSpan, start: NaiveDateTime, end: NaiveDateTime, is_running: bool) -> Piece {
    Piece {
        description: span.description.clone(),
        note: span.note.clone(),
        start,
        end,
        is_running,
    }
}

/// Filled units out of [`BAR_UNITS`]; anything recorded shows at least one.
pub fn bar_units(value: f64, max: f64) -> usize {
    if max <= 0.0 {
        return 1;
    }
    let units = (value / max * BAR_UNITS as f64).round();
    (units.max(1.0) as usize).min(BAR_UNITS)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::domain::{DayLog, Session, Task};

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn span(description: &str, start: NaiveDateTime, end: NaiveDateTime) -> SessionSpan {
        SessionSpan {
            description: description.to_string(),
            start,
            end,
            is_running: false,
            note: None,
        }
    }

    #[test]
    fn bar_lengths_scale_with_a_floor_of_one() {
        assert_eq!(bar_units(5.0, 10.0), 5);
        assert_eq!(bar_units(0.4, 10.0), 1);
        assert_eq!(bar_units(10.0, 10.0), 10);
        assert_eq!(bar_units(3.0, 0.0), 1);
    }

    #[test]
    fn spans_cover_filtered_sessions_in_start_order() {
        let mut review = Task::new("code review", Session::closed(at(27, 14, 0), at(27, 15, 0)));
        review.insert_session(Session::open(at(27, 16, 0)));
        let log = DayLog::new(
            at(27, 0, 0).date(),
            vec![
                review,
                Task::new("deploy", Session::closed(at(27, 9, 0), at(27, 9, 30))),
            ],
        );

        let all = collect_spans(std::slice::from_ref(&log), None, at(27, 16, 20));
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].description, "deploy");
        assert!(all[2].is_running);
        assert_eq!(all[2].end, at(27, 16, 20));
        assert_eq!(total_minutes(&all), 110);

        let filtered = collect_spans(&[log], Some("review"), at(27, 16, 20));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn midnight_crossing_counts_toward_both_days() {
        let days = split_by_day(&[span("night shift", at(27, 23, 0), at(28, 1, 0))]);
        let first = &days[&at(27, 0, 0).date()]["night shift"];
        let second = &days[&at(28, 0, 0).date()]["night shift"];
        assert_eq!(first.minutes, 60);
        assert_eq!(first.latest_end, at(28, 0, 0));
        assert_eq!(second.minutes, 60);
        assert_eq!(second.earliest_start, at(28, 0, 0));
    }

    #[test]
    fn range_groups_ignore_day_boundaries() {
        let mut running = span("b", at(28, 10, 0), at(28, 10, 30));
        running.is_running = true;
        let groups = group_range(&[
            span("a", at(27, 9, 0), at(27, 10, 0)),
            span("a", at(28, 9, 0), at(28, 9, 30)),
            running,
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].description, "a");
        assert_eq!(groups[0].minutes, 90);
        assert_eq!(groups[0].earliest_start, at(27, 9, 0));
        assert_eq!(groups[0].latest_end, at(28, 9, 30));
        assert!(!groups[0].is_running);
        assert!(groups[1].is_running);
    }

    #[test]
    fn day_summary_merges_descriptions_and_marks_top() {
        let log = DayLog::new(
            at(27, 0, 0).date(),
            vec![
                Task::new("write", Session::closed(at(27, 9, 0), at(27, 10, 0))),
                Task::new("call", Session::closed(at(27, 10, 0), at(27, 10, 20))),
                Task::new("write", Session::closed(at(27, 11, 0), at(27, 11, 30))),
                Task::new("email", Session::open(at(27, 11, 30))),
            ],
        );
        let rows = summarize_day(&log, at(27, 12, 0));
        let names: Vec<&str> = rows.iter().map(|row| row.description.as_str()).collect();
        assert_eq!(names, vec!["write", "email", "call"]);
        assert_eq!(rows[0].minutes, 90);
        assert!(rows[0].top);
        assert!(rows[1].is_running);
        assert!(!rows[1].top);
        assert!(!rows[2].top);
    }

    #[test]
    fn hour_rows_cut_spans_at_the_boundary() {
        let mut long = span("focus", at(27, 9, 40), at(27, 11, 10));
        long.is_running = true;
        let rows = hour_rows(&[long, span("break", at(27, 11, 10), at(27, 11, 20))]);

        let hours: Vec<String> = rows.iter().map(|row| row.hour.format("%H:%M").to_string()).collect();
        assert_eq!(hours, vec!["09:00", "10:00", "11:00"]);
        assert_eq!(rows[0].pieces[0].minutes(), 20);
        assert!(!rows[0].pieces[0].is_running);
        assert_eq!(rows[1].pieces[0].start, at(27, 10, 0));
        assert_eq!(rows[1].pieces[0].minutes(), 60);
        assert_eq!(rows[2].pieces.len(), 2);
        assert!(rows[2].pieces[0].is_running);
        assert_eq!(rows[2].pieces[1].description, "break");
    }

    #[test]
    fn hour_rows_keep_overlapping_spans() {
        let rows = hour_rows(&[
            span("long", at(27, 9, 0), at(27, 11, 0)),
            span("inner", at(27, 9, 30), at(27, 9, 45)),
        ]);
        let pieces: usize = rows.iter().map(|row| row.pieces.len()).sum();
        assert_eq!(pieces, 3);
        assert!(hour_rows(&[]).is_empty());
    }

    #[test]
    fn spans_starting_under_a_cut_span_stay_in_their_hour() {
        let rows = hour_rows(&[
            span("X", at(27, 9, 0), at(27, 11, 0)),
            span("X", at(27, 9, 30), at(27, 9, 45)),
        ]);
        let starts: Vec<Vec<NaiveDateTime>> = rows
            .iter()
            .map(|row| row.pieces.iter().map(|piece| piece.start).collect())
            .collect();
        assert_eq!(
            starts,
            vec![vec![at(27, 9, 0), at(27, 9, 30)], vec![at(27, 10, 0)]]
        );
        assert_eq!(rows[0].pieces[0].end, at(27, 10, 0));
    }

    #[test]
    fn range_top_goes_to_the_latest_finished_group() {
        let mut running = span("live", at(28, 13, 0), at(28, 14, 0));
        running.is_running = true;
        let groups = group_range(&[
            span("long", at(27, 8, 0), at(27, 11, 0)),
            span("latest", at(28, 11, 0), at(28, 12, 0)),
            running,
        ]);
        let top: Vec<&str> = groups
            .iter()
            .filter(|group| group.top)
            .map(|group| group.description.as_str())
            .collect();
        assert_eq!(top, vec!["latest"]);
        assert_eq!(groups[0].description, "long");
    }
}
