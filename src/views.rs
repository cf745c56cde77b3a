//! Report builders for the read-only commands.

use chrono::{NaiveDate, NaiveDateTime};
use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::aggregate::{
    BAR_UNITS, HourRow, RangeTotal, SessionSpan, SummaryRow, bar_units, hour_rows, split_by_day,
    total_minutes,
};
use crate::domain::Task;
use crate::format::{format_clock, format_duration, pad_right, percent, truncate_to_width};
use crate::palette::Palette;
use crate::render::{Column, Report, Table, styles};
use crate::tracker::candidate_label;

const RANGE_WIDTH: usize = 16;
const DURATION_WIDTH: usize = 5;
const SEPARATOR_WIDTH: usize = 70;
const RUNNING_GLYPH: &str = " 🕒";
const IDLE_GLYPH: &str = "   ";

/// Hour-by-hour view of a single day, one line per session piece.
pub fn day_timeline(spans: &[SessionSpan], palette: &mut Palette, width: usize) -> Report {
    let mut report = timeline_header(spans);

    for HourRow { hour, pieces } in hour_rows(spans) {
        report.line(Span::styled(hour.format("%H:%M").to_string(), styles::heading()));

        let max = pieces.iter().map(|piece| piece.minutes()).max().unwrap_or(0);
        let total: i64 = pieces.iter().map(|piece| piece.minutes()).sum();
        for piece in &pieces {
            let glyph = if piece.is_running { RUNNING_GLYPH } else { IDLE_GLYPH };
            let end = if piece.is_running {
                "--:--".to_string()
            } else {
                format_clock(piece.end)
            };
            let range = format!("[{} -> {}]", format_clock(piece.start), end);
            let label = match &piece.note {
                Some(note) => format!("{} ({})", piece.description, note),
                None => piece.description.clone(),
            };

            let mut spans = vec![
                Span::raw(format!("{glyph}{} ", pad_right(&range, RANGE_WIDTH))),
                Span::styled(fit(&label, width), colored(palette, &piece.description)),
                Span::raw(format!(
                    " {} ",
                    pad_right(&format_duration(piece.minutes()), DURATION_WIDTH)
                )),
            ];
            spans.extend(bar(piece.minutes(), max, total, piece.is_running));
            report.line(spans);
        }

        report.line(separator());
    }

    report
}

/// One block per calendar day with a row per task, longest first.
pub fn multi_day_timeline(spans: &[SessionSpan], palette: &mut Palette, width: usize) -> Report {
    let mut report = timeline_header(spans);

    for (day, totals) in split_by_day(spans) {
        let day_total: i64 = totals.values().map(|total| total.minutes).sum();
        let max = totals.values().map(|total| total.minutes).max().unwrap_or(0);
        report.line(vec![
            Span::styled(day.format("%Y-%m-%d").to_string(), styles::heading()),
            Span::raw(format!(" {}", format_duration(day_total))),
        ]);

        let mut rows: Vec<_> = totals.into_iter().collect();
        rows.sort_by(|left, right| right.1.minutes.cmp(&left.1.minutes));
        for (description, total) in rows {
            let range = format!(
                "[{} -> {}]",
                format_clock(total.earliest_start),
                format_clock(total.latest_end)
            );
            let mut spans = vec![
                Span::raw(format!("  {range} ")),
                Span::styled(fit(&description, width), colored(palette, &description)),
                Span::raw(format!(
                    " {} ",
                    pad_right(&format_duration(total.minutes), DURATION_WIDTH)
                )),
            ];
            spans.extend(bar(total.minutes, max, day_total, false));
            report.line(spans);
        }

        report.line(separator());
    }

    report
}

/// Every session of one task, in start order.
pub fn task_detail(task: &Task, now: NaiveDateTime) -> Report {
    let total = task.total(now).num_minutes();
    let longest = task
        .sessions
        .iter()
        .map(|session| session.minutes(now))
        .max()
        .unwrap_or(0);

    let mut report = Report::new();
    report.line(vec![
        Span::styled("Task Detail:", styles::title()),
        Span::raw(format!(" {}", task.description)),
    ]);
    report.blank();

    let mut table = Table::new(vec![
        Column::new("No.", Some(3)),
        Column::new("Start", Some(6)),
        Column::new("End", Some(6)),
        Column::new("Duration", Some(8)),
        Column::new(format_duration(total), Some(18)),
        Column::new("Note", None),
    ]);
    for (index, session) in task.sessions.iter().enumerate() {
        let minutes = session.minutes(now);
        let end = match session.end_time {
            Some(end) => Line::from(format_clock(end)),
            None => Line::from(Span::styled("--:--", styles::running())),
        };
        let note = session
            .note
            .as_deref()
            .map(|note| {
                note.lines()
                    .filter(|line| !line.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .unwrap_or_default();

        table.push_row(vec![
            Line::from((index + 1).to_string()),
            Line::from(format_clock(session.start_time)),
            end,
            Line::from(format_duration(minutes)),
            Line::from(bar(minutes, longest, total, session.is_running())),
            Line::from(note),
        ]);
    }
    report.table(table);
    report
}

/// Per-task table for one day; marks the task that concluded last.
pub fn day_summary(day: NaiveDate, rows: &[SummaryRow], width: usize) -> Report {
    let total: i64 = rows.iter().map(|row| row.minutes).sum();
    let max = rows.iter().map(|row| row.minutes).max().unwrap_or(0);

    let mut report = Report::new();
    report.line(vec![
        Span::styled("Task Summary:", styles::title()),
        Span::raw(format!(" {}", day.format("%Y-%m-%d"))),
    ]);

    let mut table = summary_table(total, width);
    for (index, row) in rows.iter().enumerate() {
        let mut task = Vec::new();
        if row.top {
            task.push(Span::styled("(top)", styles::top_marker()));
        }
        task.push(Span::raw(truncate_to_width(&row.description, width)));

        let end = if row.is_running {
            Line::from(Span::styled("running", styles::running()))
        } else {
            Line::from(format_clock(row.last_end))
        };
        table.push_row(vec![
            Line::from((index + 1).to_string()),
            Line::from(task),
            Line::from(format_clock(row.first_start)),
            end,
            Line::from(format_duration(row.minutes)),
            Line::from(bar(row.minutes, max, total, false)),
        ]);
    }
    report.table(table);
    report
}

/// Per-description totals across a date range; marks the task that concluded last.
pub fn range_summary(from: NaiveDate, to: NaiveDate, groups: &[RangeTotal], width: usize) -> Report {
    let total: i64 = groups.iter().map(|group| group.minutes).sum();
    let max = groups.iter().map(|group| group.minutes).max().unwrap_or(0);

    let mut report = Report::new();
    report.line(vec![
        Span::styled("Task Summary:", styles::title()),
        Span::raw(format!(" {} ~ {}", from.format("%Y-%m-%d"), to.format("%Y-%m-%d"))),
    ]);

    let mut table = summary_table(total, width);
    for (index, group) in groups.iter().enumerate() {
        let end = if group.is_running {
            Line::from(Span::styled("running", styles::running()))
        } else {
            Line::from(group.latest_end.format("%m-%d").to_string())
        };
        let mut task = Vec::new();
        if group.top {
            task.push(Span::styled("(top)", styles::top_marker()));
        }
        task.push(Span::raw(truncate_to_width(&group.description, width)));
        table.push_row(vec![
            Line::from((index + 1).to_string()),
            Line::from(task),
            Line::from(group.earliest_start.format("%m-%d").to_string()),
            end,
            Line::from(format_duration(group.minutes)),
            Line::from(bar(group.minutes, max, total, false)),
        ]);
    }
    report.table(table);
    report
}

/// The numbered list that index selectors refer to.
pub fn recent(candidates: &[Task], palette: &mut Palette) -> Report {
    let mut report = Report::new();
    report.line(Span::styled("Recent Tasks", styles::title()));
    for (index, task) in candidates.iter().enumerate() {
        let mut line = vec![Span::raw(format!("{:>3}. ", index + 1))];
        let label = candidate_label(task);
        match label.strip_suffix(task.description.as_str()) {
            Some(prefix) => {
                line.push(Span::raw(prefix.to_string()));
                line.push(Span::styled(
                    task.description.clone(),
                    colored(palette, &task.description),
                ));
            }
            None => line.push(Span::raw(label)),
        }
        if task.is_running() {
            line.push(Span::styled(" (running)", styles::running()));
        }
        report.line(line);
    }
    report
}

fn timeline_header(spans: &[SessionSpan]) -> Report {
    let mut report = Report::new();
    report.line(vec![
        Span::styled("Timeline View", styles::title()),
        Span::raw(format!(" {}", format_duration(total_minutes(spans)))),
    ]);
    report.blank();
    report
}

fn summary_table(total: i64, width: usize) -> Table {
    Table::new(vec![
        Column::new("No.", Some(3)),
        Column::new("Task", Some(width)),
        Column::new("Start", Some(6)),
        Column::new("End", Some(6)),
        Column::new("Duration", Some(8)),
        Column::new(format_duration(total), Some(18)),
    ])
}

fn colored(palette: &mut Palette, description: &str) -> Style {
    Style::default().fg(palette.color_for(description))
}

fn fit(text: &str, width: usize) -> String {
    pad_right(&truncate_to_width(text, width), width)
}

fn separator() -> Line<'static> {
    Line::from(Span::styled("-".repeat(SEPARATOR_WIDTH), styles::separator()))
}

fn bar(value: i64, max: i64, total: i64, running: bool) -> Vec<Span<'static>> {
    let filled = bar_units(value as f64, max as f64);
    vec![
        Span::styled("▄".repeat(filled), styles::bar_filled(running)),
        Span::styled("▁".repeat(BAR_UNITS - filled), styles::bar_empty(running)),
        Span::raw(format!(" {}", percent(value as f64, total as f64))),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::aggregate::{SessionSpan, group_range, summarize_day};
    use crate::config::DisplayConfig;
    use crate::domain::{DayLog, Session, Task};
    use crate::palette::Palette;

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn span(description: &str, start: NaiveDateTime, end: NaiveDateTime, running: bool) -> SessionSpan {
        SessionSpan {
            description: description.to_string(),
            start,
            end,
            is_running: running,
            note: None,
        }
    }

    fn palette() -> Palette {
        Palette::new(&DisplayConfig::default())
    }

    #[test]
    fn day_timeline_lists_pieces_per_hour() {
        let spans = vec![
            span("focus", at(27, 9, 40), at(27, 10, 10), false),
            span("call", at(27, 10, 10), at(27, 10, 25), true),
        ];
        let text = day_timeline(&spans, &mut palette(), 10).plain_text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Timeline View 0h45m");
        assert_eq!(lines[2], "09:00");
        assert_eq!(lines[3], "   [09:40 -> 10:00] focus      0h20m ▄▄▄▄▄▄▄▄▄▄ 100.00%");
        assert_eq!(lines[4], "-".repeat(70));
        assert_eq!(lines[5], "10:00");
        assert_eq!(lines[6], "   [10:00 -> 10:10] focus      0h10m ▄▄▄▄▄▄▄▁▁▁ 40.00%");
        assert_eq!(lines[7], " 🕒[10:10 -> --:--] call       0h15m ▄▄▄▄▄▄▄▄▄▄ 60.00%");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn notes_follow_the_description() {
        let mut noted = span("focus", at(27, 9, 0), at(27, 9, 30), false);
        noted.note = Some("[09:10] draft".to_string());
        let text = day_timeline(&[noted], &mut palette(), 40).plain_text();
        assert!(text.contains("focus ([09:10] draft)"));
    }

    #[test]
    fn multi_day_timeline_splits_at_midnight() {
        let spans = vec![
            span("night shift", at(27, 23, 0), at(28, 1, 0), false),
            span("standup", at(28, 9, 0), at(28, 9, 15), false),
        ];
        let text = multi_day_timeline(&spans, &mut palette(), 12).plain_text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Timeline View 2h15m");
        assert_eq!(lines[2], "2025-04-27 1h00m");
        assert_eq!(lines[3], "  [23:00 -> 00:00] night shift  1h00m ▄▄▄▄▄▄▄▄▄▄ 100.00%");
        assert_eq!(lines[5], "2025-04-28 1h15m");
        assert!(lines[6].starts_with("  [00:00 -> 01:00] night shift"));
        assert!(lines[7].contains("standup"));
        assert!(lines[7].ends_with("20.00%"));
    }

    #[test]
    fn task_detail_scales_against_the_longest_session() {
        let mut task = Task::new("review", Session::closed(at(27, 9, 0), at(27, 10, 0)));
        let mut second = Session::closed(at(27, 11, 0), at(27, 11, 30));
        second.append_note("follow-up", at(27, 11, 5));
        second.append_note("done", at(27, 11, 25));
        task.insert_session(second);

        let text = task_detail(&task, at(27, 12, 0)).plain_text();
        assert!(text.starts_with("Task Detail: review\n"));
        assert!(text.contains("1h30m"));
        assert!(text.contains("▄▄▄▄▄▄▄▄▄▄ 66.67%"));
        assert!(text.contains("▄▄▄▄▄▁▁▁▁▁ 33.33%"));
        assert!(text.contains("[11:05] follow-up | [11:25] done"));
    }

    #[test]
    fn day_summary_marks_top_and_running_rows() {
        let log = DayLog::new(
            at(27, 0, 0).date(),
            vec![
                Task::new("write", Session::closed(at(27, 9, 0), at(27, 10, 0))),
                Task::new("email", Session::open(at(27, 10, 0))),
            ],
        );
        let rows = summarize_day(&log, at(27, 10, 30));
        let text = day_summary(log.day, &rows, 20).plain_text();
        assert!(text.starts_with("Task Summary: 2025-04-27\n"));
        assert!(text.contains("(top)write"));
        assert!(text.contains("running"));
        assert!(text.contains("1h30m"));
    }

    #[test]
    fn range_summary_uses_month_day_columns() {
        let groups = group_range(&[
            span("a", at(21, 9, 0), at(21, 10, 0), false),
            span("a", at(23, 9, 0), at(23, 10, 0), false),
        ]);
        let from = NaiveDate::from_ymd_opt(2025, 4, 21).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 4, 27).unwrap();
        let text = range_summary(from, to, &groups, 20).plain_text();
        assert!(text.starts_with("Task Summary: 2025-04-21 ~ 2025-04-27\n"));
        assert!(text.contains("04-21"));
        assert!(text.contains("04-23"));
        assert!(text.contains("2h00m"));
    }

    #[test]
    fn range_summary_marks_the_latest_finished_task() {
        let groups = group_range(&[
            span("long", at(21, 8, 0), at(21, 11, 0), false),
            span("latest", at(22, 11, 0), at(22, 12, 0), false),
        ]);
        let from = NaiveDate::from_ymd_opt(2025, 4, 21).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 4, 27).unwrap();
        let text = range_summary(from, to, &groups, 20).plain_text();
        assert!(text.contains("(top)latest"));
        assert!(!text.contains("(top)long"));
    }

    #[test]
    fn recent_numbers_candidates() {
        let tasks = vec![Task::new("deploy", Session::closed(at(27, 16, 0), at(27, 16, 41)))];
        let text = recent(&tasks, &mut palette()).plain_text();
        assert!(text.contains("  1. (Sun 2025-04-27 16:41) deploy"));
    }
}
