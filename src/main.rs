mod aggregate;
mod config;
mod domain;
mod error;
mod format;
mod logging;
mod palette;
mod paths;
mod prompt;
mod render;
mod select;
mod storage;
mod tracker;
mod views;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, SubsecRound};
use clap::{Parser, Subcommand};
use ratatui::style::Style;
use ratatui::text::Span;

use crate::aggregate::{collect_spans, group_range, summarize_day};
use crate::config::Config;
use crate::error::{ErrorKind, TrackError};
use crate::format::{format_clock, format_duration, on_day, parse_clock, parse_day, start_of_week};
use crate::palette::Palette;
use crate::prompt::Prompt;
use crate::render::{Painter, Report, styles};
use crate::select::{Chooser, Selector};
use crate::storage::{FileStore, SessionStore};
use crate::tracker::{Origin, Popped, StartRequest, Started, Stopped, Tracker};

#[derive(Debug, Parser)]
#[command(name = "worklog", about = "Personal work-session tracker")]
struct Cli {
	/// Directory holding one JSON file per day
	#[arg(long, global = true)]
	data_dir: Option<PathBuf>,
	#[arg(long, global = true)]
	no_color: bool,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Start a task by list index or description
	Start {
		selector: String,
		/// Start time today (HH:MM)
		#[arg(long)]
		at: Option<String>,
		/// Also match tasks recorded since this day (YYYY-MM-DD)
		#[arg(long)]
		from: Option<String>,
	},
	/// Stop the running session
	Stop {
		#[arg(long)]
		at: Option<String>,
	},
	/// Stop the running session and start another task
	Push {
		selector: String,
		#[arg(long)]
		at: Option<String>,
	},
	/// Go back to the previous task, or discard the running session with --delete
	Pop {
		#[arg(long)]
		delete: bool,
	},
	/// Book the time since an interruption to a new task
	Split {
		description: String,
		/// When the interruption began (HH:MM); asked when omitted
		#[arg(long)]
		at: Option<String>,
	},
	/// Record a session after the fact
	Retro {
		description: String,
		#[arg(long)]
		start: Option<String>,
		#[arg(long, conflicts_with = "running")]
		end: Option<String>,
		/// Leave the session running
		#[arg(long)]
		running: bool,
	},
	/// Add a note to the running session
	Note { content: String },
	/// Add a note to any of today's sessions
	NoteSelect {
		/// 1-based position in the session list; asked when omitted
		#[arg(long)]
		index: Option<usize>,
		content: Option<String>,
	},
	/// Show the running task
	Curr,
	/// List the tasks that numeric selectors refer to
	Recent {
		#[arg(long)]
		from: Option<String>,
	},
	/// Timeline of one or more days
	Tl {
		#[arg(long, visible_alias = "at")]
		from: Option<String>,
		#[arg(long)]
		to: Option<String>,
		#[arg(long)]
		filter: Option<String>,
	},
	/// Task summary for a day, a week or a date range
	Ls {
		/// Show one task's sessions instead
		selector: Option<String>,
		#[arg(long)]
		at: Option<String>,
		#[arg(long)]
		week: bool,
		#[arg(long)]
		from: Option<String>,
		#[arg(long)]
		to: Option<String>,
		#[arg(long)]
		filter: Option<String>,
	},
	/// Sessions of one task
	Task {
		selector: String,
		#[arg(long)]
		at: Option<String>,
	},
}

struct App {
	config: Config,
	store: FileStore,
	painter: Painter,
	now: NaiveDateTime,
}

fn main() {
	let cli = Cli::parse();
	let color = !cli.no_color && io::stdout().is_terminal();

	if let Err(err) = run(cli, color) {
		let style = match err.downcast_ref::<TrackError>().map(TrackError::kind) {
			Some(ErrorKind::NotFound) => styles::warning(),
			_ => styles::error(),
		};
		let mut report = Report::new();
		report.line(Span::styled(format!("error: {err:#}"), style));
		let painter = Painter::new(color && io::stderr().is_terminal());
		if painter.paint(&report, &mut io::stderr()).is_err() {
			eprintln!("error: {err:#}");
		}
		std::process::exit(1);
	}
}

fn run(cli: Cli, color: bool) -> Result<()> {
	let config = Config::load_from(&paths::config_path())?;

	let _log_guard = match logging::init(&config.logging, &paths::state_dir()) {
		Ok(guard) => Some(guard),
		Err(err) => {
			eprintln!("warning: logging disabled: {err}");
			None
		}
	};

	let app = App {
		painter: Painter::new(color && config.display.color),
		store: FileStore::new(paths::data_dir(cli.data_dir, config.data_dir.as_deref())),
		now: Local::now().naive_local().trunc_subsecs(0),
		config,
	};
	tracing::debug!(data_dir = %app.store.dir().display(), command = ?cli.command, "running command");
	app.dispatch(cli.command)
}

impl App {
	fn tracker(&self) -> Tracker<'_, FileStore> {
		Tracker::new(&self.store, self.config.tracking.clone())
	}

	fn today(&self) -> NaiveDate {
		self.now.date()
	}

	fn dispatch(&self, command: Command) -> Result<()> {
		let mut prompt = Prompt::stdio();

		match command {
			Command::Start { selector, at, from } => {
				let request = StartRequest {
					selector: Selector::parse(&selector)?,
					at: at.as_deref().map(parse_clock).transpose()?,
					search_from: from.as_deref().map(parse_day).transpose()?,
				};
				let started = self.tracker().start(&request, self.now, &mut prompt)?;
				self.report_started(&started)?;
			}
			Command::Stop { at } => {
				let at = at.as_deref().map(parse_clock).transpose()?;
				match self.tracker().stop(at, self.now)? {
					Some(stopped) => self.report_stopped(&stopped)?,
					None => self.say(styles::warning(), "no session is running")?,
				}
			}
			Command::Push { selector, at } => {
				let at = at.as_deref().map(parse_clock).transpose()?;
				let pushed =
					self.tracker()
						.push(&Selector::parse(&selector)?, at, self.now, &mut prompt)?;
				if let Some(stopped) = &pushed.stopped {
					self.report_stopped(stopped)?;
				}
				self.report_started(&pushed.started)?;
			}
			Command::Pop { delete } => match self.tracker().pop(delete, self.now)? {
				Popped::Deleted { description } => {
					self.say(
						styles::success(),
						format!("discarded the running session of `{description}`"),
					)?;
				}
				Popped::Resumed { stopped, resumed } => {
					if let Some(stopped) = &stopped {
						self.report_stopped(stopped)?;
					}
					self.say(
						styles::success(),
						format!("resumed `{resumed}` at {}", format_clock(self.now)),
					)?;
				}
			},
			Command::Split { description, at } => {
				let at = match at {
					Some(raw) => parse_clock(&raw)?,
					None => prompt.ask_clock("Interrupted at (HH:MM):")?,
				};
				let split = self
					.tracker()
					.split(&description, on_day(self.today(), at), self.now)?;
				self.say(
					styles::success(),
					format!(
						"`{}` ended at {}; `{}` took {}",
						split.interrupted,
						format_clock(split.at),
						split.description,
						format_duration(split.minutes)
					),
				)?;
			}
			Command::Retro {
				description,
				start,
				end,
				running,
			} => {
				let start = match start {
					Some(raw) => parse_clock(&raw)?,
					None => prompt.ask_clock("Start (HH:MM):")?,
				};
				let end = match end {
					Some(raw) => Some(parse_clock(&raw)?),
					None if running => None,
					None => prompt.ask_optional_clock("End (HH:MM, empty to leave running):")?,
				};
				let recorded = self
					.tracker()
					.retro(&description, start, end, self.now, &mut prompt)?;
				let range = match recorded.end {
					Some(end) => format!("{} - {}", format_clock(recorded.start), format_clock(end)),
					None => format!("from {} (running)", format_clock(recorded.start)),
				};
				let created = if recorded.created { " as a new task" } else { "" };
				self.say(
					styles::success(),
					format!("recorded `{}` {range}{created}", recorded.description),
				)?;
			}
			Command::Note { content } => {
				let description = self.tracker().note(&content, self.now)?;
				self.say(styles::success(), format!("noted on `{description}`"))?;
			}
			Command::NoteSelect { index, content } => {
				let tracker = self.tracker();
				let index = match index {
					Some(0) => bail!(TrackError::InvalidChoice("0".to_string())),
					Some(index) => index - 1,
					None => {
						let choices = tracker.session_choices(self.now)?;
						if choices.is_empty() {
							self.say(styles::warning(), "no sessions recorded today")?;
							return Ok(());
						}
						let labels: Vec<String> = choices.iter().map(|choice| choice.label()).collect();
						prompt.choose("Pick a session:", &labels)?
					}
				};
				let content = match content {
					Some(content) => content,
					None => prompt.ask("Note:")?,
				};
				let description = tracker.note_session(index, &content, self.now)?;
				self.say(styles::success(), format!("noted on `{description}`"))?;
			}
			Command::Curr => match self.tracker().current(self.now)? {
				Some(current) => self.say(
					styles::success(),
					format!(
						"`{}` running since {} ({})",
						current.description,
						format_clock(current.start),
						format_duration(current.minutes)
					),
				)?,
				None => self.say(styles::warning(), "no session is running")?,
			},
			Command::Recent { from } => {
				let from = match from {
					Some(raw) => parse_day(&raw)?,
					None => self.today() - Duration::days(self.config.tracking.search_back_days),
				};
				let candidates = self.tracker().candidates(from, self.now)?;
				if candidates.is_empty() {
					self.say(styles::warning(), "no tasks recorded in that window")?;
					return Ok(());
				}
				let mut palette = Palette::new(&self.config.display);
				self.show(&views::recent(&candidates, &mut palette))?;
			}
			Command::Tl { from, to, filter } => self.timeline(from, to, filter)?,
			Command::Ls {
				selector,
				at,
				week,
				from,
				to,
				filter,
			} => match selector {
				Some(selector) => self.task(&selector, at, &mut prompt)?,
				None if week || from.is_some() || to.is_some() => {
					self.range(at, week, from, to, filter)?
				}
				None => self.day(at, filter)?,
			},
			Command::Task { selector, at } => self.task(&selector, at, &mut prompt)?,
		}

		Ok(())
	}

	fn timeline(&self, from: Option<String>, to: Option<String>, filter: Option<String>) -> Result<()> {
		let from = self.day_or_today(from.as_deref())?;
		let to = match to {
			Some(raw) => parse_day(&raw)?,
			None => from,
		};
		if from > to {
			bail!(TrackError::invalid("start date cannot be after end date"));
		}

		let logs = self.store.load_range(from, to)?;
		let spans = collect_spans(&logs, filter.as_deref(), self.now);
		if spans.is_empty() {
			return self.say(styles::warning(), "no sessions recorded in that range");
		}

		let mut palette = Palette::new(&self.config.display);
		let width = self.config.display.description_width;
		let report = if from == to {
			views::day_timeline(&spans, &mut palette, width)
		} else {
			views::multi_day_timeline(&spans, &mut palette, width)
		};
		self.show(&report)
	}

	fn range(
		&self,
		at: Option<String>,
		week: bool,
		from: Option<String>,
		to: Option<String>,
		filter: Option<String>,
	) -> Result<()> {
		let base = self.day_or_today(at.as_deref())?;
		let from = match from {
			Some(raw) => parse_day(&raw)?,
			None if week => start_of_week(base),
			None => base,
		};
		let to = match to {
			Some(raw) => parse_day(&raw)?,
			None if week => from + Duration::days(6),
			None => from,
		};
		if from > to {
			bail!(TrackError::invalid("start date cannot be after end date"));
		}

		let logs = self.store.load_range(from, to)?;
		let groups = group_range(&collect_spans(&logs, filter.as_deref(), self.now));
		if groups.is_empty() {
			return self.say(styles::warning(), "no sessions recorded in that range");
		}
		self.show(&views::range_summary(
			from,
			to,
			&groups,
			self.config.display.description_width,
		))
	}

	fn day(&self, at: Option<String>, filter: Option<String>) -> Result<()> {
		let day = self.day_or_today(at.as_deref())?;
		let mut log = self.store.load(day)?;
		if let Some(filter) = filter.as_deref() {
			log.tasks.retain(|task| task.description.contains(filter));
		}

		let rows = summarize_day(&log, self.now);
		if rows.is_empty() {
			return self.say(styles::warning(), "no tasks recorded on that day");
		}
		self.show(&views::day_summary(
			day,
			&rows,
			self.config.display.description_width,
		))
	}

	fn task(&self, selector: &str, at: Option<String>, chooser: &mut dyn Chooser) -> Result<()> {
		let day = self.day_or_today(at.as_deref())?;
		let task = self
			.tracker()
			.task_on(day, &Selector::parse(selector)?, chooser)?;
		self.show(&views::task_detail(&task, self.now))
	}

	fn day_or_today(&self, raw: Option<&str>) -> Result<NaiveDate> {
		match raw {
			Some(raw) => Ok(parse_day(raw)?),
			None => Ok(self.today()),
		}
	}

	fn report_started(&self, started: &Started) -> Result<()> {
		let at = format_clock(started.start);
		let message = match (started.origin, started.reopened) {
			(Origin::New, _) => format!("created `{}` and started at {at}", started.description),
			(_, true) => format!("picked `{}` back up (session reopened)", started.description),
			(Origin::Continued, false) => {
				format!("continued `{}` from an earlier day at {at}", started.description)
			}
			(Origin::Today, false) => format!("started `{}` at {at}", started.description),
		};
		self.say(styles::success(), message)
	}

	fn report_stopped(&self, stopped: &Stopped) -> Result<()> {
		self.say(
			styles::success(),
			format!(
				"stopped `{}` at {} ({})",
				stopped.description,
				format_clock(stopped.end),
				format_duration(stopped.minutes)
			),
		)
	}

	fn say(&self, style: Style, message: impl Into<String>) -> Result<()> {
		let mut report = Report::new();
		report.line(Span::styled(message.into(), style));
		self.show(&report)
	}

	fn show(&self, report: &Report) -> Result<()> {
		let mut stdout = io::stdout().lock();
		self.painter
			.paint(report, &mut stdout)
			.context("failed to write to the terminal")?;
		stdout.flush().context("failed to write to the terminal")
	}
}

#[cfg(test)]
mod tests {
	use clap::{CommandFactory, Parser};

	use super::{Cli, Command};

	#[test]
	fn cli_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_global_flags_after_the_subcommand() {
		let cli = Cli::parse_from(["worklog", "stop", "--at", "17:30", "--no-color"]);
		assert!(cli.no_color);
		assert!(matches!(cli.command, Command::Stop { at: Some(ref at) } if at == "17:30"));
	}

	#[test]
	fn tl_accepts_at_as_an_alias_for_from() {
		let cli = Cli::parse_from(["worklog", "tl", "--at", "2025-04-27"]);
		assert!(matches!(cli.command, Command::Tl { from: Some(ref day), .. } if day == "2025-04-27"));
	}

	#[test]
	fn retro_end_and_running_conflict() {
		let parsed = Cli::try_parse_from([
			"worklog", "retro", "design", "--start", "09:00", "--end", "10:00", "--running",
		]);
		assert!(parsed.is_err());
	}
}
