//! Session state machine.
//!
//! Every operation is one read-modify-write of today's log: load, mutate in
//! memory, validate, then save once. A failed validation leaves the stored
//! day untouched.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::TrackingConfig;
use crate::domain::{DayLog, Session, Task, merge_by_description};
use crate::error::{Result, TrackError};
use crate::format::{format_clock, on_day, weekday_label};
use crate::select::{Chooser, Selector, resolve, settle};
use crate::storage::SessionStore;

#[derive(Debug, Clone)]
pub struct StartRequest {
    pub selector: Selector,
    pub at: Option<NaiveTime>,
    /// Oldest day searched for matching tasks; defaults to the configured window.
    pub search_from: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// No task matched; a new one was created.
    New,
    /// Matched a task already in today's log.
    Today,
    /// Matched a task from an earlier day, now registered in today's log.
    Continued,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    pub description: String,
    pub origin: Origin,
    /// The previous session was reopened instead of starting a new one.
    pub reopened: bool,
    pub start: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stopped {
    pub description: String,
    pub end: NaiveDateTime,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pushed {
    pub stopped: Option<Stopped>,
    pub started: Started,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popped {
    Deleted { description: String },
    Resumed { stopped: Option<Stopped>, resumed: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOff {
    pub interrupted: String,
    pub description: String,
    pub at: NaiveDateTime,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub description: String,
    pub created: bool,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Current {
    pub description: String,
    pub start: NaiveDateTime,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChoice {
    pub description: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl SessionChoice {
    pub fn label(&self) -> String {
        let end = self
            .end
            .map(format_clock)
            .unwrap_or_else(|| "running".to_string());
        format!("{} {} - {}", self.description, format_clock(self.start), end)
    }
}

pub struct Tracker<'a, S: SessionStore> {
    store: &'a S,
    settings: TrackingConfig,
}

impl<'a, S: SessionStore> Tracker<'a, S> {
    pub fn new(store: &'a S, settings: TrackingConfig) -> Self {
        Self { store, settings }
    }

    pub fn start(
        &self,
        request: &StartRequest,
        now: NaiveDateTime,
        chooser: &mut dyn Chooser,
    ) -> Result<Started> {
        let today = now.date();
        let search_from = request
            .search_from
            .unwrap_or(today - Duration::days(self.settings.search_back_days));
        let mut log = self.store.load(today)?;
        let history = self.history(search_from, today)?;
        let at = request.at.map(|time| on_day(today, time));

        let started = start_in(
            &mut log,
            history,
            &request.selector,
            at,
            now,
            self.continuity(),
            chooser,
        )?;
        self.store.save(&log)?;
        tracing::info!(
            description = %started.description,
            origin = ?started.origin,
            reopened = started.reopened,
            "started session"
        );
        Ok(started)
    }

    /// `Ok(None)` when nothing is running.
    pub fn stop(&self, at: Option<NaiveTime>, now: NaiveDateTime) -> Result<Option<Stopped>> {
        let today = now.date();
        let mut log = self.store.load(today)?;
        let stopped = stop_in(&mut log, at.map(|time| on_day(today, time)), now)?;
        if let Some(stopped) = &stopped {
            self.store.save(&log)?;
            tracing::info!(description = %stopped.description, minutes = stopped.minutes, "stopped session");
        }
        Ok(stopped)
    }

    /// Stops whatever runs and starts `selector`, searching back the push window.
    pub fn push(
        &self,
        selector: &Selector,
        at: Option<NaiveTime>,
        now: NaiveDateTime,
        chooser: &mut dyn Chooser,
    ) -> Result<Pushed> {
        let today = now.date();
        let mut log = self.store.load(today)?;
        let history = self.history(
            today - Duration::days(self.settings.push_search_back_days),
            today,
        )?;
        let at = at.map(|time| on_day(today, time));

        let stopped = stop_in(&mut log, at, now)?;
        let started = start_in(&mut log, history, selector, at, now, self.continuity(), chooser)?;
        self.store.save(&log)?;
        tracing::info!(description = %started.description, "pushed session");
        Ok(Pushed { stopped, started })
    }

    /// With `delete`, discards the running session. Otherwise stops it and
    /// resumes the task that ended most recently before it.
    pub fn pop(&self, delete: bool, now: NaiveDateTime) -> Result<Popped> {
        let mut log = self.store.load(now.date())?;
        let active = log.active();

        if delete {
            let active = active.ok_or(TrackError::NoActiveSession)?;
            let (description, _) = log.remove_session(active);
            self.store.save(&log)?;
            tracing::info!(%description, "deleted running session");
            return Ok(Popped::Deleted { description });
        }

        let resume = log
            .latest_closed(active.map(|at| at.task))
            .ok_or(TrackError::NothingToResume)?;

        let stopped = active.map(|at| {
            let session = log.session_mut(at);
            session.end_time = Some(now.max(session.start_time));
            let minutes = session.minutes(now);
            Stopped {
                description: log.tasks[at.task].description.clone(),
                end: now,
                minutes,
            }
        });

        let task = &mut log.tasks[resume.task];
        task.insert_session(Session::open(now));
        let resumed = task.description.clone();
        self.store.save(&log)?;
        tracing::info!(%resumed, "resumed previous task");
        Ok(Popped::Resumed { stopped, resumed })
    }

    /// Ends the running session at `interrupted_at` and books the time since
    /// then to a new task named `description`.
    pub fn split(
        &self,
        description: &str,
        interrupted_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<SplitOff> {
        let description = required_description(description)?;
        let mut log = self.store.load(now.date())?;
        let active = log.active().ok_or(TrackError::NoActiveSession)?;
        let interrupted = log.tasks[active.task].description.clone();

        if interrupted == description {
            return Err(TrackError::invalid(format!(
                "`{description}` is the running task; split needs a different description"
            )));
        }

        let session = log.session_mut(active);
        if interrupted_at <= session.start_time || interrupted_at >= now {
            return Err(TrackError::invalid(format!(
                "interruption must fall between {} and {}",
                format_clock(session.start_time),
                format_clock(now)
            )));
        }
        session.end_time = Some(interrupted_at);

        log.tasks
            .push(Task::new(description.clone(), Session::closed(interrupted_at, now)));
        self.store.save(&log)?;
        tracing::info!(%interrupted, %description, "split running session");
        Ok(SplitOff {
            interrupted,
            description,
            at: interrupted_at,
            minutes: (now - interrupted_at).num_minutes(),
        })
    }

    /// Records a session after the fact. Without `end` the session is left running.
    pub fn retro(
        &self,
        description: &str,
        start: NaiveTime,
        end: Option<NaiveTime>,
        now: NaiveDateTime,
        chooser: &mut dyn Chooser,
    ) -> Result<Recorded> {
        let description = required_description(description)?;
        let today = now.date();
        let start = on_day(today, start);
        let end = end.map(|time| on_day(today, time));
        let mut log = self.store.load(today)?;

        match end {
            Some(end) if start >= end => {
                return Err(TrackError::invalid("start time must be earlier than end time"));
            }
            Some(end) if end > now => {
                return Err(TrackError::invalid("end time cannot be in the future"));
            }
            None if start > now => {
                return Err(TrackError::invalid("start time cannot be in the future"));
            }
            None => {
                if let Some(active) = log.active() {
                    return Err(TrackError::AlreadyRunning(
                        log.tasks[active.task].description.clone(),
                    ));
                }
            }
            Some(_) => {}
        }

        let resolution = resolve(
            &Selector::Text(description.clone()),
            &log.tasks,
            |task| task.description.as_str(),
        );
        let target = settle(resolution, chooser, |task| task.description.clone())?
            .map(|task| task.description.clone());
        let target_description = target.clone().unwrap_or_else(|| description.clone());

        if let Some((task, session)) =
            log.find_overlap(&target_description, start, end.unwrap_or(now), now)
        {
            return Err(TrackError::Overlap {
                description: task.description.clone(),
                start: session.start_time,
                end: session.effective_end(now),
            });
        }

        let session = Session {
            start_time: start,
            end_time: end,
            note: None,
        };
        let created = match target.and_then(|existing| log.task_by_description(&existing)) {
            Some(index) => {
                log.tasks[index].insert_session(session);
                false
            }
            None => {
                log.tasks.push(Task::new(description.clone(), session));
                true
            }
        };
        self.store.save(&log)?;
        tracing::info!(description = %target_description, created, "recorded retro session");
        Ok(Recorded {
            description: target_description,
            created,
            start,
            end,
        })
    }

    /// Appends a note to the running session; returns its task description.
    pub fn note(&self, content: &str, now: NaiveDateTime) -> Result<String> {
        let mut log = self.store.load(now.date())?;
        let active = log.active().ok_or(TrackError::NoActiveSession)?;
        log.session_mut(active).append_note(content, now);
        self.store.save(&log)?;
        Ok(log.tasks[active.task].description.clone())
    }

    /// Today's sessions in the order `note_session` indexes them.
    pub fn session_choices(&self, now: NaiveDateTime) -> Result<Vec<SessionChoice>> {
        let log = self.store.load(now.date())?;
        Ok(log
            .session_refs()
            .into_iter()
            .map(|at| {
                let session = log.session(at);
                SessionChoice {
                    description: log.tasks[at.task].description.clone(),
                    start: session.start_time,
                    end: session.end_time,
                }
            })
            .collect())
    }

    /// Appends a note to the session at 0-based `index` of [`Self::session_choices`].
    pub fn note_session(&self, index: usize, content: &str, now: NaiveDateTime) -> Result<String> {
        let mut log = self.store.load(now.date())?;
        let refs = log.session_refs();
        let at = *refs
            .get(index)
            .ok_or_else(|| TrackError::InvalidChoice((index + 1).to_string()))?;
        log.session_mut(at).append_note(content, now);
        self.store.save(&log)?;
        Ok(log.tasks[at.task].description.clone())
    }

    pub fn current(&self, now: NaiveDateTime) -> Result<Option<Current>> {
        let log = self.store.load(now.date())?;
        Ok(log.active().map(|at| {
            let session = log.session(at);
            Current {
                description: log.tasks[at.task].description.clone(),
                start: session.start_time,
                minutes: session.minutes(now),
            }
        }))
    }

    /// The list numeric selectors index into, most recent first.
    pub fn candidates(&self, search_from: NaiveDate, now: NaiveDateTime) -> Result<Vec<Task>> {
        let today = now.date();
        let log = self.store.load(today)?;
        let history = self.history(search_from, today)?;
        Ok(candidates(history, &log.tasks))
    }

    /// A task recorded on `day`; indexes count from the most recently active task.
    pub fn task_on(
        &self,
        day: NaiveDate,
        selector: &Selector,
        chooser: &mut dyn Chooser,
    ) -> Result<Task> {
        let log = self.store.load(day)?;
        let tasks = candidates(Vec::new(), &log.tasks);
        let resolution = resolve(selector, &tasks, |task| task.description.as_str());
        match settle(resolution, chooser, candidate_label)? {
            Some(task) => Ok(task.clone()),
            None => Err(TrackError::TaskNotFound(match selector {
                Selector::Text(text) => text.clone(),
                Selector::Index(index) => index.to_string(),
            })),
        }
    }

    fn continuity(&self) -> Duration {
        Duration::seconds(self.settings.continuity_seconds)
    }

    /// Tasks from `from` up to, not including, `today`.
    fn history(&self, from: NaiveDate, today: NaiveDate) -> Result<Vec<Task>> {
        if from > today {
            return Err(TrackError::invalid("search start cannot be after today"));
        }
        let Some(yesterday) = today.pred_opt() else {
            return Ok(Vec::new());
        };
        if from > yesterday {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .load_range(from, yesterday)?
            .into_iter()
            .flat_map(|log| log.tasks)
            .collect())
    }
}

/// Same-description tasks merged, most recently active first.
pub fn candidates(history: Vec<Task>, today: &[Task]) -> Vec<Task> {
    let mut merged = merge_by_description(history.into_iter().chain(today.iter().cloned()));
    merged.sort_by(|left, right| {
        right
            .recency()
            .cmp(&left.recency())
            .then_with(|| left.description.cmp(&right.description))
    });
    merged
}

pub fn candidate_label(task: &Task) -> String {
    match task.recency() {
        Some(last) => format!(
            "({} {}) {}",
            weekday_label(last.date()),
            last.format("%Y-%m-%d %H:%M"),
            task.description
        ),
        None => task.description.clone(),
    }
}

fn start_in(
    log: &mut DayLog,
    history: Vec<Task>,
    selector: &Selector,
    at: Option<NaiveDateTime>,
    now: NaiveDateTime,
    continuity: Duration,
    chooser: &mut dyn Chooser,
) -> Result<Started> {
    if let Some(active) = log.active() {
        return Err(TrackError::AlreadyRunning(
            log.tasks[active.task].description.clone(),
        ));
    }

    let start = at.unwrap_or(now);
    if start > now {
        return Err(TrackError::invalid("start time cannot be in the future"));
    }

    let candidates = candidates(history, &log.tasks);
    let resolution = resolve(selector, &candidates, |task| task.description.as_str());
    let picked = settle(resolution, chooser, candidate_label)?;

    let (index, origin) = match picked {
        Some(found) => match log.task_by_description(&found.description) {
            Some(index) => (index, Origin::Today),
            None => {
                log.tasks.push(Task::continuation(
                    found.id.clone(),
                    found.description.clone(),
                ));
                (log.tasks.len() - 1, Origin::Continued)
            }
        },
        None => {
            let description = match selector {
                Selector::Text(text) => required_description(text)?,
                Selector::Index(index) => return Err(TrackError::TaskNotFound(index.to_string())),
            };
            log.tasks
                .push(Task::new(description.clone(), Session::open(start)));
            return Ok(Started {
                description,
                origin: Origin::New,
                reopened: false,
                start,
            });
        }
    };

    let task = &mut log.tasks[index];
    let reopened = match task.last_session_mut() {
        Some(last) => match last.end_time {
            Some(end) if start >= last.start_time && start - end <= continuity => {
                last.end_time = None;
                true
            }
            _ => false,
        },
        None => false,
    };
    if !reopened {
        task.insert_session(Session::open(start));
    }

    Ok(Started {
        description: task.description.clone(),
        origin,
        reopened,
        start,
    })
}

fn stop_in(
    log: &mut DayLog,
    at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Result<Option<Stopped>> {
    let Some(active) = log.active() else {
        return Ok(None);
    };

    let session = log.session_mut(active);
    let end = match at {
        Some(end) if end > now => {
            return Err(TrackError::invalid("end time cannot be in the future"));
        }
        Some(end) if end <= session.start_time => {
            return Err(TrackError::invalid(format!(
                "end time must be after the session start ({})",
                format_clock(session.start_time)
            )));
        }
        Some(end) => end,
        None => now.max(session.start_time),
    };
    session.end_time = Some(end);
    let minutes = session.minutes(now);

    Ok(Some(Stopped {
        description: log.tasks[active.task].description.clone(),
        end,
        minutes,
    }))
}

fn required_description(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TrackError::invalid("task description cannot be empty"));
    }
    Ok(trimmed.to_string())
}
