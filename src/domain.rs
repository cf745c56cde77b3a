use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Session {
    pub fn open(start_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            end_time: None,
            note: None,
        }
    }

    pub fn closed(start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            end_time: Some(end_time),
            note: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }

    /// End of the session, with `now` standing in while it is still running.
    pub fn effective_end(&self, now: NaiveDateTime) -> NaiveDateTime {
        self.end_time.unwrap_or(now).max(self.start_time)
    }

    pub fn duration(&self, now: NaiveDateTime) -> Duration {
        self.effective_end(now) - self.start_time
    }

    pub fn minutes(&self, now: NaiveDateTime) -> i64 {
        self.duration(now).num_minutes()
    }

    /// Appends a `[HH:MM] content` entry, separated from earlier entries by a blank line.
    pub fn append_note(&mut self, content: &str, at: NaiveDateTime) {
        let entry = format!("[{}] {}", at.format("%H:%M"), content);
        self.note = Some(match self.note.take() {
            Some(existing) => format!("{existing}\n\n{entry}"),
            None => entry,
        });
    }

    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime, now: NaiveDateTime) -> bool {
        self.start_time < end && start < self.effective_end(now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub sessions: Vec<Session>,
}

impl Task {
    pub fn new(description: impl Into<String>, first: Session) -> Self {
        Self {
            id: generate_id(),
            description: description.into(),
            sessions: vec![first],
        }
    }

    /// A task carried over from an earlier day; the caller adds its first session.
    pub fn continuation(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            sessions: Vec::new(),
        }
    }

    pub fn active_session(&self) -> Option<usize> {
        self.sessions.iter().position(Session::is_running)
    }

    pub fn last_session_mut(&mut self) -> Option<&mut Session> {
        self.sessions.last_mut()
    }

    pub fn first_start(&self) -> Option<NaiveDateTime> {
        self.sessions.iter().map(|session| session.start_time).min()
    }

    pub fn last_end(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.sessions
            .iter()
            .map(|session| session.effective_end(now))
            .max()
    }

    /// Latest known activity; a session left open on an earlier day counts from its start.
    pub fn recency(&self) -> Option<NaiveDateTime> {
        self.sessions
            .iter()
            .map(|session| session.end_time.unwrap_or(session.start_time))
            .max()
    }

    pub fn is_running(&self) -> bool {
        self.active_session().is_some()
    }

    pub fn total(&self, now: NaiveDateTime) -> Duration {
        self.sessions
            .iter()
            .fold(Duration::zero(), |acc, session| acc + session.duration(now))
    }

    /// Inserts keeping the list ordered by start time.
    pub fn insert_session(&mut self, session: Session) -> usize {
        let index = self
            .sessions
            .partition_point(|existing| existing.start_time <= session.start_time);
        self.sessions.insert(index, session);
        index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRef {
    pub task: usize,
    pub session: usize,
}

/// All tasks recorded under one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayLog {
    pub day: NaiveDate,
    pub tasks: Vec<Task>,
}

impl DayLog {
    pub fn new(day: NaiveDate, tasks: Vec<Task>) -> Self {
        Self { day, tasks }
    }

    pub fn active(&self) -> Option<SessionRef> {
        self.tasks.iter().enumerate().find_map(|(task, entry)| {
            entry
                .active_session()
                .map(|session| SessionRef { task, session })
        })
    }

    pub fn session(&self, at: SessionRef) -> &Session {
        &self.tasks[at.task].sessions[at.session]
    }

    pub fn session_mut(&mut self, at: SessionRef) -> &mut Session {
        &mut self.tasks[at.task].sessions[at.session]
    }

    pub fn task_by_description(&self, description: &str) -> Option<usize> {
        self.tasks
            .iter()
            .position(|task| task.description == description)
    }

    /// Removes a session, dropping its task as well when nothing is left in it.
    pub fn remove_session(&mut self, at: SessionRef) -> (String, Session) {
        let task = &mut self.tasks[at.task];
        let session = task.sessions.remove(at.session);
        let description = task.description.clone();
        if task.sessions.is_empty() {
            self.tasks.remove(at.task);
        }
        (description, session)
    }

    /// Most recently ended closed session, ignoring every session of `excluded_task`.
    pub fn latest_closed(&self, excluded_task: Option<usize>) -> Option<SessionRef> {
        let mut latest: Option<(NaiveDateTime, SessionRef)> = None;
        for (task_index, task) in self.tasks.iter().enumerate() {
            if Some(task_index) == excluded_task {
                continue;
            }
            for (session_index, session) in task.sessions.iter().enumerate() {
                let Some(end) = session.end_time else {
                    continue;
                };
                if latest.is_none_or(|(best, _)| end > best) {
                    latest = Some((
                        end,
                        SessionRef {
                            task: task_index,
                            session: session_index,
                        },
                    ));
                }
            }
        }
        latest.map(|(_, at)| at)
    }

    /// First session of another description overlapping `[start, end)`.
    pub fn find_overlap(
        &self,
        description: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Option<(&Task, &Session)> {
        self.tasks
            .iter()
            .filter(|task| task.description != description)
            .find_map(|task| {
                task.sessions
                    .iter()
                    .find(|session| session.overlaps(start, end, now))
                    .map(|session| (task, session))
            })
    }

    /// Every session in storage order, as enumerated by note selection.
    pub fn session_refs(&self) -> Vec<SessionRef> {
        self.tasks
            .iter()
            .enumerate()
            .flat_map(|(task, entry)| {
                (0..entry.sessions.len()).map(move |session| SessionRef { task, session })
            })
            .collect()
    }
}

/// Folds tasks sharing a description into one, keeping the first id seen.
pub fn merge_by_description(tasks: impl IntoIterator<Item = Task>) -> Vec<Task> {
    let mut merged: Vec<Task> = Vec::new();
    for task in tasks {
        match merged
            .iter_mut()
            .find(|existing| existing.description == task.description)
        {
            Some(existing) => existing.sessions.extend(task.sessions),
            None => merged.push(task),
        }
    }
    for task in &mut merged {
        task.sessions.sort_by_key(|session| session.start_time);
    }
    merged
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}
