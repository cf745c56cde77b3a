use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::domain::{DayLog, Task};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse day file {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode tasks for {day}: {source}")]
    Encode {
        day: NaiveDate,
        source: serde_json::Error,
    },
}

/// Task collections keyed by calendar date.
pub trait SessionStore {
    /// Tasks recorded for `day`; empty when nothing was ever written.
    fn read(&self, day: NaiveDate) -> Result<Vec<Task>, StorageError>;

    /// Replaces everything recorded for `day`.
    fn write(&self, day: NaiveDate, tasks: &[Task]) -> Result<(), StorageError>;

    fn load(&self, day: NaiveDate) -> Result<DayLog, StorageError> {
        Ok(DayLog::new(day, self.read(day)?))
    }

    fn save(&self, log: &DayLog) -> Result<(), StorageError> {
        self.write(log.day, &log.tasks)
    }

    /// Every day from `from` through `to`, oldest first.
    fn load_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DayLog>, StorageError> {
        let mut logs = Vec::new();
        let mut day = from;
        while day <= to {
            logs.push(self.load(day)?);
            day += Duration::days(1);
        }
        Ok(logs)
    }
}

/// One pretty-printed JSON array per day: `<dir>/YYYY-MM-DD.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn day_path(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", day.format("%Y-%m-%d")))
    }
}

impl SessionStore for FileStore {
    fn read(&self, day: NaiveDate) -> Result<Vec<Task>, StorageError> {
        let path = self.day_path(day);
        let raw = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tasks: Vec<Task> =
            serde_json::from_str(&raw).map_err(|source| StorageError::Decode {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(%day, tasks = tasks.len(), path = %path.display(), "read day file");
        Ok(tasks)
    }

    fn write(&self, day: NaiveDate, tasks: &[Task]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let encoded =
            serde_json::to_string_pretty(tasks).map_err(|source| StorageError::Encode { day, source })?;
        let path = self.day_path(day);
        fs::write(&path, encoded).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(%day, tasks = tasks.len(), path = %path.display(), "wrote day file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;

    use crate::domain::{Session, Task};

    use super::{FileStore, SessionStore, StorageError};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    #[test]
    fn missing_day_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path().join("nested"));
        assert!(store.read(day(27)).expect("read should succeed").is_empty());
    }

    #[test]
    fn write_replaces_the_whole_day() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path());
        let start = day(27).and_hms_opt(9, 0, 0).unwrap();
        let first = Task::new("first", Session::open(start));
        let second = Task::new("second", Session::open(start));

        store.write(day(27), &[first]).expect("write should succeed");
        store
            .write(day(27), std::slice::from_ref(&second))
            .expect("write should succeed");

        let loaded = store.read(day(27)).expect("read should succeed");
        assert_eq!(loaded, vec![second]);
        assert!(store.day_path(day(27)).ends_with("2025-04-27.json"));
    }

    #[test]
    fn load_range_covers_every_day_inclusive() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path());
        let logs = store.load_range(day(25), day(27)).expect("range should load");
        let days: Vec<_> = logs.iter().map(|log| log.day).collect();
        assert_eq!(days, vec![day(25), day(26), day(27)]);
    }

    #[test]
    fn corrupt_file_reports_its_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path());
        fs::write(store.day_path(day(27)), "{not json").expect("fixture write");
        match store.read(day(27)) {
            Err(StorageError::Decode { path, .. }) => assert_eq!(path, store.day_path(day(27))),
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
