//! Task selection by index or description substring.
//!
//! Resolution itself is pure; when a selector is ambiguous the caller hands
//! the matches to a [`Chooser`], which is where any interaction happens.

use crate::error::{Result, TrackError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// 1-based position in a recency-sorted list.
    Index(usize),
    Text(String),
}

impl Selector {
    /// Surrounding whitespace is ignored; an empty selector is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TrackError::invalid("task selector cannot be empty"));
        }
        if trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            if let Ok(index) = trimmed.parse() {
                return Ok(Selector::Index(index));
            }
        }
        Ok(Selector::Text(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Found(T),
    Ambiguous(Vec<T>),
    NotFound,
    OutOfRange { index: usize, len: usize },
}

/// Resolves against `candidates`, whose order defines both index positions and
/// the order of ambiguous matches.
pub fn resolve<'a, T>(
    selector: &Selector,
    candidates: &'a [T],
    describe: impl Fn(&T) -> &str,
) -> Resolution<&'a T> {
    match selector {
        Selector::Index(index) => match index.checked_sub(1).and_then(|i| candidates.get(i)) {
            Some(candidate) => Resolution::Found(candidate),
            None => Resolution::OutOfRange {
                index: *index,
                len: candidates.len(),
            },
        },
        Selector::Text(text) => {
            let mut matched: Vec<&T> = candidates
                .iter()
                .filter(|candidate| describe(candidate).contains(text.as_str()))
                .collect();
            match matched.len() {
                0 => Resolution::NotFound,
                1 => Resolution::Found(matched.remove(0)),
                _ => Resolution::Ambiguous(matched),
            }
        }
    }
}

/// Picks one of several options; returns a 0-based index.
pub trait Chooser {
    fn choose(&mut self, title: &str, options: &[String]) -> Result<usize>;
}

/// Settles a resolution into `Some(match)`, `None` for a text selector with no
/// match, or an error for an out-of-range index.
pub fn settle<'a, T>(
    resolution: Resolution<&'a T>,
    chooser: &mut dyn Chooser,
    label: impl Fn(&T) -> String,
) -> Result<Option<&'a T>> {
    match resolution {
        Resolution::Found(candidate) => Ok(Some(candidate)),
        Resolution::NotFound => Ok(None),
        Resolution::OutOfRange { index, len } => Err(TrackError::IndexOutOfRange { index, len }),
        Resolution::Ambiguous(matches) => {
            let options: Vec<String> = matches.iter().map(|&candidate| label(candidate)).collect();
            let picked = chooser.choose("Several tasks match, pick one:", &options)?;
            matches
                .get(picked)
                .copied()
                .map(Some)
                .ok_or_else(|| TrackError::InvalidChoice(format!("{}", picked + 1)))
        }
    }
}
