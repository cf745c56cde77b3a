//! Line-based prompts on the terminal.

use std::io::{self, BufRead, Write};

use chrono::NaiveTime;

use crate::error::{Result, TrackError};
use crate::format::parse_clock;
use crate::select::Chooser;

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Asks once and returns the trimmed answer.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question} ").map_err(TrackError::Prompt)?;
        self.output.flush().map_err(TrackError::Prompt)?;

        let mut answer = String::new();
        let read = self
            .input
            .read_line(&mut answer)
            .map_err(TrackError::Prompt)?;
        if read == 0 {
            return Err(TrackError::invalid("no answer given"));
        }
        Ok(answer.trim().to_string())
    }

    pub fn ask_clock(&mut self, question: &str) -> Result<NaiveTime> {
        let answer = self.ask(question)?;
        parse_clock(&answer)
    }

    /// Like [`Self::ask_clock`], but an empty answer means no time.
    pub fn ask_optional_clock(&mut self, question: &str) -> Result<Option<NaiveTime>> {
        let answer = self.ask(question)?;
        if answer.is_empty() {
            return Ok(None);
        }
        parse_clock(&answer).map(Some)
    }
}

impl<R: BufRead, W: Write> Chooser for Prompt<R, W> {
    fn choose(&mut self, title: &str, options: &[String]) -> Result<usize> {
        writeln!(self.output, "{title}").map_err(TrackError::Prompt)?;
        for (index, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}. {}", index + 1, option).map_err(TrackError::Prompt)?;
        }

        let answer = self.ask("Enter number:")?;
        match answer.parse::<usize>() {
            Ok(picked) if (1..=options.len()).contains(&picked) => Ok(picked - 1),
            _ => Err(TrackError::InvalidChoice(answer)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::NaiveTime;

    use crate::error::TrackError;
    use crate::select::Chooser;

    use super::Prompt;

    fn prompt(input: &str) -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
        Prompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn chooser_lists_options_and_reads_a_number() {
        let mut prompt = prompt("2\n");
        let options = vec!["code review".to_string(), "review notes".to_string()];
        let picked = prompt.choose("Several tasks match, pick one:", &options).unwrap();
        assert_eq!(picked, 1);

        let shown = String::from_utf8(prompt.output).unwrap();
        assert!(shown.contains("  1. code review\n  2. review notes\n"));
    }

    #[test]
    fn chooser_rejects_out_of_range_and_garbage() {
        let options = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            prompt("3\n").choose("pick", &options),
            Err(TrackError::InvalidChoice(answer)) if answer == "3"
        ));
        assert!(matches!(
            prompt("x\n").choose("pick", &options),
            Err(TrackError::InvalidChoice(_))
        ));
        assert!(matches!(
            prompt("0\n").choose("pick", &options),
            Err(TrackError::InvalidChoice(_))
        ));
    }

    #[test]
    fn clock_questions_parse_answers() {
        let mut prompt = prompt("09:30\n\nnope\n");
        assert_eq!(
            prompt.ask_clock("Start (HH:MM):").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert_eq!(prompt.ask_optional_clock("End (HH:MM, empty to leave running):").unwrap(), None);
        assert!(prompt.ask_clock("again:").is_err());
        assert!(prompt.ask("eof:").is_err());
    }
}
