//! Interactive prompts used by `scan` when a choice was not given as a flag.

use crate::cli::CliError;
use crate::picker::{self, PickerResult};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use secrecy::SecretString;
use std::io::{self, BufRead, IsTerminal, Write};

/// Source of interactive answers.
pub trait Prompter {
    /// Whether questions can be asked at all.
    fn is_interactive(&self) -> bool;

    /// Picks one option and returns its index.
    fn select(&mut self, prompt: &str, options: &[String]) -> Result<usize, CliError>;

    /// Picks one or more options and returns their indices, ascending.
    fn multi_select(&mut self, prompt: &str, options: &[String]) -> Result<Vec<usize>, CliError>;

    /// Reads a line of text; an empty answer yields `default` when given.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String, CliError>;

    /// Reads a value without echoing it.
    fn secret(&mut self, prompt: &str) -> Result<SecretString, CliError>;

    /// Asks a yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, CliError>;
}

/// Prompts on the controlling terminal.
///
/// Questions go to stderr, answers come from stdin. Multi-select uses the
/// full-screen picker and falls back to a numbered list when it cannot run.
#[derive(Debug)]
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    /// Creates a prompter that is interactive when stdin and stderr are terminals.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal() && io::stderr().is_terminal(),
        }
    }

    fn ensure_interactive(&self, prompt: &str) -> Result<(), CliError> {
        if self.interactive {
            Ok(())
        } else {
            Err(CliError::config_with_help(
                format!("Cannot ask \"{prompt}\" without a terminal"),
                "Pass the value as a command line flag; see `bug-crawler scan --help`",
            ))
        }
    }

    fn read_line(prompt: &str) -> Result<String, CliError> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{prompt}").map_err(io_error)?;
        stderr.flush().map_err(io_error)?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line).map_err(io_error)?;
        if read == 0 {
            return Err(CliError::config("Input closed before an answer was given"));
        }
        Ok(line.trim().to_string())
    }

    fn print_options(options: &[String]) -> Result<(), CliError> {
        let mut stderr = io::stderr().lock();
        for (i, option) in options.iter().enumerate() {
            writeln!(stderr, "  {}. {option}", i + 1).map_err(io_error)?;
        }
        Ok(())
    }

    fn numbered_multi_select(prompt: &str, options: &[String]) -> Result<Vec<usize>, CliError> {
        writeln!(io::stderr(), "{prompt}").map_err(io_error)?;
        Self::print_options(options)?;
        loop {
            let answer = Self::read_line("Enter numbers (e.g. 1,3,5 or 2-4) or 'all': ")?;
            match picker::parse_selection(&answer, options.len()) {
                Ok(chosen) => return Ok(chosen),
                Err(message) => writeln!(io::stderr(), "{message}").map_err(io_error)?,
            }
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn select(&mut self, prompt: &str, options: &[String]) -> Result<usize, CliError> {
        self.ensure_interactive(prompt)?;
        if options.is_empty() {
            return Err(CliError::config(format!("Nothing to choose for \"{prompt}\"")));
        }
        writeln!(io::stderr(), "{prompt}").map_err(io_error)?;
        Self::print_options(options)?;
        loop {
            let answer = Self::read_line(&format!("Choose 1-{}: ", options.len()))?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                _ => writeln!(io::stderr(), "Invalid choice: {answer}").map_err(io_error)?,
            }
        }
    }

    fn multi_select(&mut self, prompt: &str, options: &[String]) -> Result<Vec<usize>, CliError> {
        self.ensure_interactive(prompt)?;
        if options.is_empty() {
            return Err(CliError::config(format!("Nothing to choose for \"{prompt}\"")));
        }
        match picker::run_multi_picker(prompt, options.to_vec()) {
            Ok(PickerResult::Selected(chosen)) => Ok(chosen),
            Ok(PickerResult::Cancelled) => Err(CliError::config("Selection cancelled")),
            Err(e) => {
                tracing::debug!(error = %e, "Picker unavailable, using numbered list");
                Self::numbered_multi_select(prompt, options)
            }
        }
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String, CliError> {
        self.ensure_interactive(prompt)?;
        let label = match default {
            Some(d) => format!("{prompt} [{d}]: "),
            None => format!("{prompt}: "),
        };
        loop {
            let answer = Self::read_line(&label)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            if let Some(d) = default {
                return Ok(d.to_string());
            }
        }
    }

    fn secret(&mut self, prompt: &str) -> Result<SecretString, CliError> {
        self.ensure_interactive(prompt)?;
        let mut stderr = io::stderr();
        write!(stderr, "{prompt}: ").map_err(io_error)?;
        stderr.flush().map_err(io_error)?;

        enable_raw_mode().map_err(io_error)?;
        let value = read_masked(&mut stderr);
        disable_raw_mode().map_err(io_error)?;
        writeln!(stderr).map_err(io_error)?;

        let value = value.map_err(io_error)?;
        match value {
            Some(v) if !v.trim().is_empty() => Ok(SecretString::from(v.trim().to_string())),
            Some(_) => Err(CliError::config(format!("{prompt} cannot be empty"))),
            None => Err(CliError::config("Input cancelled")),
        }
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, CliError> {
        self.ensure_interactive(prompt)?;
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = Self::read_line(&format!("{prompt} [{hint}]: "))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(io::stderr(), "Please answer y or n").map_err(io_error)?,
            }
        }
    }
}

/// Reads keys until Enter, echoing `*`. Returns `None` on Esc or Ctrl+C.
fn read_masked(out: &mut impl Write) -> io::Result<Option<String>> {
    let mut value = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(Some(value)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None);
            }
            KeyCode::Backspace => {
                if value.pop().is_some() {
                    write!(out, "\u{8} \u{8}")?;
                }
            }
            KeyCode::Char(c) => {
                value.push(c);
                write!(out, "*")?;
            }
            _ => {}
        }
        out.flush()?;
    }
}

fn io_error(e: io::Error) -> CliError {
    CliError::runtime(format!("Terminal I/O failed: {e}"))
}
