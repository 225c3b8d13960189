//! Operator interaction: line input, option menus and outcome reports.
//!
//! Engines only see the [`Console`] trait. [`open_console`] picks the raw-key terminal
//! menu when stdin is a TTY and the numbered prompt-and-readline fallback otherwise.

mod terminal;

use std::io::{
    self,
    BufRead,
    IsTerminal,
    Write,
};

pub use terminal::TerminalConsole;

use crate::core::CardError;

pub trait Console {
    /// Reads one line without its terminator. `Ok(None)` means the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, CardError>;

    /// Presents `options` and returns the chosen index. Cancelling yields
    /// [`CardError::SelectionAbort`].
    fn select(&mut self, title: &str, options: &[String], default: usize)
        -> Result<usize, CardError>;

    fn report(&mut self, message: &str);

    fn confirm(&mut self, title: &str, default_yes: bool) -> Result<bool, CardError> {
        let options = ["Yes".to_string(), "No".to_string()];
        let default = if default_yes { 0 } else { 1 };
        Ok(self.select(title, &options, default)? == 0)
    }
}

pub fn open_console() -> Box<dyn Console> {
    if io::stdin().is_terminal() {
        Box::new(TerminalConsole::new())
    } else {
        Box::new(PipedConsole::new(io::stdin().lock(), io::stderr()))
    }
}

/// Reads one line without its terminator. A line that is not UTF-8 is consumed and
/// reported as a validation error so the caller can move on to the next one.
pub(crate) fn read_input_line(input: &mut impl BufRead) -> Result<Option<String>, CardError> {
    let mut raw = Vec::new();
    if input.read_until(b'\n', &mut raw)? == 0 {
        return Ok(None);
    }
    while matches!(raw.last(), Some(b'\n' | b'\r')) {
        raw.pop();
    }
    String::from_utf8(raw)
        .map(Some)
        .map_err(|_| CardError::Validation("input line is not valid UTF-8".into()))
}

fn is_quit(input: &str) -> bool {
    matches!(input.to_ascii_lowercase().as_str(), "q" | "quit")
}

/// Numbered-menu console over any line-oriented reader, used for piped input.
pub struct PipedConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PipedConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}

impl<R: BufRead, W: Write> Console for PipedConsole<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, CardError> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        read_input_line(&mut self.input)
    }

    fn select(
        &mut self,
        title: &str,
        options: &[String],
        default: usize,
    ) -> Result<usize, CardError> {
        if options.is_empty() {
            return Err(CardError::SelectionAbort);
        }
        let default = default.min(options.len() - 1);

        writeln!(self.output, "{}", title)?;
        for (idx, option) in options.iter().enumerate() {
            let marker = if idx == default { "*" } else { " " };
            writeln!(self.output, "{}{}. {}", marker, idx + 1, option)?;
        }

        loop {
            let raw = match self.read_line("Select option: ") {
                Ok(Some(raw)) => raw,
                Ok(None) => return Err(CardError::SelectionAbort),
                Err(CardError::Validation(_)) => {
                    self.report("Invalid choice.");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(default);
            }
            if is_quit(raw) {
                return Err(CardError::SelectionAbort);
            }
            match raw.parse::<usize>() {
                Ok(number) if (1..=options.len()).contains(&number) => return Ok(number - 1),
                _ => self.report("Invalid choice."),
            }
        }
    }

    fn report(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message);
    }
}
