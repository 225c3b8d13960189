use std::io::{
    self,
    Stderr,
    Write,
};

use crossterm::{
    cursor,
    event::{
        self,
        Event,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    queue,
    style::{
        Attribute,
        Print,
        SetAttribute,
    },
    terminal::{
        self,
        ClearType,
    },
};

use super::{
    read_input_line,
    Console,
};
use crate::core::CardError;

const HINT: &str = "Use ↑/↓ (or j/k) and Enter, q to cancel.";

enum MenuKey {
    Up,
    Down,
    Enter,
    Quit,
    Jump(usize),
}

/// Clips `text` to `width` columns so every menu entry stays on one terminal row.
fn fit_width(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

/// Restores cooked mode on every exit path of a menu.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Interactive console: arrow-key menus drawn on stderr, line input from stdin.
pub struct TerminalConsole {
    err: Stderr,
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self { err: io::stderr() }
    }

    fn draw(&mut self, title: &str, options: &[String], selected: usize) -> io::Result<()> {
        // One row per line, otherwise `rewind` leaves wrapped leftovers behind.
        let width = terminal::size().map(|(cols, _)| usize::from(cols)).unwrap_or(80).max(1);

        queue!(self.err, cursor::MoveToColumn(0), terminal::Clear(ClearType::FromCursorDown))?;
        queue!(
            self.err,
            SetAttribute(Attribute::Bold),
            Print(fit_width(title, width)),
            SetAttribute(Attribute::Reset),
            Print("\r\n"),
            SetAttribute(Attribute::Dim),
            Print(fit_width(HINT, width)),
            SetAttribute(Attribute::Reset),
            Print("\r\n")
        )?;
        for (idx, option) in options.iter().enumerate() {
            let arrow = if idx == selected { "> " } else { "  " };
            let line = format!("{}{}. {}", arrow, idx + 1, option);
            queue!(self.err, Print(fit_width(&line, width)), Print("\r\n"))?;
        }
        self.err.flush()
    }

    fn rewind(&mut self, options: &[String]) -> io::Result<()> {
        let lines = u16::try_from(options.len() + 2).unwrap_or(u16::MAX);
        queue!(self.err, cursor::MoveUp(lines))
    }

    fn read_key(&self) -> io::Result<Option<MenuKey>> {
        let Event::Key(KeyEvent { code, modifiers, kind, .. }) = event::read()? else {
            return Ok(None);
        };
        if kind != KeyEventKind::Press {
            return Ok(None);
        }
        let key = match code {
            KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K') => MenuKey::Up,
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J') => MenuKey::Down,
            KeyCode::Enter => MenuKey::Enter,
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => MenuKey::Quit,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => MenuKey::Quit,
            KeyCode::Char(digit @ '1'..='9') => MenuKey::Jump(digit as usize - '1' as usize),
            _ => return Ok(None),
        };
        Ok(Some(key))
    }

    fn run_menu(&mut self, title: &str, options: &[String], default: usize) -> io::Result<Option<usize>> {
        let _raw = RawModeGuard::enable()?;
        let mut selected = default.min(options.len() - 1);

        self.draw(title, options, selected)?;
        loop {
            let Some(key) = self.read_key()? else {
                continue;
            };
            match key {
                MenuKey::Enter => return Ok(Some(selected)),
                MenuKey::Quit => return Ok(None),
                MenuKey::Up => selected = (selected + options.len() - 1) % options.len(),
                MenuKey::Down => selected = (selected + 1) % options.len(),
                MenuKey::Jump(idx) if idx < options.len() => selected = idx,
                MenuKey::Jump(_) => continue,
            }
            self.rewind(options)?;
            self.draw(title, options, selected)?;
        }
    }
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, CardError> {
        write!(self.err, "{}", prompt)?;
        self.err.flush()?;

        read_input_line(&mut io::stdin().lock())
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
        match self.run_menu(title, options, default)? {
            Some(idx) => Ok(idx),
            None => Err(CardError::SelectionAbort),
        }
    }

    fn report(&mut self, message: &str) {
        let _ = writeln!(self.err, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_width_keeps_short_lines() {
        assert_eq!(fit_width("> 1. 101 | run | verb", 40), "> 1. 101 | run | verb");
        assert_eq!(fit_width("exact", 5), "exact");
    }

    #[test]
    fn test_fit_width_clips_to_one_row() {
        let summary = "> 1. 1502298033753 | run | verb | бежать, мчаться, управлять";
        let clipped = fit_width(summary, 20);
        assert_eq!(clipped.chars().count(), 20);
        assert!(clipped.starts_with("> 1. 1502298033753"));
        assert!(clipped.ends_with('…'));
        assert_eq!(fit_width("abc", 1), "…");
    }
}
