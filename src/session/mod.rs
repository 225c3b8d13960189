//! Interactive card session: read a line, generate a card, decide what to do with it,
//! write it to the store, repeat.

mod parser;
pub mod update;
mod writer;


pub use parser::{
    parse_session_line,
    SessionLine,
};
pub use update::{
    UpdateEngine,
    UpdateOutcome,
    UpdateRequest,
};
pub use writer::{
    should_write_audio,
    CardWriter,
    Services,
};

use crate::{
    anki::NoteLocator,
    config::{
        Config,
        Policy,
    },
    console::Console,
    core::{
        utils::clean_context,
        Card,
        CardError,
    },
    llm::GenerationRequest,
    render::format_card,
};

pub const PROMPT: &str = "anki-vocab> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Update,
    Skip,
    Regenerate,
    Quit,
}

impl Action {
    pub const ALL: [Action; 5] =
        [Action::Add, Action::Update, Action::Skip, Action::Regenerate, Action::Quit];

    pub fn label(&self) -> &'static str {
        match self {
            Action::Add => "Add new note",
            Action::Update => "Update existing note",
            Action::Skip => "Skip",
            Action::Regenerate => "Regenerate",
            Action::Quit => "Quit session",
        }
    }
}

/// Preselected action for a freshly generated card.
pub fn default_action(has_existing: bool, update_policy: Policy) -> Action {
    match (has_existing, update_policy) {
        (false, _) => Action::Add,
        (true, Policy::Always) => Action::Update,
        (true, _) => Action::Skip,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Take the default action and the first candidate without asking.
    pub auto_accept: bool,
    /// Generate and preview only; the store is never written.
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub carried_context: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub added: Vec<u64>,
    pub updated: Vec<u64>,
    pub skipped: usize,
    pub failed: usize,
}

enum Turn {
    Added(u64),
    Updated(u64),
    Skipped,
    Previewed,
    Quit,
}

pub struct Session<'a> {
    config: &'a Config,
    services: Services<'a>,
    options: SessionOptions,
    state: SessionState,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a Config, services: Services<'a>, options: SessionOptions) -> Self {
        Self { config, services, options, state: SessionState::default() }
    }

    /// Runs until `:quit`, the Quit action or end of input. Recoverable failures end
    /// only the current turn.
    pub fn run(&mut self, console: &mut dyn Console) -> Result<SessionSummary, CardError> {
        let mut summary = SessionSummary::default();
        console.report("Enter 'context | word', a bare word, ':context <text>' or ':quit'.");

        loop {
            let line = match console.read_line(PROMPT) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    console.report("Cancelled.");
                    break;
                }
                Err(e @ CardError::Validation(_)) => {
                    log::warn!("Unreadable input line: {}", e);
                    console.report(&e.to_string());
                    continue;
                }
                Err(e) => return Err(e),
            };

            let parsed = match parse_session_line(&line, self.state.carried_context.as_deref()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    console.report(&e.to_string());
                    continue;
                }
            };

            let (context, word) = match parsed {
                SessionLine::Quit => break,
                SessionLine::Idle { carried } => {
                    if carried != self.state.carried_context {
                        log::debug!("Carried context set to {:?}", carried);
                    }
                    self.state.carried_context = carried;
                    continue;
                }
                SessionLine::Entry { context, word, carried } => {
                    self.state.carried_context = carried;
                    (context, word)
                }
            };

            match self.turn(&context, &word, console) {
                Ok(Turn::Quit) => break,
                Ok(Turn::Added(note_id)) => summary.added.push(note_id),
                Ok(Turn::Updated(note_id)) => summary.updated.push(note_id),
                Ok(Turn::Skipped) => summary.skipped += 1,
                Ok(Turn::Previewed) => {}
                Err(CardError::SelectionAbort) => {
                    console.report("Skipped.");
                    summary.skipped += 1;
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("Turn for '{}' failed: {}", word, e);
                    console.report(&e.to_string());
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        log::info!(
            "Session finished: {} added, {} updated, {} skipped, {} failed",
            summary.added.len(),
            summary.updated.len(),
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    fn turn(&self, context: &str, word: &str, console: &mut dyn Console) -> Result<Turn, CardError> {
        let context = clean_context(context);
        let locator = NoteLocator::new(self.services.store, self.config);

        let skip_existing = !self.options.dry_run && self.config.update_policy == Policy::Never;
        if skip_existing && !locator.find(word)?.is_empty() {
            console.report(&format!(
                "Skipping: a note for '{}' already exists (update policy: never).",
                word
            ));
            return Ok(Turn::Skipped);
        }

        let card = self.services.generator.generate(&GenerationRequest::new(&context, word))?;
        console.report(&format_card(&card));
        if self.options.dry_run {
            return Ok(Turn::Previewed);
        }

        let existing = locator.find(&card.word_base)?;
        let default = default_action(!existing.is_empty(), self.config.update_policy);
        let action = match self.options.auto_accept {
            true => default,
            false => choose_action(console, default)?,
        };

        let writer = CardWriter::new(self.config, self.services);
        match action {
            Action::Quit => Ok(Turn::Quit),
            Action::Skip => {
                console.report("Skipped.");
                Ok(Turn::Skipped)
            }
            Action::Regenerate => {
                console.report("Discarded. Enter the line again to regenerate.");
                Ok(Turn::Skipped)
            }
            Action::Add => {
                let note_id = writer.add(&card)?;
                console.report(&format!("Added note id: {}", note_id));
                Ok(Turn::Added(note_id))
            }
            Action::Update => self.update(&writer, &locator, &existing, &card, console),
        }
    }

    fn update(
        &self,
        writer: &CardWriter<'_>,
        locator: &NoteLocator<'_>,
        existing: &[u64],
        card: &Card,
        console: &mut dyn Console,
    ) -> Result<Turn, CardError> {
        let Some(note_id) = locator.resolve(existing, !self.options.auto_accept, console)? else {
            console.report("No existing note found to update.");
            return Ok(Turn::Skipped);
        };
        writer.update(note_id, card, None, self.options.auto_accept, console)?;
        console.report(&format!("Updated note id: {}", note_id));
        Ok(Turn::Updated(note_id))
    }
}

fn choose_action(console: &mut dyn Console, default: Action) -> Result<Action, CardError> {
    let labels: Vec<String> = Action::ALL.iter().map(|action| action.label().to_string()).collect();
    let default_idx = Action::ALL.iter().position(|action| *action == default).unwrap_or(0);
    let selected = console.select("Choose an action", &labels, default_idx)?;
    Ok(Action::ALL.get(selected).copied().unwrap_or(default))
}
