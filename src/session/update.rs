//! Regenerates one existing note in place, seeded with its current content.

use super::{
    CardWriter,
    Services,
    SessionOptions,
};
use crate::{
    anki::{
        note_to_card_payload,
        Note,
        NoteLocator,
    },
    config::Config,
    console::Console,
    core::{
        utils::clean_context,
        CardError,
        CardKey,
    },
    llm::GenerationRequest,
    render::format_card,
};

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub word: Option<String>,
    pub note_id: Option<u64>,
    /// Overrides the note's own context sentence.
    pub sentence: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(u64),
    Skipped,
    Previewed,
}

const CHOICES: [&str; 3] = ["Update note", "Regenerate", "Skip"];
const SKIP_CHOICE: usize = 2;

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub struct UpdateEngine<'a> {
    config: &'a Config,
    services: Services<'a>,
    options: SessionOptions,
}

impl<'a> UpdateEngine<'a> {
    pub fn new(config: &'a Config, services: Services<'a>, options: SessionOptions) -> Self {
        Self { config, services, options }
    }

    pub fn run(
        &self,
        request: &UpdateRequest,
        console: &mut dyn Console,
    ) -> Result<UpdateOutcome, CardError> {
        let note = self.resolve_note(request, console)?;
        let word = non_blank(note.field_value(self.config.word_field()))
            .ok_or_else(|| CardError::Validation("Selected note is missing the word field.".into()))?
            .to_string();

        let note_sentence = self
            .config
            .mapped_field(CardKey::ContextSentence)
            .and_then(|field| note.field_value(field));
        let sentence = non_blank(request.sentence.as_deref())
            .or(non_blank(note_sentence))
            .map(clean_context)
            .ok_or_else(|| {
                CardError::Validation(
                    "Provide --sentence because the note has no context sentence.".into(),
                )
            })?;

        let current = note_to_card_payload(&note, &self.config.field_map);
        let writer = CardWriter::new(self.config, self.services);
        let mut attempts = Vec::new();

        loop {
            let generation = GenerationRequest {
                current_card: Some(&current),
                user_prompt: request.prompt.as_deref(),
                attempts: &attempts,
                ..GenerationRequest::new(&sentence, &word)
            };
            let card = self.services.generator.generate(&generation)?;
            console.report(&format_card(&card));
            if self.options.dry_run {
                return Ok(UpdateOutcome::Previewed);
            }

            let choice = match self.options.auto_accept {
                true => 0,
                false => {
                    let options: Vec<String> = CHOICES.iter().map(|c| c.to_string()).collect();
                    console.select("Apply this card?", &options, SKIP_CHOICE)?
                }
            };

            match choice {
                0 => {
                    writer.update(note.note_id, &card, Some(&note), self.options.auto_accept, console)?;
                    console.report(&format!("Updated note id: {}", note.note_id));
                    return Ok(UpdateOutcome::Updated(note.note_id));
                }
                1 => {
                    log::debug!("Regenerating after attempt {}", attempts.len() + 1);
                    attempts.push(card.to_payload());
                }
                _ => {
                    console.report("Skipped.");
                    return Ok(UpdateOutcome::Skipped);
                }
            }
        }
    }

    fn resolve_note(
        &self,
        request: &UpdateRequest,
        console: &mut dyn Console,
    ) -> Result<Note, CardError> {
        let store = self.services.store;
        let missing = |note_id: u64| CardError::Validation(format!("Note id {} not found.", note_id));

        if let Some(note_id) = request.note_id {
            return store.notes_info(&[note_id])?.into_iter().next().ok_or_else(|| missing(note_id));
        }

        let Some(word) = non_blank(request.word.as_deref()) else {
            return Err(CardError::Validation("Provide --word or --note-id.".into()));
        };

        let locator = NoteLocator::new(store, self.config);
        let ids = locator.find(word)?;
        let mut notes = match ids.is_empty() {
            true => Vec::new(),
            false => store.notes_info(&ids)?,
        };
        if notes.is_empty() {
            return Err(CardError::Validation(format!("No notes found for '{}'.", word)));
        }
        if notes.len() == 1 || self.options.auto_accept {
            return Ok(notes.swap_remove(0));
        }

        let selected = locator.select_note_id(&notes, console)?;
        match notes.iter().position(|note| note.note_id == selected) {
            Some(idx) => Ok(notes.swap_remove(idx)),
            None => store.notes_info(&[selected])?.into_iter().next().ok_or_else(|| missing(selected)),
        }
    }
}
