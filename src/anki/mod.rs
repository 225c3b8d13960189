use std::collections::BTreeMap;

use serde_json::{
    Map,
    Value,
};

use crate::{
    config::Config,
    console::Console,
    core::{
        utils::quote_query_value,
        CardError,
        CardKey,
        FieldMap,
    },
};

pub mod api;

pub use api::{
    AnkiConnect,
    NewNote,
    Note,
    NoteOptions,
};

/// Operations consumed from the flashcard store.
pub trait NoteStore {
    fn find_notes(&self, query: &str) -> Result<Vec<u64>, CardError>;
    fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<Note>, CardError>;
    fn add_note(&self, note: &NewNote) -> Result<u64, CardError>;
    fn update_note_fields(
        &self,
        note_id: u64,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CardError>;
    fn store_media_file(&self, filename: &str, data: &[u8]) -> Result<String, CardError>;
}

const MANUAL_ENTRY: &str = "Enter note id...";

/// Finds notes of the configured note type by word and narrows them down to one.
pub struct NoteLocator<'a> {
    store: &'a dyn NoteStore,
    config: &'a Config,
}

impl<'a> NoteLocator<'a> {
    pub fn new(store: &'a dyn NoteStore, config: &'a Config) -> Self {
        Self { store, config }
    }

    pub fn query_for(&self, word: &str) -> String {
        let escaped =
            word.trim().replace('\\', "\\\\").replace('*', "\\*").replace('_', "\\_");
        format!(
            "note:{} {}",
            quote_query_value(&self.config.note_model),
            quote_query_value(&format!("{}:{}", self.config.word_field(), escaped))
        )
    }

    /// Matching note ids in the store's own order.
    pub fn find(&self, word: &str) -> Result<Vec<u64>, CardError> {
        self.store.find_notes(&self.query_for(word))
    }

    /// Picks one id out of `note_ids`, asking the operator only when there are several
    /// candidates and `allow_pick` is set. `Ok(None)` means nothing to pick from.
    pub fn resolve(
        &self,
        note_ids: &[u64],
        allow_pick: bool,
        console: &mut dyn Console,
    ) -> Result<Option<u64>, CardError> {
        match note_ids {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            [first, ..] if !allow_pick => Ok(Some(*first)),
            _ => {
                let notes = self.store.notes_info(note_ids)?;
                if notes.is_empty() {
                    return Ok(None);
                }
                self.select_note_id(&notes, console).map(Some)
            }
        }
    }

    /// Menu over note summaries plus a manual-entry escape. A manually typed id is not
    /// checked against the candidates.
    pub fn select_note_id(
        &self,
        notes: &[Note],
        console: &mut dyn Console,
    ) -> Result<u64, CardError> {
        let mut options: Vec<String> =
            notes.iter().map(|note| note_summary(note, &self.config.field_map)).collect();
        options.push(MANUAL_ENTRY.to_string());

        let selected = console.select("Pick a note to update", &options, 0)?;
        if let Some(note) = notes.get(selected) {
            return Ok(note.note_id);
        }

        loop {
            let Some(raw) = console.read_line("Note id: ")? else {
                return Err(CardError::SelectionAbort);
            };
            let raw = raw.trim();
            if raw.eq_ignore_ascii_case("q") || raw.eq_ignore_ascii_case("quit") {
                return Err(CardError::SelectionAbort);
            }
            match raw.parse::<u64>() {
                Ok(note_id) => return Ok(note_id),
                Err(_) => console.report("Invalid note id."),
            }
        }
    }
}

pub fn note_summary(note: &Note, field_map: &FieldMap) -> String {
    let value = |key: CardKey| {
        field_map
            .get(&key)
            .and_then(|field| note.field_value(field))
            .filter(|value| !value.is_empty())
            .unwrap_or("?")
    };
    format!(
        "{} | {} | {} | {}",
        note.note_id,
        value(CardKey::WordBase),
        value(CardKey::PartOfSpeech),
        value(CardKey::Translation)
    )
}

/// Current note content keyed by card attribute; mapped fields missing on the note are blank.
pub fn note_to_card_payload(note: &Note, field_map: &FieldMap) -> Value {
    let payload: Map<String, Value> = field_map
        .iter()
        .map(|(key, field)| {
            let value = note.field_value(field).unwrap_or_default();
            (key.to_string(), Value::String(value.to_string()))
        })
        .collect();
    Value::Object(payload)
}
