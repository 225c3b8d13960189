use crate::{
    anki::{
        NewNote,
        Note,
        NoteOptions,
        NoteStore,
    },
    config::{
        Config,
        Policy,
    },
    console::Console,
    core::{
        Card,
        CardError,
    },
    llm::CardGenerator,
    tts::{
        AudioAssetBuilder,
        Synthesizer,
    },
};

pub const AUTO_TAG: &str = "auto";
pub const TTS_TAG: &str = "tts";

/// Collaborators shared by both engines.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub store: &'a dyn NoteStore,
    pub generator: &'a dyn CardGenerator,
    pub synthesizer: &'a dyn Synthesizer,
}

/// Decides whether a note's audio field gets a fresh clip.
///
/// A note without audio always gets one. `auto_accept` answers an `Ask` with no.
pub fn should_write_audio(
    policy: Policy,
    has_audio: bool,
    auto_accept: bool,
    console: &mut dyn Console,
) -> Result<bool, CardError> {
    if !has_audio {
        return Ok(true);
    }
    match policy {
        Policy::Always => Ok(true),
        Policy::Never => Ok(false),
        Policy::Ask if auto_accept => Ok(false),
        Policy::Ask => console.confirm("Existing audio found. Overwrite it?", false),
    }
}

/// Turns accepted cards into store writes.
pub struct CardWriter<'a> {
    config: &'a Config,
    services: Services<'a>,
}

impl<'a> CardWriter<'a> {
    pub fn new(config: &'a Config, services: Services<'a>) -> Self {
        Self { config, services }
    }

    fn audio_field(&self, card: &Card) -> Result<String, CardError> {
        let tts = &self.config.tts;
        AudioAssetBuilder::new(self.services.store, self.services.synthesizer, &tts.voice, &tts.rate)
            .build(card.speech_text())
    }

    pub fn new_note(&self, card: &Card, audio: Option<String>) -> NewNote {
        let mut fields = card.to_fields(&self.config.field_map);
        let mut tags = vec![AUTO_TAG.to_string()];
        if let Some(audio) = audio {
            fields.insert(self.config.tts.field.clone(), audio);
            tags.push(TTS_TAG.to_string());
        }
        NewNote {
            deck_name: self.config.deck.clone(),
            model_name: self.config.note_model.clone(),
            fields,
            options: NoteOptions { allow_duplicate: false },
            tags,
        }
    }

    pub fn add(&self, card: &Card) -> Result<u64, CardError> {
        let audio = match self.config.tts.enabled {
            true => Some(self.audio_field(card)?),
            false => None,
        };
        let note_id = self.services.store.add_note(&self.new_note(card, audio))?;
        log::info!("Added note {} for '{}'", note_id, card.word_base);
        Ok(note_id)
    }

    /// Overwrites the mapped fields of `note_id`. `current` is the note as already
    /// fetched, if the caller has it; otherwise it is looked up first, and an unknown id
    /// fails before any audio is synthesized.
    pub fn update(
        &self,
        note_id: u64,
        card: &Card,
        current: Option<&Note>,
        auto_accept: bool,
        console: &mut dyn Console,
    ) -> Result<(), CardError> {
        let fetched;
        let note = match current {
            Some(note) => note,
            None => {
                fetched = self.services.store.notes_info(&[note_id])?;
                fetched
                    .first()
                    .ok_or_else(|| CardError::Validation(format!("Note id {} not found.", note_id)))?
            }
        };

        let mut fields = card.to_fields(&self.config.field_map);
        let tts = &self.config.tts;
        if tts.enabled {
            let has_audio = note.field_value(&tts.field).is_some_and(|v| !v.is_empty());
            if should_write_audio(self.config.overwrite_audio, has_audio, auto_accept, console)? {
                fields.insert(tts.field.clone(), self.audio_field(card)?);
            } else {
                log::debug!("Keeping existing audio on note {}", note_id);
            }
        }

        self.services.store.update_note_fields(note_id, &fields)?;
        log::info!("Updated note {} for '{}'", note_id, card.word_base);
        Ok(())
    }
}
