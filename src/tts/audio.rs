use std::fs;

use sha2::{
    Digest,
    Sha256,
};

use super::Synthesizer;
use crate::{
    anki::NoteStore,
    core::CardError,
};

const ADDRESS_LEN: usize = 16;

/// Deduplication key for a pronunciation: the same voice, rate and text always hash to
/// the same address.
pub fn content_address(voice: &str, rate: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}|{}", voice, rate, text).as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(ADDRESS_LEN);
    digest
}

pub fn media_filename(voice: &str, rate: &str, text: &str) -> String {
    format!("tts_{}.mp3", content_address(voice, rate, text))
}

/// Synthesizes pronunciation clips and uploads them under content-addressed names.
pub struct AudioAssetBuilder<'a> {
    store: &'a dyn NoteStore,
    synthesizer: &'a dyn Synthesizer,
    voice: &'a str,
    rate: &'a str,
}

impl<'a> AudioAssetBuilder<'a> {
    pub fn new(
        store: &'a dyn NoteStore,
        synthesizer: &'a dyn Synthesizer,
        voice: &'a str,
        rate: &'a str,
    ) -> Self {
        Self { store, synthesizer, voice, rate }
    }

    /// Returns the `[sound:...]` field value for `text`.
    ///
    /// The clip is written to a private temp file that is removed when this returns,
    /// whichever way it returns.
    pub fn build(&self, text: &str) -> Result<String, CardError> {
        let text = text.trim();
        let filename = media_filename(self.voice, self.rate, text);

        let scratch = tempfile::Builder::new()
            .prefix("anki_tts_")
            .suffix(".mp3")
            .tempfile()
            .map_err(|e| CardError::Synthesis(format!("could not create audio temp file: {}", e)))?;
        self.synthesizer.synthesize(text, self.voice, self.rate, scratch.path())?;

        let bytes = fs::read(scratch.path()).map_err(|e| {
            CardError::Synthesis(format!("could not read synthesized audio for {:?}: {}", text, e))
        })?;
        if bytes.is_empty() {
            return Err(CardError::Synthesis(format!("no audio produced for {:?}", text)));
        }

        let stored = self.store.store_media_file(&filename, &bytes)?;
        log::info!("Stored audio {} ({} bytes)", stored, bytes.len());
        Ok(format!("[sound:{}]", filename))
    }
}
