//! In-memory stand-ins for the store, generator and synthesizer.

use std::{
    cell::{
        Cell,
        RefCell,
    },
    collections::{
        BTreeMap,
        VecDeque,
    },
    fs,
    io::Cursor,
    path::{
        Path,
        PathBuf,
    },
};

use serde_json::{
    json,
    Value,
};

use crate::{
    anki::{
        api::Field,
        NewNote,
        Note,
        NoteStore,
    },
    config::{
        resolve,
        Config,
        ConfigOverrides,
    },
    console::PipedConsole,
    core::{
        Card,
        CardError,
    },
    llm::{
        CardGenerator,
        GenerationRequest,
    },
    tts::Synthesizer,
};

fn no_env(_: &str) -> Option<String> {
    None
}

pub fn default_config() -> Config {
    config_with(json!({}))
}

pub fn config_with(file: Value) -> Config {
    resolve(&file, &no_env, &ConfigOverrides::default()).unwrap()
}

pub type TestConsole = PipedConsole<Cursor<Vec<u8>>, Vec<u8>>;

pub fn piped_console(input: &str) -> TestConsole {
    PipedConsole::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

pub fn console_output(console: &TestConsole) -> String {
    String::from_utf8(console.output().clone()).unwrap()
}

pub fn card_payload(word: &str) -> Value {
    json!({
        "word_base": word,
        "part_of_speech": "noun",
        "translation": "коврик",
        "definition": "a small piece of material on the floor",
        "context_sentence": format!("The cat sat on the <b>{}</b>.", word),
        "context_translation": "Кошка сидела на коврике.",
        "rarity": "Common",
        "level": "A2"
    })
}

#[derive(Default)]
pub struct FakeStore {
    notes: RefCell<Vec<Note>>,
    media: RefCell<BTreeMap<String, Vec<u8>>>,
    added: RefCell<Vec<NewNote>>,
    updates: RefCell<Vec<(u64, BTreeMap<String, String>)>>,
    calls: RefCell<Vec<String>>,
    failing: RefCell<Vec<String>>,
    next_id: Cell<u64>,
}

impl FakeStore {
    pub fn insert_note(&self, note: Note) {
        self.notes.borrow_mut().push(note);
    }

    pub fn fail_on(&self, action: &str) {
        self.failing.borrow_mut().push(action.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn added(&self) -> Vec<NewNote> {
        self.added.borrow().clone()
    }

    pub fn updates(&self) -> Vec<(u64, BTreeMap<String, String>)> {
        self.updates.borrow().clone()
    }

    pub fn note(&self, note_id: u64) -> Option<Note> {
        self.notes.borrow().iter().find(|note| note.note_id == note_id).cloned()
    }

    pub fn media(&self, filename: &str) -> Option<Vec<u8>> {
        self.media.borrow().get(filename).cloned()
    }

    pub fn media_count(&self) -> usize {
        self.media.borrow().len()
    }

    fn record(&self, action: &str) -> Result<(), CardError> {
        self.calls.borrow_mut().push(action.to_string());
        if self.failing.borrow().iter().any(|failing| failing == action) {
            return Err(CardError::store(action, "simulated failure"));
        }
        Ok(())
    }
}

impl NoteStore for FakeStore {
    // Matches notes having a `"Field:value"` term of the query.
    fn find_notes(&self, query: &str) -> Result<Vec<u64>, CardError> {
        self.record("findNotes")?;
        Ok(self
            .notes
            .borrow()
            .iter()
            .filter(|note| {
                note.fields
                    .iter()
                    .any(|(name, field)| query.contains(&format!("\"{}:{}\"", name, field.value)))
            })
            .map(|note| note.note_id)
            .collect())
    }

    fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<Note>, CardError> {
        self.record("notesInfo")?;
        Ok(note_ids.iter().filter_map(|id| self.note(*id)).collect())
    }

    fn add_note(&self, note: &NewNote) -> Result<u64, CardError> {
        self.record("addNote")?;
        let note_id = 1001 + self.next_id.get();
        self.next_id.set(self.next_id.get() + 1);

        let fields: Vec<(&str, &str)> =
            note.fields.iter().map(|(name, value)| (name.as_str(), value.as_str())).collect();
        self.insert_note(Note::new(note_id, &fields));
        self.added.borrow_mut().push(note.clone());
        Ok(note_id)
    }

    fn update_note_fields(
        &self,
        note_id: u64,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CardError> {
        self.record("updateNoteFields")?;
        let mut notes = self.notes.borrow_mut();
        let note = notes
            .iter_mut()
            .find(|note| note.note_id == note_id)
            .ok_or_else(|| CardError::store("updateNoteFields", "note was not found"))?;
        for (name, value) in fields {
            note.fields.insert(name.clone(), Field { value: value.clone(), order: 0 });
        }
        self.updates.borrow_mut().push((note_id, fields.clone()));
        Ok(())
    }

    fn store_media_file(&self, filename: &str, data: &[u8]) -> Result<String, CardError> {
        self.record("storeMediaFile")?;
        self.media.borrow_mut().insert(filename.to_string(), data.to_vec());
        Ok(filename.to_string())
    }
}

/// Recorded generator input.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub sentence: String,
    pub word: String,
    pub current_card: Option<Value>,
    pub user_prompt: Option<String>,
    pub attempts: Vec<Value>,
}

/// Replays queued payloads through the real card validator.
#[derive(Default)]
pub struct StubGenerator {
    responses: RefCell<VecDeque<Result<Value, String>>>,
    seen: RefCell<Vec<SeenRequest>>,
}

impl StubGenerator {
    pub fn with(payloads: Vec<Value>) -> Self {
        let stub = Self::default();
        for payload in payloads {
            stub.push(payload);
        }
        stub
    }

    pub fn push(&self, payload: Value) {
        self.responses.borrow_mut().push_back(Ok(payload));
    }

    pub fn push_failure(&self, message: &str) {
        self.responses.borrow_mut().push_back(Err(message.to_string()));
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.borrow().clone()
    }
}

impl CardGenerator for StubGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Card, CardError> {
        self.seen.borrow_mut().push(SeenRequest {
            sentence: request.sentence.to_string(),
            word: request.word.to_string(),
            current_card: request.current_card.cloned(),
            user_prompt: request.user_prompt().map(str::to_string),
            attempts: request.attempts.to_vec(),
        });
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(payload)) => Card::from_payload(&payload),
            Some(Err(message)) => Err(CardError::Generation(message)),
            None => Err(CardError::Generation("no stub response queued".into())),
        }
    }
}

/// Writes placeholder audio and remembers where it wrote it.
#[derive(Default)]
pub struct StubSynthesizer {
    fail: bool,
    remove_output: bool,
    paths: RefCell<Vec<PathBuf>>,
    texts: RefCell<Vec<String>>,
}

impl StubSynthesizer {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Reports success but leaves no file behind.
    pub fn vanishing() -> Self {
        Self { remove_output: true, ..Self::default() }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.borrow().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.borrow().clone()
    }
}

impl Synthesizer for StubSynthesizer {
    fn synthesize(&self, text: &str, _voice: &str, _rate: &str, out: &Path) -> Result<(), CardError> {
        self.paths.borrow_mut().push(out.to_path_buf());
        self.texts.borrow_mut().push(text.to_string());
        fs::write(out, b"fake-audio")?;
        if self.remove_output {
            fs::remove_file(out)?;
        }
        if self.fail {
            return Err(CardError::Synthesis("stub synthesizer exited with 1".into()));
        }
        Ok(())
    }
}
