//! Layered configuration: built-in defaults, the JSON config file, `ANKI_VOCAB_*`
//! environment variables and command-line overrides, merged in that order into one
//! immutable [`Config`].

use std::{
    fmt,
    path::Path,
    str::FromStr,
};

use serde_json::{
    json,
    Map,
    Value,
};

use crate::{
    core::{
        CardError,
        CardKey,
        FieldMap,
    },
    persistence,
};

/// Three-valued session policy for updating existing notes and overwriting their audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    #[default]
    Ask,
    Never,
    Always,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Ask => "ask",
            Policy::Never => "never",
            Policy::Always => "always",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" => Ok(Policy::Ask),
            "never" => Ok(Policy::Never),
            "always" => Ok(Policy::Always),
            other => Err(format!("'{}' is not one of ask, never, always", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsSettings {
    pub voice: String,
    pub rate: String,
    pub field: String,
    pub enabled: bool,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub deck: String,
    pub note_model: String,
    pub field_map: FieldMap,
    pub ankiconnect_url: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub tts: TtsSettings,
    pub update_policy: Policy,
    pub overwrite_audio: Policy,
}

impl Config {
    /// Store field holding the card's base form, used for lookups.
    pub fn word_field(&self) -> &str {
        self.field_map.get(&CardKey::WordBase).map(String::as_str).unwrap_or("Word")
    }

    pub fn mapped_field(&self, key: CardKey) -> Option<&str> {
        self.field_map.get(&key).map(String::as_str)
    }

    /// Builds a config from an already merged document.
    pub fn from_document(document: &Value) -> Result<Self, CardError> {
        if !document.is_object() {
            return Err(CardError::Config("config document must be a mapping".into()));
        }

        let api_key = match document.get("openai_api_key") {
            None | Some(Value::Null) => None,
            Some(Value::String(key)) if key.trim().is_empty() => None,
            Some(Value::String(key)) => Some(key.trim().to_string()),
            Some(_) => return Err(CardError::Config("'openai_api_key' must be a string".into())),
        };

        Ok(Config {
            deck: string_at(document, "deck")?,
            note_model: string_at(document, "note_model")?,
            field_map: field_map_at(document)?,
            ankiconnect_url: string_at(document, "ankiconnect_url")?,
            openai_model: string_at(document, "openai_model")?,
            openai_base_url: string_at(document, "openai_base_url")?,
            openai_api_key: api_key,
            tts: TtsSettings {
                voice: string_at(document, "tts.voice")?,
                rate: string_at(document, "tts.rate")?,
                field: string_at(document, "tts.field")?,
                enabled: bool_at(document, "tts.enabled")?,
                command: string_at(document, "tts.command")?,
            },
            update_policy: policy_at(document, "session.update_policy")?,
            overwrite_audio: policy_at(document, "session.overwrite_audio")?,
        })
    }
}

/// Command-line layer, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub deck: Option<String>,
    pub note_model: Option<String>,
    pub openai_model: Option<String>,
    pub voice: Option<String>,
    pub rate: Option<String>,
    pub no_tts: bool,
    pub update_policy: Option<Policy>,
    pub overwrite_audio: Option<Policy>,
}

impl ConfigOverrides {
    fn apply(&self, document: &mut Value) {
        let text = [
            ("deck", &self.deck),
            ("note_model", &self.note_model),
            ("openai_model", &self.openai_model),
            ("tts.voice", &self.voice),
            ("tts.rate", &self.rate),
        ];
        for (path, value) in text {
            if let Some(value) = value {
                set_path(document, path, Value::String(value.clone()));
            }
        }
        if self.no_tts {
            set_path(document, "tts.enabled", Value::Bool(false));
        }
        if let Some(policy) = self.update_policy {
            set_path(document, "session.update_policy", json!(policy.as_str()));
        }
        if let Some(policy) = self.overwrite_audio {
            set_path(document, "session.overwrite_audio", json!(policy.as_str()));
        }
    }
}

enum EnvKind {
    Text,
    Flag,
}

const ENV_OVERRIDES: &[(&str, &str, EnvKind)] = &[
    ("ANKI_VOCAB_DECK", "deck", EnvKind::Text),
    ("ANKI_VOCAB_NOTE_MODEL", "note_model", EnvKind::Text),
    ("ANKI_VOCAB_ANKICONNECT_URL", "ankiconnect_url", EnvKind::Text),
    ("ANKI_VOCAB_OPENAI_MODEL", "openai_model", EnvKind::Text),
    ("ANKI_VOCAB_OPENAI_BASE_URL", "openai_base_url", EnvKind::Text),
    ("ANKI_VOCAB_OPENAI_API_KEY", "openai_api_key", EnvKind::Text),
    ("ANKI_VOCAB_TTS_VOICE", "tts.voice", EnvKind::Text),
    ("ANKI_VOCAB_TTS_RATE", "tts.rate", EnvKind::Text),
    ("ANKI_VOCAB_TTS_FIELD", "tts.field", EnvKind::Text),
    ("ANKI_VOCAB_TTS_ENABLED", "tts.enabled", EnvKind::Flag),
    ("ANKI_VOCAB_TTS_COMMAND", "tts.command", EnvKind::Text),
    ("ANKI_VOCAB_UPDATE_POLICY", "session.update_policy", EnvKind::Text),
    ("ANKI_VOCAB_OVERWRITE_AUDIO", "session.overwrite_audio", EnvKind::Text),
];

const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub fn default_document() -> Value {
    json!({
        "deck": "Reading",
        "note_model": "English",
        "ankiconnect_url": "http://127.0.0.1:8765",
        "openai_model": "gpt-5.2",
        "openai_base_url": "https://api.openai.com/v1",
        "openai_api_key": null,
        "field_map": {
            "word_base": "Word",
            "part_of_speech": "Part of Speech",
            "translation": "Russian Meaning",
            "definition": "Definition",
            "context_sentence": "Context Sentence",
            "context_translation": "Sentence Translation",
            "rarity": "Rarity",
            "level": "CEFR"
        },
        "tts": {
            "voice": "en-US-AvaNeural",
            "rate": "+0%",
            "field": "Audio",
            "enabled": true,
            "command": "edge-tts"
        },
        "session": {
            "update_policy": "ask",
            "overwrite_audio": "ask"
        }
    })
}

/// Recursive structural merge: nested mappings merge key by key, anything else in
/// `overlay` replaces what `base` had.
pub fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let nested = value.is_object() && base_map.get(key).is_some_and(Value::is_object);
                if !nested {
                    base_map.insert(key.clone(), value.clone());
                } else if let Some(existing) = base_map.get_mut(key) {
                    merge(existing, value);
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Sets a dotted key path, creating (or replacing non-mapping) intermediate nodes.
pub fn set_path(document: &mut Value, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = parts.pop().unwrap_or_default();

    let mut current = document;
    for part in parts {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        let entry = map.entry(part.to_string()).or_insert_with(|| json!({}));
        if !entry.is_object() {
            *entry = json!({});
        }
        current = entry;
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }
}

pub fn get_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |node, part| node.get(part))
}

fn coerce_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn apply_env(document: &mut Value, env: &dyn Fn(&str) -> Option<String>) {
    for (name, path, kind) in ENV_OVERRIDES {
        let Some(value) = env(name) else {
            continue;
        };
        log::debug!("Config override from {}", name);
        let value = match kind {
            EnvKind::Text => Value::String(value),
            EnvKind::Flag => Value::Bool(coerce_bool(&value)),
        };
        set_path(document, path, value);
    }

    let has_key =
        matches!(document.get("openai_api_key"), Some(Value::String(k)) if !k.trim().is_empty());
    if !has_key {
        if let Some(key) = env(FALLBACK_API_KEY_ENV) {
            set_path(document, "openai_api_key", Value::String(key));
        }
    }
}

/// Merges `defaults ⊕ file ⊕ env ⊕ overrides` into one document. Unknown keys survive.
pub fn resolve_document(
    file: &Value,
    env: &dyn Fn(&str) -> Option<String>,
    overrides: &ConfigOverrides,
) -> Result<Value, CardError> {
    if !file.is_object() {
        return Err(CardError::Config("config file must contain a JSON mapping".into()));
    }

    let mut document = default_document();
    merge(&mut document, file);
    apply_env(&mut document, env);
    overrides.apply(&mut document);
    Ok(document)
}

pub fn resolve(
    file: &Value,
    env: &dyn Fn(&str) -> Option<String>,
    overrides: &ConfigOverrides,
) -> Result<Config, CardError> {
    Config::from_document(&resolve_document(file, env, overrides)?)
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn no_env(_: &str) -> Option<String> {
    None
}

/// Resolves the process configuration from the config file and real environment.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<Config, CardError> {
    let file = persistence::load_document(&persistence::config_file_path())?;
    resolve(&file, &process_env, overrides)
}

/// Document shown by `config show`, with the API key masked.
pub fn display_document() -> Result<Value, CardError> {
    let file = persistence::load_document(&persistence::config_file_path())?;
    let mut document = resolve_document(&file, &process_env, &ConfigOverrides::default())?;
    Config::from_document(&document)?;
    if matches!(document.get("openai_api_key"), Some(Value::String(_))) {
        set_path(&mut document, "openai_api_key", json!("********"));
    }
    Ok(document)
}

pub fn init_config(path: &Path, force: bool) -> Result<(), CardError> {
    if path.exists() && !force {
        return Err(CardError::Validation(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }
    persistence::save_document(&default_document(), path)
}

/// Writes one dotted key into the config file. `true`/`false` become booleans.
///
/// The updated file is validated against the defaults before it is saved, so a typo in a
/// policy value never lands on disk.
pub fn set_config_value(path: &Path, key: &str, value: &str) -> Result<(), CardError> {
    if key.trim().is_empty() || key.split('.').any(str::is_empty) {
        return Err(CardError::Validation(format!("'{}' is not a valid config key", key)));
    }

    let mut file = persistence::load_document(path)?;
    if file.as_object().map(Map::is_empty).unwrap_or(true) {
        file = default_document();
    }

    let value = match value.trim() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value.to_string()),
    };
    set_path(&mut file, key, value);

    resolve(&file, &no_env, &ConfigOverrides::default())?;
    persistence::save_document(&file, path)
}

fn string_at(document: &Value, path: &str) -> Result<String, CardError> {
    match get_path(document, path) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(Value::Number(value)) => Ok(value.to_string()),
        Some(_) => Err(CardError::Config(format!("'{}' must be a string", path))),
        None => Err(CardError::Config(format!("'{}' is missing", path))),
    }
}

fn bool_at(document: &Value, path: &str) -> Result<bool, CardError> {
    match get_path(document, path) {
        Some(Value::Bool(value)) => Ok(*value),
        Some(Value::String(value)) => Ok(coerce_bool(value)),
        _ => Err(CardError::Config(format!("'{}' must be a boolean", path))),
    }
}

fn policy_at(document: &Value, path: &str) -> Result<Policy, CardError> {
    let raw = string_at(document, path)?;
    raw.parse().map_err(|e| CardError::Config(format!("'{}': {}", path, e)))
}

fn field_map_at(document: &Value) -> Result<FieldMap, CardError> {
    let Some(Value::Object(entries)) = document.get("field_map") else {
        return Err(CardError::Config("field_map must be a mapping in config".into()));
    };

    let mut field_map = FieldMap::new();
    for (key, value) in entries {
        let card_key: CardKey =
            key.parse().map_err(|e| CardError::Config(format!("field_map: {}", e)))?;
        match value {
            Value::Null => continue,
            Value::String(field) if !field.trim().is_empty() => {
                field_map.insert(card_key, field.trim().to_string());
            }
            _ => {
                return Err(CardError::Config(format!(
                    "field_map.{} must be a non-empty string",
                    key
                )))
            }
        }
    }
    Ok(field_map)
}
