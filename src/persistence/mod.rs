use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde_json::Value;

use crate::core::CardError;

const APP_NAME: &str = "anki-vocab";
const CONFIG_FILE: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "ANKI_VOCAB_CONFIG";

pub fn get_app_config_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(config_dir) => config_dir.join(APP_NAME),
        None => PathBuf::from("."),
    }
}

/// `$ANKI_VOCAB_CONFIG` when set, otherwise `<config dir>/anki-vocab/config.json`.
pub fn config_file_path() -> PathBuf {
    match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => get_app_config_dir().join(CONFIG_FILE),
    }
}

/// Reads a JSON document; a missing file reads as an empty object.
pub fn load_document(path: &Path) -> Result<Value, CardError> {
    if !path.exists() {
        return Ok(Value::Object(Default::default()));
    }

    let json = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&json)
        .map_err(|e| CardError::Config(format!("{} is not valid JSON: {}", path.display(), e)))?;
    log::debug!("Config loaded from: {}", path.display());
    Ok(document)
}

pub fn save_document(document: &Value, path: &Path) -> Result<(), CardError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json)?;
    log::info!("Config saved to: {}", path.display());
    Ok(())
}
