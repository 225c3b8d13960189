use std::collections::{
    BTreeMap,
    HashMap,
};

use base64::{
    engine::general_purpose::STANDARD,
    Engine,
};
use reqwest::blocking::Client;
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use serde_json::{
    json,
    Value,
};

use super::NoteStore;
use crate::core::{
    http::{
        ensure_success,
        http_client,
    },
    CardError,
};

const API_VERSION: u32 = 6;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Field {
    pub value: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: u64,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub fields: HashMap<String, Field>,
}

impl Note {
    pub fn new(note_id: u64, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .enumerate()
            .map(|(order, (name, value))| {
                (name.to_string(), Field { value: value.to_string(), order: order as u32 })
            })
            .collect();
        Self { note_id, model_name: String::new(), tags: Vec::new(), fields }
    }

    /// Trimmed field value; `None` for absent fields.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|field| field.value.trim())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    pub allow_duplicate: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub deck_name: String,
    pub model_name: String,
    pub fields: BTreeMap<String, String>,
    pub options: NoteOptions,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self, action: &str) -> Result<Option<T>, CardError> {
        match self.error {
            Some(error) => Err(CardError::store(action, error)),
            None => Ok(self.result),
        }
    }
}

/// Blocking AnkiConnect client.
pub struct AnkiConnect {
    url: String,
    client: Client,
}

impl AnkiConnect {
    pub fn new(url: &str) -> Result<Self, CardError> {
        Ok(Self { url: url.to_string(), client: http_client()? })
    }

    fn make_request<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Value,
    ) -> Result<Option<T>, CardError> {
        let body = json!({ "action": action, "version": API_VERSION, "params": params });
        log::debug!("AnkiConnect request: {}", action);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| CardError::store(action, e))?;
        let response = ensure_success(response).map_err(|e| CardError::store(action, e))?;
        let response: ApiResponse<T> = response.json().map_err(|e| CardError::store(action, e))?;

        response.into_result(action)
    }

    fn require<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<T, CardError> {
        self.make_request(action, params)?
            .ok_or_else(|| CardError::store(action, "empty result"))
    }

    //Used to check if ankiconnect is online
    pub fn version(&self) -> Result<u32, CardError> {
        self.require("version", json!({}))
    }
}

impl NoteStore for AnkiConnect {
    fn find_notes(&self, query: &str) -> Result<Vec<u64>, CardError> {
        log::debug!("findNotes query: {}", query);
        self.require("findNotes", json!({ "query": query }))
    }

    fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<Note>, CardError> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }
        // notesInfo answers unknown ids with empty objects
        let raw: Vec<Value> = self.require("notesInfo", json!({ "notes": note_ids }))?;
        raw.into_iter()
            .filter(|entry| entry.get("noteId").is_some())
            .map(|entry| serde_json::from_value(entry).map_err(|e| CardError::store("notesInfo", e)))
            .collect()
    }

    fn add_note(&self, note: &NewNote) -> Result<u64, CardError> {
        self.require("addNote", json!({ "note": note }))
    }

    fn update_note_fields(
        &self,
        note_id: u64,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CardError> {
        self.make_request::<Value>(
            "updateNoteFields",
            json!({ "note": { "id": note_id, "fields": fields } }),
        )?;
        Ok(())
    }

    fn store_media_file(&self, filename: &str, data: &[u8]) -> Result<String, CardError> {
        log::debug!("storeMediaFile {} ({} bytes)", filename, data.len());
        let encoded = STANDARD.encode(data);
        self.require("storeMediaFile", json!({ "filename": filename, "data": encoded }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_error_is_store_error() {
        let response: ApiResponse<Vec<u64>> =
            serde_json::from_value(json!({ "result": null, "error": "model was not found" }))
                .unwrap();
        let err = response.into_result("findNotes").unwrap_err();
        assert_eq!(err.to_string(), "AnkiConnect error for findNotes: model was not found");
    }

    #[test]
    fn test_note_deserializes_from_notes_info() {
        let note: Note = serde_json::from_value(json!({
            "noteId": 1502298033753u64,
            "modelName": "English",
            "tags": ["auto"],
            "fields": {
                "Word": { "value": " run ", "order": 0 },
                "Audio": { "value": "", "order": 1 }
            },
            "cards": [1498938915662u64]
        }))
        .unwrap();
        assert_eq!(note.note_id, 1502298033753);
        assert_eq!(note.field_value("Word"), Some("run"));
        assert_eq!(note.field_value("Audio"), Some(""));
        assert_eq!(note.field_value("Missing"), None);
    }

    #[test]
    fn test_new_note_wire_shape() {
        let note = NewNote {
            deck_name: "Reading".into(),
            model_name: "English".into(),
            fields: BTreeMap::from([("Word".to_string(), "mat".to_string())]),
            options: NoteOptions { allow_duplicate: false },
            tags: vec!["auto".into()],
        };
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["deckName"], "Reading");
        assert_eq!(value["modelName"], "English");
        assert_eq!(value["options"]["allowDuplicate"], false);
        assert_eq!(value["fields"]["Word"], "mat");
    }
}
