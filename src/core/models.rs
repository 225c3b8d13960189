use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
};

use serde_json::Value;

use super::CardError;

/// Attribute keys of a generated card, as they appear in the model payload and in `field_map`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CardKey {
    WordBase,
    PartOfSpeech,
    Translation,
    Definition,
    ContextSentence,
    ContextTranslation,
    Rarity,
    Level,
    TtsText,
}

impl CardKey {
    pub const REQUIRED: [CardKey; 8] = [
        CardKey::WordBase,
        CardKey::PartOfSpeech,
        CardKey::Translation,
        CardKey::Definition,
        CardKey::ContextSentence,
        CardKey::ContextTranslation,
        CardKey::Rarity,
        CardKey::Level,
    ];

    /// Display order used for previews; optional keys last.
    pub const ALL: [CardKey; 9] = [
        CardKey::WordBase,
        CardKey::PartOfSpeech,
        CardKey::Translation,
        CardKey::Definition,
        CardKey::ContextSentence,
        CardKey::ContextTranslation,
        CardKey::Rarity,
        CardKey::Level,
        CardKey::TtsText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardKey::WordBase => "word_base",
            CardKey::PartOfSpeech => "part_of_speech",
            CardKey::Translation => "translation",
            CardKey::Definition => "definition",
            CardKey::ContextSentence => "context_sentence",
            CardKey::ContextTranslation => "context_translation",
            CardKey::Rarity => "rarity",
            CardKey::Level => "level",
            CardKey::TtsText => "tts_text",
        }
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown card attribute '{}'", s))
    }
}

pub type FieldMap = BTreeMap<CardKey, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub word_base: String,
    pub part_of_speech: String,
    pub translation: String,
    pub definition: String,
    pub context_sentence: String,
    pub context_translation: String,
    pub rarity: String,
    pub level: String,
    pub tts_text: Option<String>,
}

impl Card {
    /// Validates an untyped model payload into a card.
    ///
    /// Every required key must be a non-empty string, `tts_text` may be absent but never empty,
    /// and keys outside the card schema are rejected.
    pub fn from_payload(payload: &Value) -> Result<Self, CardError> {
        let object = payload
            .as_object()
            .ok_or_else(|| CardError::Generation("card payload must be a JSON object".into()))?;

        if let Some(unknown) = object.keys().find(|key| key.parse::<CardKey>().is_err()) {
            return Err(CardError::Generation(format!("unexpected key '{}' in card", unknown)));
        }

        let missing: Vec<&str> = CardKey::REQUIRED
            .iter()
            .filter(|key| !object.contains_key(key.as_str()))
            .map(|key| key.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(CardError::Generation(format!("missing keys {:?}", missing)));
        }

        let required = |key: CardKey| -> Result<String, CardError> {
            match object.get(key.as_str()).and_then(Value::as_str).map(str::trim) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => Err(CardError::Generation(format!("'{}' must be a non-empty string", key))),
            }
        };

        let tts_text = match object.get(CardKey::TtsText.as_str()) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Some(_) => {
                return Err(CardError::Generation("'tts_text' must be a non-empty string".into()))
            }
        };

        Ok(Card {
            word_base: required(CardKey::WordBase)?,
            part_of_speech: required(CardKey::PartOfSpeech)?,
            translation: required(CardKey::Translation)?,
            definition: required(CardKey::Definition)?,
            context_sentence: required(CardKey::ContextSentence)?,
            context_translation: required(CardKey::ContextTranslation)?,
            rarity: required(CardKey::Rarity)?,
            level: required(CardKey::Level)?,
            tts_text,
        })
    }

    pub fn get(&self, key: CardKey) -> Option<&str> {
        match key {
            CardKey::WordBase => Some(&self.word_base),
            CardKey::PartOfSpeech => Some(&self.part_of_speech),
            CardKey::Translation => Some(&self.translation),
            CardKey::Definition => Some(&self.definition),
            CardKey::ContextSentence => Some(&self.context_sentence),
            CardKey::ContextTranslation => Some(&self.context_translation),
            CardKey::Rarity => Some(&self.rarity),
            CardKey::Level => Some(&self.level),
            CardKey::TtsText => self.tts_text.as_deref(),
        }
    }

    /// Text to pronounce: the explicit `tts_text`, falling back to the base form.
    pub fn speech_text(&self) -> &str {
        self.tts_text.as_deref().unwrap_or(&self.word_base)
    }

    pub fn to_payload(&self) -> Value {
        let map = CardKey::ALL
            .iter()
            .filter_map(|key| self.get(*key).map(|v| (key.to_string(), Value::String(v.into()))))
            .collect();
        Value::Object(map)
    }

    /// Projects the card onto store field names; attributes without a mapping are dropped.
    pub fn to_fields(&self, field_map: &FieldMap) -> BTreeMap<String, String> {
        field_map
            .iter()
            .filter_map(|(key, field)| self.get(*key).map(|value| (field.clone(), value.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload() -> Value {
        json!({
            "word_base": "test",
            "part_of_speech": "noun",
            "translation": "тест",
            "definition": "a simple test",
            "context_sentence": "This is a test.",
            "context_translation": "Это тест.",
            "rarity": "Common",
            "level": "B1",
            "tts_text": " test "
        })
    }

    #[test]
    fn test_from_payload_accepts_valid_card() {
        let card = Card::from_payload(&payload()).unwrap();
        assert_eq!(card.word_base, "test");
        assert_eq!(card.tts_text.as_deref(), Some("test"));
        assert_eq!(card.speech_text(), "test");
    }

    #[test]
    fn test_from_payload_requires_fields() {
        let err = Card::from_payload(&json!({ "word_base": "mat" })).unwrap_err();
        assert!(matches!(err, CardError::Generation(_)));
        assert!(err.to_string().contains("definition"));
    }

    #[test]
    fn test_from_payload_rejects_blank_and_unknown_keys() {
        let mut blank = payload();
        blank["rarity"] = json!("   ");
        assert!(matches!(Card::from_payload(&blank), Err(CardError::Generation(_))));

        let mut empty_tts = payload();
        empty_tts["tts_text"] = json!("");
        assert!(Card::from_payload(&empty_tts).is_err());

        let mut extra = payload();
        extra["notes"] = json!("extra");
        assert!(Card::from_payload(&extra).is_err());

        assert!(Card::from_payload(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_speech_text_falls_back_to_word_base() {
        let mut without_tts = payload();
        without_tts.as_object_mut().unwrap().remove("tts_text");
        let card = Card::from_payload(&without_tts).unwrap();
        assert_eq!(card.speech_text(), "test");
        assert!(card.to_payload().get("tts_text").is_none());
    }

    #[test]
    fn test_to_fields_uses_mapping_only() {
        let card = Card::from_payload(&payload()).unwrap();
        let mut field_map = FieldMap::new();
        field_map.insert(CardKey::WordBase, "Word".into());
        field_map.insert(CardKey::Level, "CEFR".into());

        let fields = card.to_fields(&field_map);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["Word"], "test");
        assert_eq!(fields["CEFR"], "B1");
    }
}
