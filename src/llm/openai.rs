//! OpenAI chat-completions adapter.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{
    json,
    Value,
};

use super::{
    CardGenerator,
    GenerationRequest,
};
use crate::{
    config::Config,
    core::{
        http::{
            ensure_success,
            http_client,
        },
        Card,
        CardError,
    },
};

const TEMPERATURE: f64 = 0.2;

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(config: &Config) -> Result<Self, CardError> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            CardError::Config(
                "OpenAI API key is not set (config key openai_api_key or OPENAI_API_KEY)".into(),
            )
        })?;
        Ok(Self {
            client: http_client()?,
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
        })
    }

    fn request_body(&self, request: &GenerationRequest<'_>) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt() },
                { "role": "user", "content": request.user_content() },
            ],
            "temperature": TEMPERATURE,
            "response_format": { "type": "json_object" },
        })
    }
}

/// Pulls the card JSON out of a chat-completions body and validates it.
fn card_from_response(response: OpenAIResponse) -> Result<Card, CardError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| CardError::Generation("OpenAI returned empty response".into()))?;

    let payload: Value = serde_json::from_str(&content)
        .map_err(|e| CardError::Generation(format!("response is not JSON: {}", e)))?;
    Card::from_payload(&payload)
}

impl CardGenerator for OpenAiGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Card, CardError> {
        let url = format!("{}/chat/completions", self.base_url);
        log::debug!("Generating card for '{}' with {}", request.word, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .map_err(|e| CardError::Generation(e.to_string()))?;
        let response = ensure_success(response).map_err(CardError::Generation)?;
        let response: OpenAIResponse = response
            .json()
            .map_err(|e| CardError::Generation(format!("Failed to parse response: {}", e)))?;

        card_from_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content: Value) -> OpenAIResponse {
        serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        }))
        .unwrap()
    }

    #[test]
    fn test_card_from_response_validates_payload() {
        let content = json!({
            "word_base": "mat",
            "part_of_speech": "noun",
            "translation": "коврик",
            "definition": "a piece of material placed on a floor",
            "context_sentence": "The cat sat on the <b>mat</b>.",
            "context_translation": "Кошка сидела на коврике.",
            "rarity": "Common",
            "level": "A2"
        })
        .to_string();
        let card = card_from_response(response(Value::String(content))).unwrap();
        assert_eq!(card.word_base, "mat");
        assert_eq!(card.tts_text, None);
    }

    #[test]
    fn test_card_from_response_rejects_bad_content() {
        let empty = card_from_response(response(Value::Null)).unwrap_err();
        assert!(matches!(empty, CardError::Generation(_)));

        let prose = card_from_response(response(json!("Here is your card!"))).unwrap_err();
        assert!(prose.to_string().contains("not JSON"));

        let partial = json!({ "word_base": "mat" }).to_string();
        assert!(card_from_response(response(Value::String(partial))).is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let config = crate::testing::default_config();
        let config = Config { openai_api_key: Some("sk-test".into()), ..config };
        let generator = OpenAiGenerator::new(&config).unwrap();
        let body = generator.request_body(&GenerationRequest::new("The cat sat.", "cat"));

        assert_eq!(body["model"], "gpt-5.2");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "SENTENCE: The cat sat.\nTARGET: \"cat\"");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = crate::testing::default_config();
        assert!(matches!(OpenAiGenerator::new(&config), Err(CardError::Config(_))));
    }
}
