use serde_json::Value;

use crate::core::{
    Card,
    CardError,
};

pub mod openai;

pub use openai::OpenAiGenerator;

const SYSTEM_PROMPT: &str = include_str!("system_prompt.txt");
const CURRENT_CARD_PROMPT: &str = include_str!("current_card_prompt.txt");
const USER_PROMPT_PROMPT: &str = include_str!("user_prompt.txt");
const ATTEMPTS_PROMPT: &str = include_str!("attempts_prompt.txt");

/// Everything the model sees for one card.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub sentence: &'a str,
    pub word: &'a str,
    pub current_card: Option<&'a Value>,
    pub user_prompt: Option<&'a str>,
    pub attempts: &'a [Value],
}

impl<'a> GenerationRequest<'a> {
    pub fn new(sentence: &'a str, word: &'a str) -> Self {
        Self { sentence, word, current_card: None, user_prompt: None, attempts: &[] }
    }

    pub fn user_prompt(&self) -> Option<&'a str> {
        self.user_prompt.map(str::trim).filter(|prompt| !prompt.is_empty())
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = SYSTEM_PROMPT.trim().to_string();
        let sections = [
            (self.current_card.is_some(), CURRENT_CARD_PROMPT),
            (self.user_prompt().is_some(), USER_PROMPT_PROMPT),
            (!self.attempts.is_empty(), ATTEMPTS_PROMPT),
        ];
        for (_, section) in sections.iter().filter(|(enabled, _)| *enabled) {
            prompt.push_str("\n\n");
            prompt.push_str(section.trim());
        }
        prompt
    }

    pub fn user_content(&self) -> String {
        let mut content = format!("SENTENCE: {}\nTARGET: \"{}\"", self.sentence, self.word);
        if let Some(current) = self.current_card {
            content.push_str(&format!("\nCURRENT_CARD_JSON:\n{}", current));
        }
        if let Some(prompt) = self.user_prompt() {
            content.push_str(&format!("\nUSER_PROMPT:\n{}", prompt));
        }
        if !self.attempts.is_empty() {
            content.push_str(&format!("\nPREVIOUS_ATTEMPTS_JSON:\n{}", Value::from(self.attempts)));
        }
        content
    }
}

pub trait CardGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Card, CardError>;
}
