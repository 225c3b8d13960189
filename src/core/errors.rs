use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("{0}")]
    Validation(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("AnkiConnect error for {action}: {message}")]
    Store { action: String, message: String },

    #[error("TTS error: {0}")]
    Synthesis(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Selection aborted")]
    SelectionAbort,

    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CardError {
    pub fn store(action: &str, message: impl ToString) -> Self {
        CardError::Store { action: action.to_string(), message: message.to_string() }
    }

    /// Whether a session turn can report this error and carry on with the next line.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CardError::Config(_) | CardError::Io(_))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CardError::SelectionAbort => 0,
            CardError::Config(_) => 2,
            CardError::Validation(_) => 3,
            CardError::Generation(_) => 4,
            CardError::Store { .. } => 5,
            CardError::Synthesis(_) => 6,
            CardError::Io(_) | CardError::Json(_) => 1,
        }
    }
}

impl From<std::io::Error> for CardError {
    fn from(error: std::io::Error) -> Self {
        CardError::Io(Box::new(error))
    }
}
