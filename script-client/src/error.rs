use shared_types::{ErrorKind, QuestionId};

/// A raw question that could not be brought into the canonical shape
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Question payload is not an object")]
    NotAnObject,

    #[error("Question is missing an id")]
    MissingId,

    #[error("Question id has unsupported type: {0}")]
    InvalidId(String),

    #[error("Question {0} is missing main_question")]
    MissingMainQuestion(QuestionId),

    #[error("Question {id} has invalid {field}: {value}")]
    InvalidControl {
        id: QuestionId,
        field: &'static str,
        value: String,
    },

    #[error("Duplicate question id: {0}")]
    DuplicateId(QuestionId),
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum ScriptError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Question not found: {0}")]
    NotFound(QuestionId),

    #[error("Invalid draft: {0}")]
    InvalidDraft(String),

    #[error("Another generation or save is already in flight")]
    Busy,

    #[error("Confirmation for question {0} was superseded")]
    Superseded(QuestionId),
}

impl ScriptError {
    /// The error-slot kind this failure is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::Network(_) => ErrorKind::Network,
            Self::Validation(_)
            | Self::NotFound(_)
            | Self::InvalidDraft(_)
            | Self::Busy
            | Self::Superseded(_) => ErrorKind::Validation,
        }
    }
}

impl From<reqwest::Error> for ScriptError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ScriptError::Validation(format!("Failed to parse JSON: {e}"))
        } else {
            ScriptError::Network(format!("Request failed: {e}"))
        }
    }
}
