pub mod gemini;

use async_trait::async_trait;

pub const NO_ANSWER_TEXT: &str = "No relevant answer found.";
pub const ERROR_TEXT: &str = "Error retrieving answer.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub delta: String,
    pub done: bool,
}

/// Result of one ask: keeps "the model had nothing to say" apart from
/// "the call failed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    Answered(String),
    NoAnswer,
    Failed(String),
}

impl AskOutcome {
    pub fn from_result(result: Result<Option<String>, LlmError>) -> Self {
        match result {
            Ok(Some(answer)) => AskOutcome::Answered(answer),
            Ok(None) => AskOutcome::NoAnswer,
            Err(e) => AskOutcome::Failed(e.to_string()),
        }
    }

    /// Text shown to the user for this outcome.
    pub fn display_text(&self) -> &str {
        match self {
            AskOutcome::Answered(answer) => answer,
            AskOutcome::NoAnswer => NO_ANSWER_TEXT,
            AskOutcome::Failed(_) => ERROR_TEXT,
        }
    }

    /// Whether the exchange goes into the conversation log. Failed calls do not.
    pub fn is_recorded(&self) -> bool {
        !matches!(self, AskOutcome::Failed(_))
    }
}

/// Remote question answering: prompt in, answer text out.
///
/// `Ok(None)` means the response was well formed but carried no answer text.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, LlmError>;

    async fn generate_stream(
        &self,
        prompt: &str,
        on_chunk: &(dyn Fn(StreamChunk) + Send + Sync),
    ) -> Result<Option<String>, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for LlmError {
    /// The request URL carries the API key, so it never reaches the message.
    fn from(e: reqwest::Error) -> Self {
        LlmError::Http(e.without_url())
    }
}
