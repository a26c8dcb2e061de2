use crate::error::ValidationError;
use crate::llm::{AnswerService, AskOutcome, StreamChunk};
use crate::prompt::build_prompt;
use crate::state::{Event, Store};

/// Ask one question about the current corpus.
///
/// Only validation problems are returned as errors. A failed remote call is
/// logged and comes back as [`AskOutcome::Failed`].
pub async fn ask(
    store: &Store,
    service: &dyn AnswerService,
    question: &str,
) -> Result<AskOutcome, ValidationError> {
    let prompt = begin(store, question)?;
    let result = service.generate(&prompt).await;
    Ok(finish(store, question, result))
}

/// Same as [`ask`], forwarding partial answer text to `on_chunk` as it arrives.
pub async fn ask_streaming(
    store: &Store,
    service: &dyn AnswerService,
    question: &str,
    on_chunk: &(dyn Fn(StreamChunk) + Send + Sync),
) -> Result<AskOutcome, ValidationError> {
    let prompt = begin(store, question)?;
    let result = service.generate_stream(&prompt, on_chunk).await;
    Ok(finish(store, question, result))
}

fn begin(store: &Store, question: &str) -> Result<String, ValidationError> {
    let corpus = store.read(|s| s.corpus.clone());
    let rejection = if corpus.is_empty() {
        Some(ValidationError::NoDocument)
    } else if question.trim().is_empty() {
        Some(ValidationError::EmptyQuestion)
    } else {
        None
    };
    if let Some(err) = rejection {
        store.dispatch(Event::Rejected(err.clone()));
        return Err(err);
    }

    store.dispatch(Event::AskStarted);
    tracing::info!("Loading...");
    Ok(build_prompt(&corpus, question))
}

fn finish(
    store: &Store,
    question: &str,
    result: Result<Option<String>, crate::llm::LlmError>,
) -> AskOutcome {
    if let Err(e) = &result {
        tracing::error!("Error fetching answer: {}", e);
    }
    let outcome = AskOutcome::from_result(result);
    store.dispatch(Event::AskCompleted {
        question: question.to_string(),
        outcome: outcome.clone(),
    });
    outcome
}
