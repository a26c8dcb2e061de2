pub mod models;

use std::sync::{Mutex, MutexGuard, PoisonError};

use models::{ConversationLog, UploadedFile};

use crate::error::ValidationError;
use crate::llm::AskOutcome;

/// Everything the session shows: selection, corpus, latest answer, flags, history.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub files: Vec<UploadedFile>,
    pub corpus: String,
    pub answer: String,
    pub loading: bool,
    pub history: ConversationLog,
    pub error: Option<String>,
}

/// One state change per user action phase.
#[derive(Debug, Clone)]
pub enum Event {
    FilesSelected(Vec<UploadedFile>),
    Rejected(ValidationError),
    UploadStarted,
    UploadCompleted { corpus: String },
    UploadFailed,
    AskStarted,
    AskCompleted { question: String, outcome: AskOutcome },
}

impl AppState {
    pub fn apply(mut self, event: Event) -> Self {
        match event {
            Event::FilesSelected(files) => {
                self.files = files;
                self.error = None;
            }
            Event::Rejected(err) => {
                self.error = Some(err.to_string());
            }
            Event::UploadStarted | Event::AskStarted => {
                self.error = None;
                self.loading = true;
            }
            Event::UploadCompleted { corpus } => {
                self.corpus = corpus;
                self.loading = false;
            }
            // Corpus keeps the previous batch.
            Event::UploadFailed => {
                self.loading = false;
            }
            Event::AskCompleted { question, outcome } => {
                self.answer = outcome.display_text().to_string();
                if outcome.is_recorded() {
                    self.history.append(question, outcome.display_text());
                }
                self.loading = false;
            }
        }
        self
    }
}

/// Owns the session state; every mutation goes through [`Store::dispatch`].
///
/// The lock is only held for the transition itself, never across an await.
#[derive(Debug, Default)]
pub struct Store {
    state: Mutex<AppState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self, event: Event) {
        let mut state = self.lock();
        let current = std::mem::take(&mut *state);
        *state = current.apply(event);
    }

    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.lock())
    }

    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
