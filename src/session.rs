//! Per-visit session state and the actions the UI can trigger on it.
//!
//! A [`Session`] is created when the window opens and handed to every action.
//! Each action that changes the transcript writes it back to the
//! [`CURRENT_SLOT`] before returning.

use serde::Serialize;

use crate::db::models::{ChatMessage, CURRENT_SLOT, OLD_SLOT};
use crate::db::Database;
use crate::doc_processor::{self, ExtractError, ExtractedText, FailedDocument, UploadedDocument};
use crate::llm::{self, Mode, ModelService};
use crate::ocr::OcrEngine;
use crate::speech::Transcriber;

pub const NO_DOCUMENTS_NOTICE: &str = "Please upload PDFs before asking questions!";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("history store error: {0}")]
    Storage(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// Short message for the user about the outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub processed: Vec<String>,
    pub failed: Vec<FailedDocument>,
    pub notice: Notice,
}

/// What happened to a submitted prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    /// Blank prompt, nothing was done.
    Ignored,
    Answered { message: ChatMessage, mode: Mode },
    NoDocuments { notice: Notice },
    Failed { notice: Notice },
}

#[derive(Debug, Default)]
pub struct Session {
    pub messages: Vec<ChatMessage>,
    pub extracted: ExtractedText,
    pub recording: bool,
}

impl Session {
    /// Start a visit, picking up the transcript left in the current slot.
    pub fn load(db: &Database) -> Result<Self, SessionError> {
        Ok(Self {
            messages: db.load_history(CURRENT_SLOT)?,
            ..Self::default()
        })
    }

    pub fn has_documents(&self) -> bool {
        !self.extracted.is_empty()
    }

    fn persist(&self, db: &Database) -> Result<(), SessionError> {
        db.save_history(CURRENT_SLOT, &self.messages)?;
        Ok(())
    }

    /// Extract the text of an upload batch. An empty batch, or one containing
    /// any unsupported file, is rejected as a whole and leaves the session
    /// untouched. So does a batch in which no document yields text.
    pub async fn process_documents(
        &mut self,
        db: &Database,
        ocr: &impl OcrEngine,
        uploads: &[UploadedDocument],
    ) -> Result<ProcessReport, SessionError> {
        let batch = doc_processor::extract_all(uploads, ocr).await?;
        let processed: Vec<String> = batch
            .extracted
            .documents
            .iter()
            .map(|d| d.name.clone())
            .collect();

        if !batch.extracted.is_empty() {
            self.extracted = batch.extracted;
        }
        self.persist(db)?;

        let notice = if batch.failed.is_empty() {
            Notice::success("Documents processed successfully!")
        } else {
            let names: Vec<&str> = batch.failed.iter().map(|f| f.name.as_str()).collect();
            Notice::error(format!(
                "Could not extract text from: {}",
                names.join(", ")
            ))
        };
        tracing::info!(
            processed = processed.len(),
            failed = batch.failed.len(),
            "upload batch processed"
        );

        Ok(ProcessReport {
            processed,
            failed: batch.failed,
            notice,
        })
    }

    /// Clear the transcript. The archived chat and the documents stay.
    pub fn delete_history(&mut self, db: &Database) -> Result<Notice, SessionError> {
        self.messages.clear();
        self.persist(db)?;
        Ok(Notice::info("Chat history has been deleted."))
    }

    /// Archive the transcript into the old slot and start over without documents.
    pub fn start_new_chat(&mut self, db: &Database) -> Result<Notice, SessionError> {
        db.save_history(OLD_SLOT, &self.messages)?;
        self.messages.clear();
        self.extracted.clear();
        self.persist(db)?;
        tracing::info!("new chat started");
        Ok(Notice::success("New chat started. Old chat history stored!"))
    }

    pub fn restore_old_history(&mut self, db: &Database) -> Result<Notice, SessionError> {
        self.messages = db.load_history(OLD_SLOT)?;
        self.persist(db)?;
        Ok(Notice::success("Old chat history restored!"))
    }

    /// Record the user's prompt and, if documents were processed, answer it.
    /// Model failures are reported as a notice, never as an assistant turn.
    pub async fn submit_prompt(
        &mut self,
        db: &Database,
        model: &impl ModelService,
        prompt: &str,
    ) -> Result<Reply, SessionError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(Reply::Ignored);
        }

        self.messages.push(ChatMessage::user(prompt));

        let reply = if !self.has_documents() {
            Reply::NoDocuments {
                notice: Notice::error(NO_DOCUMENTS_NOTICE),
            }
        } else {
            let context = self.extracted.combined();
            match llm::route(model, prompt, &context).await {
                Ok(routed) => {
                    let message = ChatMessage::assistant(llm::clean_response(&routed.response));
                    self.messages.push(message.clone());
                    Reply::Answered {
                        message,
                        mode: routed.mode,
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "model service failed");
                    Reply::Failed {
                        notice: Notice::error(format!("The model service failed: {}", e)),
                    }
                }
            }
        };

        self.persist(db)?;
        Ok(reply)
    }

    pub fn start_recording(&mut self) {
        self.recording = true;
    }

    pub fn stop_recording(&mut self) {
        self.recording = false;
    }

    /// Transcribe a recorded question and submit it like a typed prompt.
    /// A failed transcription leaves the transcript as it was.
    pub async fn submit_voice(
        &mut self,
        db: &Database,
        transcriber: &impl Transcriber,
        model: &impl ModelService,
        audio: &[u8],
        mime: &str,
    ) -> Result<Reply, SessionError> {
        self.stop_recording();
        match transcriber.transcribe(audio, mime).await {
            Ok(prompt) => self.submit_prompt(db, model, &prompt).await,
            Err(e) => Ok(Reply::Failed {
                notice: Notice::error(e.to_string()),
            }),
        }
    }
}
