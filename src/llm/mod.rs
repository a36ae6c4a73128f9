pub mod claude;
pub mod inference;
pub mod openai;

use serde::{Deserialize, Serialize};
use std::future::Future;

/// How the model service treated a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Summarizer,
    ExtractiveQa,
}

const SUMMARY_CUES: &[&str] = &[
    "summar",
    "overview",
    "tl;dr",
    "tldr",
    "gist",
    "main points",
    "key points",
    "what is this document about",
    "what's this document about",
];

impl Mode {
    /// Mode used by chat backends that do not choose one themselves.
    pub fn for_query(query: &str) -> Self {
        let query = query.to_lowercase();
        if SUMMARY_CUES.iter().any(|cue| query.contains(cue)) {
            Mode::Summarizer
        } else {
            Mode::ExtractiveQa
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySegment {
    #[serde(alias = "text")]
    pub summary_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractiveAnswer {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

/// What a model service returned, one variant per response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelOutput {
    Summary(Vec<SummarySegment>),
    Answer(ExtractiveAnswer),
}

impl ModelOutput {
    pub fn mode(&self) -> Mode {
        match self {
            ModelOutput::Summary(_) => Mode::Summarizer,
            ModelOutput::Answer(_) => Mode::ExtractiveQa,
        }
    }

    /// Flatten to the string shown in the chat.
    pub fn into_text(self) -> String {
        match self {
            ModelOutput::Summary(segments) => segments
                .into_iter()
                .map(|s| s.summary_text)
                .collect::<Vec<_>>()
                .join(" "),
            ModelOutput::Answer(answer) => answer.answer,
        }
    }
}

/// A backend answering questions about, or summarizing, a body of text.
pub trait ModelService {
    fn infer(
        &self,
        query: &str,
        context: &str,
    ) -> impl Future<Output = Result<ModelOutput, LlmError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Routed {
    pub response: String,
    pub mode: Mode,
}

/// Ask `service` about `context` and normalize whatever shape comes back.
/// `context` must not be empty; callers check that before routing.
pub async fn route(
    service: &impl ModelService,
    query: &str,
    context: &str,
) -> Result<Routed, LlmError> {
    let output = service.infer(query, context).await?;
    let mode = output.mode();
    tracing::info!(?mode, "model service responded");
    Ok(Routed {
        response: output.into_text(),
        mode,
    })
}

/// Tidy model output for display: collapse runs of blanks inside a line,
/// drop blanks in front of punctuation, keep at most one empty line between
/// paragraphs. Leading indentation is kept so nested lists and code survive.
pub fn clean_response(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;

    for raw in text.lines() {
        let body = raw.trim_start();
        let mut line = String::with_capacity(raw.len());
        line.push_str(&raw[..raw.len() - body.len()]);
        let indent = line.len();
        for word in body.split_whitespace() {
            let attaches = word.starts_with(['.', ',', ';', ':', '!', '?']);
            if line.len() > indent && !attaches {
                line.push(' ');
            }
            line.push_str(word);
        }

        if line.len() == indent {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            line.clear();
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    let joined = lines.join("\n");
    joined.trim_end().trim_start_matches('\n').to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub messages: Vec<PromptMessage>,
    pub model: String,
}

impl ChatRequest {
    /// Build the prompt asking a chat model to act as a summarizer or an
    /// extractive reader over `context`.
    pub fn for_document(model: &str, mode: Mode, query: &str, context: &str) -> Self {
        let system = match mode {
            Mode::Summarizer => {
                "You summarize documents. Write a short, faithful summary of the \
                 document below, focused on what the user asks for. Do not add facts \
                 that are not in the document."
            }
            Mode::ExtractiveQa => {
                "You answer questions by quoting the document. Reply only with the \
                 shortest span copied verbatim from the document that answers the \
                 question, without any other words."
            }
        };
        Self {
            messages: vec![
                PromptMessage {
                    role: "system".into(),
                    content: system.into(),
                },
                PromptMessage {
                    role: "user".into(),
                    content: format!("Document:\n{}\n\nQuestion: {}", context, query),
                },
            ],
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
}

/// Unified model backend. Dispatches to the hosted QA/summarization service
/// or to an OpenAI-compatible or Claude chat model.
#[derive(Debug, Clone)]
pub enum Provider {
    Inference(inference::InferenceConfig),
    OpenAi {
        config: openai::OpenAiConfig,
        model: String,
    },
    Claude {
        config: claude::ClaudeConfig,
        model: String,
    },
    Ollama {
        config: openai::OpenAiConfig,
        model: String,
    },
}

impl Provider {
    pub fn ollama(host: &str, model: String) -> Self {
        Provider::Ollama {
            config: openai::OpenAiConfig {
                api_key: String::new(),
                base_url: format!("{}/v1", host.trim_end_matches('/')),
            },
            model,
        }
    }
}

fn chat_output(mode: Mode, content: String) -> ModelOutput {
    match mode {
        Mode::Summarizer => ModelOutput::Summary(vec![SummarySegment {
            summary_text: content,
        }]),
        Mode::ExtractiveQa => ModelOutput::Answer(ExtractiveAnswer {
            answer: content.trim().to_string(),
            score: None,
            start: None,
            end: None,
        }),
    }
}

impl ModelService for Provider {
    async fn infer(&self, query: &str, context: &str) -> Result<ModelOutput, LlmError> {
        let mode = Mode::for_query(query);
        let content = match self {
            Provider::Inference(config) => return inference::infer(config, query, context).await,
            Provider::OpenAi { config, model } | Provider::Ollama { config, model } => {
                let request = ChatRequest::for_document(model, mode, query, context);
                openai::chat(config, &request).await?
            }
            Provider::Claude { config, model } => {
                let request = ChatRequest::for_document(model, mode, query, context);
                claude::chat(config, &request).await?
            }
        };
        Ok(chat_output(mode, content))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}
