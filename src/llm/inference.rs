//! Client for a hosted question-answering / summarization service.
//!
//! The service receives the query and the document text and decides on its
//! own whether to answer extractively or to summarize; the JSON shape of the
//! reply tells which one it did.

use super::{LlmError, ModelOutput};
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    query: &'a str,
    context: &'a str,
}

pub async fn infer(
    config: &InferenceConfig,
    query: &str,
    context: &str,
) -> Result<ModelOutput, LlmError> {
    let client = Client::new();
    let mut req = client
        .post(&config.url)
        .header("Content-Type", "application/json")
        .json(&InferenceRequest { query, context });

    if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        req = req.header("Authorization", format!("Bearer {}", key));
    }

    let resp = req.send().await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status,
            message: text,
        });
    }

    let body = resp.text().await?;
    parse_output(&body)
}

fn parse_output(body: &str) -> Result<ModelOutput, LlmError> {
    serde_json::from_str(body).map_err(|e| {
        LlmError::Parse(format!("unrecognized inference response ({}): {}", e, body))
    })
}
