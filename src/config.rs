//! Application settings, stored as key/value rows next to the chat history.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::db::Database;
use crate::llm::claude::ClaudeConfig;
use crate::llm::inference::InferenceConfig;
use crate::llm::openai::OpenAiConfig;
use crate::llm::{ModelInfo, Provider};
use crate::ocr::Tesseract;
use crate::speech::WhisperApi;

pub const SETTING_KEYS: &[&str] = &[
    "default_model",
    "inference_url",
    "inference_api_key",
    "openai_api_key",
    "openai_base_url",
    "claude_api_key",
    "claude_base_url",
    "ollama_host",
    "tesseract_cmd",
    "ocr_language",
    "speech_base_url",
    "speech_api_key",
    "speech_model",
];

pub const DEFAULT_MODEL: &str = "inference";
const DEFAULT_INFERENCE_URL: &str = "http://localhost:8000/qa";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
const DEFAULT_SPEECH_MODEL: &str = "whisper-1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not configured")]
    MissingSetting(&'static str),
    #[error("Unknown setting key: {0}")]
    UnknownKey(String),
    #[error("settings store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Every setting, already resolved against its default.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn load(db: &Database) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for key in SETTING_KEYS {
            if let Some(value) = db.get_setting(key)? {
                if !value.trim().is_empty() {
                    values.insert(key.to_string(), value);
                }
            }
        }
        Ok(Self { values })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingSetting(key))
    }

    pub fn default_model(&self) -> &str {
        self.get_or("default_model", DEFAULT_MODEL)
    }

    /// Resolve a model id like "openai/gpt-4o", "claude/...", "ollama/..." or
    /// "inference" into a backend.
    pub fn provider(&self, model: &str) -> Result<Provider, ConfigError> {
        if model == DEFAULT_MODEL {
            Ok(Provider::Inference(InferenceConfig {
                url: self.get_or("inference_url", DEFAULT_INFERENCE_URL).to_string(),
                api_key: self.get("inference_api_key").map(str::to_string),
            }))
        } else if let Some(model_id) = model.strip_prefix("ollama/") {
            let host = self.get_or("ollama_host", DEFAULT_OLLAMA_HOST);
            Ok(Provider::ollama(host, model_id.to_string()))
        } else if let Some(model_id) = model.strip_prefix("claude/") {
            Ok(Provider::Claude {
                config: ClaudeConfig {
                    api_key: self.require("claude_api_key")?.to_string(),
                    base_url: self
                        .get_or("claude_base_url", DEFAULT_CLAUDE_BASE_URL)
                        .to_string(),
                },
                model: model_id.to_string(),
            })
        } else {
            let model_id = model.strip_prefix("openai/").unwrap_or(model);
            Ok(Provider::OpenAi {
                config: OpenAiConfig {
                    api_key: self.require("openai_api_key")?.to_string(),
                    base_url: self
                        .get_or("openai_base_url", DEFAULT_OPENAI_BASE_URL)
                        .to_string(),
                },
                model: model_id.to_string(),
            })
        }
    }

    pub fn ocr(&self) -> Tesseract {
        Tesseract {
            command: PathBuf::from(self.get_or("tesseract_cmd", "tesseract")),
            language: self.get("ocr_language").map(str::to_string),
        }
    }

    /// Speech settings fall back to the OpenAI ones when not set separately.
    pub fn transcriber(&self) -> Result<WhisperApi, ConfigError> {
        let api_key = self
            .get("speech_api_key")
            .or_else(|| self.get("openai_api_key"))
            .ok_or(ConfigError::MissingSetting("speech_api_key"))?;
        let base_url = self
            .get("speech_base_url")
            .or_else(|| self.get("openai_base_url"))
            .unwrap_or(DEFAULT_OPENAI_BASE_URL);
        Ok(WhisperApi {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            model: self.get_or("speech_model", DEFAULT_SPEECH_MODEL).to_string(),
        })
    }

    /// Models selectable with the current settings.
    pub fn available_models(&self) -> Vec<ModelInfo> {
        let mut models = vec![ModelInfo {
            id: DEFAULT_MODEL.into(),
            name: "Document QA / Summarizer".into(),
            provider: "Inference service".into(),
        }];

        if self.get("openai_api_key").is_some() {
            models.extend([
                ModelInfo {
                    id: "openai/gpt-4o".into(),
                    name: "GPT-4o".into(),
                    provider: "OpenAI".into(),
                },
                ModelInfo {
                    id: "openai/gpt-4o-mini".into(),
                    name: "GPT-4o Mini".into(),
                    provider: "OpenAI".into(),
                },
            ]);
        }

        if self.get("claude_api_key").is_some() {
            models.push(ModelInfo {
                id: "claude/claude-sonnet-4-20250514".into(),
                name: "Claude Sonnet 4".into(),
                provider: "Anthropic".into(),
            });
        }

        // Ollama models are local and always listed.
        models.extend([
            ModelInfo {
                id: "ollama/llama3".into(),
                name: "Llama 3".into(),
                provider: "Ollama".into(),
            },
            ModelInfo {
                id: "ollama/qwen2.5".into(),
                name: "Qwen 2.5".into(),
                provider: "Ollama".into(),
            },
        ]);

        models
    }
}

pub fn check_key(key: &str) -> Result<(), ConfigError> {
    if SETTING_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(ConfigError::UnknownKey(key.to_string()))
    }
}

/// Hide the middle of API keys before sending settings to the UI.
pub fn mask(key: &str, value: &str) -> String {
    if key.ends_with("_api_key") && value.chars().count() > 8 {
        let chars: Vec<char> = value.chars().collect();
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        value.to_string()
    }
}
