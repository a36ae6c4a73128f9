//! Voice queries: recorded audio in, transcribed prompt out.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Sorry, I could not understand the audio.")]
    Unintelligible,
    #[error("Could not request results from the speech recognition service; {0}")]
    Service(String),
}

impl From<reqwest::Error> for SpeechError {
    fn from(e: reqwest::Error) -> Self {
        SpeechError::Service(e.to_string())
    }
}

pub trait Transcriber {
    fn transcribe(
        &self,
        audio: &[u8],
        mime: &str,
    ) -> impl Future<Output = Result<String, SpeechError>> + Send;
}

/// OpenAI-compatible `/audio/transcriptions` endpoint (Whisper and friends).
#[derive(Debug, Clone)]
pub struct WhisperApi {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

fn file_name_for(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or("").trim() {
        "audio/webm" => "speech.webm",
        "audio/ogg" => "speech.ogg",
        "audio/mpeg" | "audio/mp3" => "speech.mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "speech.m4a",
        "audio/flac" => "speech.flac",
        _ => "speech.wav",
    }
}

/// An empty transcript means nothing intelligible was said.
fn interpret(text: &str) -> Result<String, SpeechError> {
    let text = text.trim();
    if text.is_empty() {
        Err(SpeechError::Unintelligible)
    } else {
        Ok(text.to_string())
    }
}

impl Transcriber for WhisperApi {
    async fn transcribe(&self, audio: &[u8], mime: &str) -> Result<String, SpeechError> {
        if audio.is_empty() {
            return Err(SpeechError::Unintelligible);
        }

        let part = Part::bytes(audio.to_vec())
            .file_name(file_name_for(mime))
            .mime_str(if mime.is_empty() { "audio/wav" } else { mime })?;
        let form = Form::new().text("model", self.model.clone()).part("file", part);

        let mut req = Client::new()
            .post(format!("{}/audio/transcriptions", self.base_url))
            .multipart(form);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(SpeechError::Service(format!("{} - {}", status, text)));
        }

        let data: TranscriptionResponse = resp.json().await?;
        let transcript = interpret(&data.text);
        match &transcript {
            Ok(text) => tracing::info!(chars = text.len(), "speech transcribed"),
            Err(e) => tracing::warn!(error = %e, "speech transcription failed"),
        }
        transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_transcript_is_unintelligible() {
        assert!(matches!(interpret("  \n"), Err(SpeechError::Unintelligible)));
        assert_eq!(interpret(" what is the total? ").unwrap(), "what is the total?");
    }

    #[test]
    fn test_file_name_follows_mime() {
        assert_eq!(file_name_for("audio/webm;codecs=opus"), "speech.webm");
        assert_eq!(file_name_for("audio/mpeg"), "speech.mp3");
        assert_eq!(file_name_for(""), "speech.wav");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SpeechError::Unintelligible.to_string(),
            "Sorry, I could not understand the audio."
        );
        assert_eq!(
            SpeechError::Service("timeout".into()).to_string(),
            "Could not request results from the speech recognition service; timeout"
        );
    }

    #[tokio::test]
    async fn test_empty_recording_short_circuits() {
        let api = WhisperApi {
            base_url: "http://127.0.0.1:9".into(),
            api_key: String::new(),
            model: "whisper-1".into(),
        };
        assert!(matches!(
            api.transcribe(&[], "audio/wav").await,
            Err(SpeechError::Unintelligible)
        ));
    }
}
