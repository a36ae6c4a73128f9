//! Optical character recognition for uploaded images.
//!
//! Recognition is delegated to the external `tesseract` binary, fed the image
//! on stdin and read back from stdout.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("could not start OCR engine `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("OCR engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Turns image bytes into recognized text.
pub trait OcrEngine {
    fn recognize(&self, image: &[u8]) -> impl Future<Output = Result<String, OcrError>> + Send;
}

#[derive(Debug, Clone)]
pub struct Tesseract {
    pub command: PathBuf,
    pub language: Option<String>,
}

impl Default for Tesseract {
    fn default() -> Self {
        Self {
            command: PathBuf::from("tesseract"),
            language: None,
        }
    }
}

impl Tesseract {
    fn spawn_error(&self, source: std::io::Error) -> OcrError {
        OcrError::Spawn {
            command: self.command.display().to_string(),
            source,
        }
    }
}

impl OcrEngine for Tesseract {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("stdin").arg("stdout");
        if let Some(lang) = &self.language {
            cmd.arg("-l").arg(lang);
        }

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image)
                .await
                .map_err(|e| self.spawn_error(e))?;
            // Closing stdin tells tesseract the image is complete.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
