//! Speech collaborators: rendering text to audio, capturing the human's
//! words, and transcribing uploaded audio.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::TranscriptionConfig;
use crate::error::DiscussionError;
use crate::responder::ApiEndpoint;

/// External text-to-speech collaborator.
#[async_trait]
pub trait SpeechRenderer: Send + Sync {
    /// Render `text` in the given voice. An empty buffer means the renderer
    /// produced no audio to hand back (e.g. it played locally).
    async fn render(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, DiscussionError>;
}

/// External speech-input collaborator.
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Wait up to `timeout` for the human. `Ok(None)` means nothing was
    /// said in time.
    async fn capture(
        &self,
        prompt: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<String>, DiscussionError>;
}

/// Audio-to-text collaborator used by the HTTP service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, DiscussionError>;
}

/// Serializes access to a shared output device: only one rendering runs at
/// a time, across every session holding a clone.
pub struct ExclusiveRenderer {
    inner: Arc<dyn SpeechRenderer>,
    device: Arc<Mutex<()>>,
}

impl ExclusiveRenderer {
    pub fn new(inner: Arc<dyn SpeechRenderer>) -> Self {
        Self {
            inner,
            device: Arc::new(Mutex::new(())),
        }
    }
}

impl Clone for ExclusiveRenderer {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            device: Arc::clone(&self.device),
        }
    }
}

#[async_trait]
impl SpeechRenderer for ExclusiveRenderer {
    async fn render(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, DiscussionError> {
        let _device = self.device.lock().await;
        self.inner.render(text, voice_id).await
    }
}

/// Text-only mode: renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentRenderer;

#[async_trait]
impl SpeechRenderer for SilentRenderer {
    async fn render(&self, _text: &str, _voice_id: &str) -> Result<Vec<u8>, DiscussionError> {
        Ok(Vec::new())
    }
}

/// Transcription through an OpenAI-compatible `/audio/transcriptions`
/// endpoint.
pub struct WhisperTranscriber {
    client: reqwest::Client,
    endpoint: ApiEndpoint,
    config: TranscriptionConfig,
}

impl WhisperTranscriber {
    pub fn new(endpoint: ApiEndpoint, config: TranscriptionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            config,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, DiscussionError> {
        if audio.is_empty() {
            return Err(DiscussionError::TranscriptionFailed(
                "empty audio upload".to_string(),
            ));
        }

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))
            .map_err(|e| DiscussionError::TranscriptionFailed(format!("MIME error: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone());

        let url = format!(
            "{}/audio/transcriptions",
            self.endpoint.api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.endpoint.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                DiscussionError::TranscriptionFailed(format!("HTTP request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DiscussionError::TranscriptionFailed(format!(
                "API returned {status}: {body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DiscussionError::TranscriptionFailed(format!("JSON parse error: {e}")))?;

        let text = json["text"].as_str().unwrap_or("").trim().to_string();
        if text.is_empty() {
            return Err(DiscussionError::TranscriptionFailed(
                "no speech recognized".to_string(),
            ));
        }
        Ok(text)
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "webm" => "audio/webm",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "audio/wav",
    }
}
