//! Local text-to-speech using kokoro-tiny.

use async_trait::async_trait;
use kokoro_tiny::TtsEngine;
use std::sync::{Arc, Mutex};

use crate::error::DiscussionError;
use crate::persona::Persona;
use crate::speech::SpeechRenderer;

/// Kokoro output sample rate.
pub const SAMPLE_RATE: u32 = 24_000;

/// Speech renderer backed by an in-process kokoro engine. Returns WAV bytes.
pub struct KokoroRenderer {
    engine: Arc<Mutex<TtsEngine>>,
    available_voices: Vec<String>,
}

impl KokoroRenderer {
    /// Initialize the TTS engine (downloads model on first run).
    pub async fn new() -> Result<Self, DiscussionError> {
        let engine = TtsEngine::new()
            .await
            .map_err(|e| DiscussionError::RenderFailed(format!("Failed to initialize TTS: {}", e)))?;

        let available_voices = engine.voices();

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            available_voices,
        })
    }

    pub fn available_voices(&self) -> &[String] {
        &self.available_voices
    }

    /// Validate that a voice ID exists.
    pub fn validate_voice(&self, voice_id: &str) -> Result<(), DiscussionError> {
        if voice_id.is_empty() || !self.available_voices.iter().any(|v| v == voice_id) {
            return Err(DiscussionError::ConfigError(format!(
                "Unknown voice '{}'. Available voices:\n{}",
                voice_id,
                self.format_available_voices()
            )));
        }
        Ok(())
    }

    /// Validate the voice of every persona in the roster.
    pub fn validate_personas(&self, personas: &[Persona]) -> Result<(), DiscussionError> {
        personas
            .iter()
            .try_for_each(|p| self.validate_voice(&p.voice_id))
    }

    fn format_available_voices(&self) -> String {
        let mut english_voices: Vec<&String> = self
            .available_voices
            .iter()
            .filter(|v| {
                v.starts_with("af_")
                    || v.starts_with("am_")
                    || v.starts_with("bf_")
                    || v.starts_with("bm_")
            })
            .collect();
        english_voices.sort();

        english_voices
            .iter()
            .map(|v| format!("  - {}", v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Synthesize text in chunks; kokoro has a strict input length limit.
fn synthesize(
    engine: &Mutex<TtsEngine>,
    text: &str,
    voice_id: &str,
) -> Result<Vec<f32>, DiscussionError> {
    let mut engine = engine
        .lock()
        .map_err(|_| DiscussionError::RenderFailed("TTS engine lock poisoned".to_string()))?;

    let mut all_samples = Vec::new();
    for chunk in split_into_chunks(text, 200) {
        let samples = engine
            .synthesize(&chunk, Some(voice_id))
            .map_err(|e| DiscussionError::RenderFailed(format!("Synthesis failed: {}", e)))?;
        all_samples.extend(samples);
        // 0.3s pause between chunks
        all_samples.extend(std::iter::repeat_n(0.0, 7_200));
    }

    Ok(all_samples)
}

#[async_trait]
impl SpeechRenderer for KokoroRenderer {
    async fn render(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, DiscussionError> {
        if !self.available_voices.iter().any(|v| v == voice_id) {
            return Err(DiscussionError::RenderFailed(format!("Unknown voice '{}'", voice_id)));
        }
        let engine = Arc::clone(&self.engine);
        let text = text.to_string();
        let voice_id = voice_id.to_string();
        render_off_thread(move || synthesize(&engine, &text, &voice_id)).await
    }
}

/// Synthesis and WAV encoding are CPU-bound; run them on the blocking pool.
async fn render_off_thread<F>(job: F) -> Result<Vec<u8>, DiscussionError>
where
    F: FnOnce() -> Result<Vec<f32>, DiscussionError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let samples = job()?;
        encode_wav(&samples, SAMPLE_RATE)
    })
    .await
    .map_err(|e| DiscussionError::RenderFailed(format!("Synthesis task failed: {}", e)))?
}

/// Encode mono f32 samples as 16-bit PCM WAV bytes.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, DiscussionError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| DiscussionError::RenderFailed(format!("WAV write error: {}", e)))?;
        for &sample in samples {
            let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(pcm)
                .map_err(|e| DiscussionError::RenderFailed(format!("WAV sample error: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| DiscussionError::RenderFailed(format!("WAV finalize error: {}", e)))?;
    }
    Ok(cursor.into_inner())
}

/// Split text into chunks that are safe for TTS synthesis.
fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current_chunk = String::new();

    for sentence in text.split_inclusive(&['.', '!', '?', ';'][..]) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if current_chunk.len() + sentence.len() > max_chars {
            flush(&mut current_chunk, &mut chunks);

            // A single overlong sentence is split on commas
            if sentence.len() > max_chars {
                for part in sentence.split_inclusive(',') {
                    if current_chunk.len() + part.len() > max_chars {
                        flush(&mut current_chunk, &mut chunks);
                    }
                    current_chunk.push_str(part);
                    current_chunk.push(' ');
                }
                continue;
            }
        }

        current_chunk.push_str(sentence);
        current_chunk.push(' ');
    }

    flush(&mut current_chunk, &mut chunks);
    chunks
}

fn flush(chunk: &mut String, chunks: &mut Vec<String>) {
    if !chunk.trim().is_empty() {
        chunks.push(chunk.trim().to_string());
    }
    chunk.clear();
}

/// File name for one rendered utterance.
pub fn utterance_filename(index: usize, speaker: &str) -> String {
    let sanitized: String = speaker
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(32)
        .collect();
    format!("{:03}-{}.wav", index, sanitized)
}
