//! Error types for the discussion system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscussionError {
    #[error("No topic provided")]
    NoTopicProvided,

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Responder failed: {0}")]
    ResponderFailed(String),

    #[error("Speech rendering failed: {0}")]
    RenderFailed(String),

    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    #[error("No eligible speaker after '{last_speaker}'")]
    NoEligibleSpeaker { last_speaker: String },

    #[error("Malformed turn: {0}")]
    MalformedTurn(String),

    #[error("Session has already ended")]
    SessionEnded,

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DiscussionError {
    /// Whether this error ends the session (or its start) rather than a
    /// single step of it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DiscussionError::NoTopicProvided
                | DiscussionError::UnknownPersona(_)
                | DiscussionError::NoEligibleSpeaker { .. }
                | DiscussionError::ConfigError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors_are_not_fatal() {
        assert!(!DiscussionError::ResponderFailed("timeout".into()).is_fatal());
        assert!(!DiscussionError::RenderFailed("device busy".into()).is_fatal());
        assert!(!DiscussionError::Collaborator("stdin closed".into()).is_fatal());
    }

    #[test]
    fn test_roster_errors_are_fatal() {
        assert!(DiscussionError::NoTopicProvided.is_fatal());
        assert!(DiscussionError::UnknownPersona("Zed".into()).is_fatal());
        assert!(
            DiscussionError::NoEligibleSpeaker {
                last_speaker: "Ava".into()
            }
            .is_fatal()
        );
    }
}
