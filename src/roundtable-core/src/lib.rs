//! Roundtable Core Library
//!
//! Turn-taking orchestration for a spoken group discussion between a human
//! and a panel of AI personas, plus the collaborators it talks to.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod grammar;
pub mod orchestrator;
pub mod persona;
pub mod responder;
pub mod sanitize;
pub mod selector;
pub mod sentiment;
pub mod speech;
pub mod transcript;
pub mod tts;

pub use analyzer::{GrammarSuggestion, PerformanceAnalyzer, PerformanceReport};
pub use config::{Config, PersonaStyle, config_with_style, default_config};
pub use error::DiscussionError;
pub use grammar::{GrammarChecker, GrammarIssue, LanguageToolChecker};
pub use orchestrator::{
    Closing, DiscussionCallback, DiscussionEvent, DiscussionOrchestrator, Session, TurnOutcome,
    Utterance,
};
pub use persona::{Persona, PersonaRegistry};
pub use responder::{ApiEndpoint, LanguageResponder, OpenAIResponder};
pub use sanitize::Sanitizer;
pub use selector::{RandomSource, SeededRandom, ThreadRandom, TurnSelector};
pub use sentiment::{LexiconSentiment, SentimentAnalyzer, SentimentScore};
pub use speech::{
    ExclusiveRenderer, SilentRenderer, SpeechInput, SpeechRenderer, Transcriber,
    WhisperTranscriber,
};
pub use transcript::{ContextLine, Transcript, Turn, TurnRole};
pub use tts::KokoroRenderer;
