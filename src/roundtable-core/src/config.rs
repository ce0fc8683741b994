//! Configuration module for loading TOML config files.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::DiscussionError;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discussion: DiscussionSettings,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub grammar: GrammarConfig,
    pub personas: Vec<PersonaConfig>,
}

/// Turn-loop policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionSettings {
    /// Persona that opens and closes the discussion.
    pub lead: String,
    /// Speaker label recorded for the human participant.
    pub human_label: String,
    /// Speaker label for system turns (topic announcement, cues).
    pub moderator_label: String,
    /// Spoken instead of a response when the language model fails.
    pub fallback_line: String,
    /// Case-insensitive substrings that end the discussion.
    pub termination_phrases: Vec<String>,
    /// How long the input collaborator waits for the human.
    pub listen_timeout_secs: u64,
    /// Cue for the lead's opening line. `{topic}` is replaced.
    pub kickoff_template: String,
    /// Cue for the lead's closing summary.
    pub summary_prompt: String,
}

impl Default for DiscussionSettings {
    fn default() -> Self {
        Self {
            lead: "Ava".to_string(),
            human_label: "Participant".to_string(),
            moderator_label: "Moderator".to_string(),
            fallback_line: "I seem to be having trouble thinking right now. Let's try that again."
                .to_string(),
            termination_phrases: ["quit", "quiet", "exit", "stop", "end discussion", "end the conversation"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            listen_timeout_secs: 20,
            kickoff_template: "Okay team, the topic is '{topic}'. Who has an initial thought?"
                .to_string(),
            summary_prompt: DEFAULT_SUMMARY_PROMPT.to_string(),
        }
    }
}

impl DiscussionSettings {
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    pub fn kickoff_cue(&self, topic: &str) -> String {
        self.kickoff_template.replace("{topic}", topic)
    }

    /// Labels, cues, the fallback line and every termination phrase must be
    /// non-blank.
    pub fn validate(&self) -> Result<(), DiscussionError> {
        let required = [
            ("human_label", &self.human_label),
            ("moderator_label", &self.moderator_label),
            ("fallback_line", &self.fallback_line),
            ("kickoff_template", &self.kickoff_template),
            ("summary_prompt", &self.summary_prompt),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DiscussionError::ConfigError(format!(
                    "discussion.{} cannot be empty",
                    field
                )));
            }
        }

        if self
            .termination_phrases
            .iter()
            .any(|phrase| phrase.trim().is_empty())
        {
            return Err(DiscussionError::ConfigError(
                "discussion.termination_phrases cannot contain empty phrases".to_string(),
            ));
        }

        Ok(())
    }
}

/// Chat model settings for the language responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-4o-mini".to_string(),
            temperature: 0.8,
            max_tokens: 300,
            max_retries: 3,
            timeout_secs: 120,
        }
    }
}

/// Speech-to-text settings for the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub model: String,
    pub language: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Grammar checking settings for the performance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub language: String,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.languagetool.org/v2/check".to_string(),
            language: "en-US".to_string(),
        }
    }
}

/// One entry of the persona table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub name: String,
    pub voice: String,
    pub prompt: String,
}

/// Built-in persona prompt sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaStyle {
    /// One to three sentences per turn; suited to spoken back-and-forth.
    Concise,
    /// Longer, facilitator-driven turns.
    Natural,
}

impl PersonaStyle {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "concise" => Some(PersonaStyle::Concise),
            "natural" => Some(PersonaStyle::Natural),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DiscussionError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DiscussionError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Load configuration from string content.
    pub fn from_toml(content: &str) -> Result<Self, DiscussionError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| DiscussionError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the roster can satisfy the turn-taking rules.
    pub fn validate(&self) -> Result<(), DiscussionError> {
        self.discussion.validate()?;

        if self.personas.len() < 2 {
            return Err(DiscussionError::ConfigError(format!(
                "At least two personas are required, got {}",
                self.personas.len()
            )));
        }

        let mut seen = HashSet::new();
        for persona in &self.personas {
            if persona.name.trim().is_empty() {
                return Err(DiscussionError::ConfigError(
                    "Persona names cannot be empty".to_string(),
                ));
            }
            if !seen.insert(persona.name.as_str()) {
                return Err(DiscussionError::ConfigError(format!(
                    "Duplicate persona '{}'",
                    persona.name
                )));
            }
        }

        if !seen.contains(self.discussion.lead.as_str()) {
            return Err(DiscussionError::ConfigError(format!(
                "Lead persona '{}' is not in the roster",
                self.discussion.lead
            )));
        }

        if seen.contains(self.discussion.human_label.as_str()) {
            return Err(DiscussionError::ConfigError(format!(
                "Human label '{}' collides with a persona name",
                self.discussion.human_label
            )));
        }

        Ok(())
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    config_with_style(PersonaStyle::Concise)
}

/// Default configuration using the given persona prompt set.
pub fn config_with_style(style: PersonaStyle) -> Config {
    let prompts = match style {
        PersonaStyle::Concise => CONCISE_PROMPTS,
        PersonaStyle::Natural => NATURAL_PROMPTS,
    };

    Config {
        discussion: DiscussionSettings::default(),
        model: ModelConfig::default(),
        transcription: TranscriptionConfig::default(),
        grammar: GrammarConfig::default(),
        personas: DEFAULT_VOICES
            .iter()
            .zip(prompts.iter())
            .map(|((name, voice), prompt)| PersonaConfig {
                name: name.to_string(),
                voice: voice.to_string(),
                prompt: prompt.to_string(),
            })
            .collect(),
    }
}

const DEFAULT_VOICES: [(&str, &str); 4] = [
    ("Ava", "af_sky"),
    ("Milo", "bm_george"),
    ("Ray", "am_adam"),
    ("Nova", "bf_emma"),
];

const CONCISE_PROMPTS: [&str; 4] = [
    "You are Ava, the team lead. Your responses must be VERY CONCISE (1-2 sentences). You guide the conversation and summarize conflicts.",
    "You are Milo, an optimist. Proactively argue for ADVANTAGES. Keep your points VERY CONCISE (2-3 sentences max).",
    "You are Ray, a pragmatist. Proactively argue for DISADVANTAGES. Your arguments must be VERY CONCISE (2-3 sentences max).",
    "You are Nova, the user advocate. Analyze the HUMAN IMPACT of the arguments. Keep your analysis VERY CONCISE (2-3 sentences max).",
];

const NATURAL_PROMPTS: [&str; 4] = [
    "You are Ava, the team lead. Act as a facilitator. Guide the conversation, summarize conflicts, and pose questions to resolve differences, but do it naturally, like a real manager.",
    "You are Milo, an optimistic strategist. Proactively argue for the ADVANTAGES of the topic. Be enthusiastic and focus on innovation. If Ray or the user raises a concern, passionately counter it with a positive perspective without being asked.",
    "You are Ray, a pragmatic analyst. Proactively argue for the DISADVANTAGES of the topic. Be a polite but firm critical thinker. Ground the conversation in data and problems. If Milo or the user is optimistic, challenge them with a realistic concern.",
    "You are Nova, the user advocate. You analyze the arguments from Milo and Ray and comment on the HUMAN IMPACT. You don't take sides. Translate their points into how real people would be affected, using phrases like 'Listening to Ray and Milo, I'm thinking about...'",
];

const DEFAULT_SUMMARY_PROMPT: &str = "The discussion is over. As the team lead, summarize the core conflict. Importantly, ALSO SUMMARIZE the key points the human 'Participant' made and how they influenced the discussion. Keep it concise.";
