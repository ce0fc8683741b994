//! Persona definitions.
//!
//! Represents the fixed AI discussion participants and the registry that
//! holds them for the life of the process.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::DiscussionError;

/// A configured AI participant with a fixed stance and voice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Persona {
    /// Unique display name.
    pub name: String,
    /// Instruction text defining stance and conciseness.
    pub prompt_template: String,
    /// Voice identifier for the speech renderer.
    pub voice_id: String,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        prompt_template: impl Into<String>,
        voice_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prompt_template: prompt_template.into(),
            voice_id: voice_id.into(),
        }
    }
}

/// Static name-to-persona table. Populated once, never mutated.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
    lead: String,
}

impl PersonaRegistry {
    /// Build from configuration. The roster keeps the configured order.
    pub fn from_config(config: &Config) -> Result<Self, DiscussionError> {
        config.validate()?;
        let personas = config
            .personas
            .iter()
            .map(|p| Persona::new(&p.name, &p.prompt, &p.voice))
            .collect();

        Ok(Self {
            personas,
            lead: config.discussion.lead.clone(),
        })
    }

    pub fn get(&self, name: &str) -> Result<&Persona, DiscussionError> {
        self.personas
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| DiscussionError::UnknownPersona(name.to_string()))
    }

    /// The persona that opens and summarizes the discussion.
    pub fn lead(&self) -> Result<&Persona, DiscussionError> {
        self.get(&self.lead)
    }

    /// All persona names in configured order.
    pub fn roster(&self) -> Vec<&str> {
        self.personas.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }
}
