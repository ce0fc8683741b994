//! Append-only discussion transcript.

use serde::{Deserialize, Serialize};

use crate::error::DiscussionError;

/// Who produced a turn, semantically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Moderator,
    Human,
    Persona,
}

/// One recorded utterance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: TurnRole,
    pub speaker_name: String,
    pub content: String,
}

impl Turn {
    pub fn new(role: TurnRole, speaker_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role,
            speaker_name: speaker_name.into(),
            content: content.into(),
        }
    }

    pub fn moderator(speaker_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(TurnRole::Moderator, speaker_name, content)
    }

    pub fn human(speaker_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(TurnRole::Human, speaker_name, content)
    }

    pub fn persona(speaker_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(TurnRole::Persona, speaker_name, content)
    }

    fn validate(&self) -> Result<(), DiscussionError> {
        if self.speaker_name.trim().is_empty() {
            return Err(DiscussionError::MalformedTurn("missing speaker".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(DiscussionError::MalformedTurn(format!(
                "empty content from {}",
                self.speaker_name
            )));
        }
        Ok(())
    }
}

/// A turn as the language responder sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextLine {
    pub role: TurnRole,
    pub speaker_label: String,
    pub text: String,
}

impl ContextLine {
    /// `[speaker]: text`, the form every turn takes in model context.
    pub fn rendered(&self) -> String {
        format!("[{}]: {}", self.speaker_label, self.text)
    }
}

/// Ordered log of turns. Turns can be appended but never edited or removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) -> Result<(), DiscussionError> {
        turn.validate()?;
        self.turns.push(turn);
        Ok(())
    }

    /// Read-only ordered copy of the turns.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Build model context from the current snapshot.
    pub fn context(&self) -> Vec<ContextLine> {
        self.turns
            .iter()
            .map(|t| ContextLine {
                role: t.role,
                speaker_label: t.speaker_name.clone(),
                text: t.content.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::moderator("Moderator", "The topic is: 'Remote work'.")).unwrap();
        transcript.append(Turn::persona("Ava", "Who has an initial thought?")).unwrap();
        transcript.append(Turn::human("Participant", "I love it.")).unwrap();

        let snapshot = transcript.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].speaker_name, "Moderator");
        assert_eq!(snapshot[1].speaker_name, "Ava");
        assert_eq!(snapshot[2].role, TurnRole::Human);
    }

    #[test]
    fn test_rejects_malformed_turns() {
        let mut transcript = Transcript::new();
        assert!(matches!(
            transcript.append(Turn::persona("", "hello")),
            Err(DiscussionError::MalformedTurn(_))
        ));
        assert!(matches!(
            transcript.append(Turn::persona("Milo", "   ")),
            Err(DiscussionError::MalformedTurn(_))
        ));
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_snapshot_length_counts_successful_appends() {
        let mut transcript = Transcript::new();
        let mut ok = 0;
        for (i, content) in ["one", "", "two", " ", "three"].iter().enumerate() {
            if transcript.append(Turn::human(format!("P{i}"), *content)).is_ok() {
                ok += 1;
            }
        }
        assert_eq!(transcript.snapshot().len(), ok);
        assert_eq!(ok, 3);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::persona("Ray", "Costs matter.")).unwrap();
        let before = transcript.snapshot();
        transcript.append(Turn::persona("Nova", "People matter.")).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_context_lines_render_with_labels() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::persona("Milo", "Innovation wins.")).unwrap();
        let context = transcript.context();
        assert_eq!(context[0].rendered(), "[Milo]: Innovation wins.");
    }
}
