//! Post-discussion feedback on the human participant.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::grammar::{GrammarChecker, GrammarIssue};
use crate::sentiment::{SentimentAnalyzer, tokenize};

/// A suggested fix for one fragment of what the human said.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GrammarSuggestion {
    pub original: String,
    pub correction: String,
    pub message: String,
}

/// Aggregated feedback over every human turn.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceReport {
    pub grammar: Vec<GrammarSuggestion>,
    /// Mean polarity across utterances.
    pub sentiment: f32,
    /// Mean subjectivity across utterances.
    pub subjectivity: f32,
    pub words: usize,
    pub interventions: usize,
}

/// Aggregates grammar and sentiment results per utterance.
pub struct PerformanceAnalyzer {
    grammar: Option<Arc<dyn GrammarChecker>>,
    sentiment: Arc<dyn SentimentAnalyzer>,
}

impl PerformanceAnalyzer {
    pub fn new(sentiment: Arc<dyn SentimentAnalyzer>) -> Self {
        Self {
            grammar: None,
            sentiment,
        }
    }

    pub fn with_grammar(mut self, grammar: Arc<dyn GrammarChecker>) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// `None` when the human never spoke. Collaborator failures drop that
    /// utterance's contribution from the affected metric only.
    pub async fn analyze(&self, utterances: &[String]) -> Option<PerformanceReport> {
        if utterances.is_empty() {
            return None;
        }

        let mut grammar = Vec::new();
        let mut polarity = 0.0;
        let mut subjectivity = 0.0;
        let mut scored = 0usize;
        let mut words = 0;

        for text in utterances {
            if let Some(checker) = &self.grammar {
                match checker.check(text).await {
                    Ok(issues) => grammar.extend(issues.iter().map(|i| suggestion(text, i))),
                    Err(e) => warn!("Skipping grammar check for one utterance: {e}"),
                }
            }

            match self.sentiment.analyze(text).await {
                Ok(score) => {
                    polarity += score.polarity;
                    subjectivity += score.subjectivity;
                    scored += 1;
                }
                Err(e) => warn!("Skipping sentiment for one utterance: {e}"),
            }

            words += tokenize(text).len();
        }

        let mean = |total: f32| if scored > 0 { total / scored as f32 } else { 0.0 };

        Some(PerformanceReport {
            grammar,
            sentiment: mean(polarity),
            subjectivity: mean(subjectivity),
            words,
            interventions: utterances.len(),
        })
    }
}

fn suggestion(text: &str, issue: &GrammarIssue) -> GrammarSuggestion {
    // LanguageTool offsets count UTF-16 code units.
    let units: Vec<u16> = text.encode_utf16().collect();
    let start = issue.offset.min(units.len());
    let end = issue.offset.saturating_add(issue.length).min(units.len());
    let original = String::from_utf16_lossy(&units[start..end]);
    GrammarSuggestion {
        original,
        correction: issue.replacement.clone().unwrap_or_else(|| "N/A".to_string()),
        message: issue.message.clone(),
    }
}

pub fn sentiment_label(sentiment: f32) -> &'static str {
    if sentiment > 0.1 {
        "Positive"
    } else if sentiment < -0.1 {
        "Negative"
    } else {
        "Neutral"
    }
}

pub fn tone_label(subjectivity: f32) -> &'static str {
    if subjectivity > 0.5 {
        "Passionate / Opinion-based"
    } else {
        "Analytical / Fact-based"
    }
}

impl PerformanceReport {
    /// Actionable suggestions derived from fixed thresholds.
    pub fn coaching(&self) -> Vec<(&'static str, &'static str)> {
        let mut notes = Vec::new();

        if self.interventions < 3 {
            notes.push((
                "Increase Your Presence",
                "Your participation was a bit low. In your next discussion, aim to contribute at least three times. Agree with someone and add one new thought, or ask a clarifying question.",
            ));
        } else {
            notes.push((
                "Maintain Your Strong Presence",
                "You showed excellent engagement by speaking multiple times. Keep balancing your speaking time with active listening.",
            ));
        }

        if self.subjectivity > 0.6 && self.sentiment > 0.2 {
            notes.push((
                "Strengthen Your Arguments with Evidence",
                "Your passion and optimism drive the conversation. Back your points with a specific example or a piece of data to make them harder to argue against.",
            ));
        } else if self.subjectivity < 0.4 {
            notes.push((
                "Add Your Personal Conviction",
                "Your arguments are logical and fact-based. Close with a sentence stating your own opinion so the team knows exactly where you stand.",
            ));
        } else if self.sentiment < -0.1 {
            notes.push((
                "Frame Critiques Constructively",
                "You are good at identifying problems. Frame them as a shared challenge: instead of 'That won't work,' try 'How could we overcome the challenge of...?'",
            ));
        }

        if self.grammar.is_empty() {
            notes.push((
                "Continue Your Clear Communication",
                "Your language was clear and grammatically precise. Keep it up!",
            ));
        } else {
            notes.push((
                "Polish Your Language for Maximum Clarity",
                "Paying attention to the grammatical details listed above will make your ideas even more impactful.",
            ));
        }

        notes
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Your Group Discussion Performance Report ---")?;
        writeln!(f)?;
        writeln!(f, "Performance Analysis")?;
        writeln!(f, "  Grammar & Style Suggestions:")?;
        if self.grammar.is_empty() {
            writeln!(f, "    - No specific grammar errors found. Excellent clarity!")?;
        }
        for g in &self.grammar {
            writeln!(
                f,
                "    - In sentence, change '{}' to '{}' ({})",
                g.original, g.correction, g.message
            )?;
        }
        writeln!(f, "  Sentiment:")?;
        writeln!(
            f,
            "    - Average Sentiment: {} (Score: {:.2})",
            sentiment_label(self.sentiment),
            self.sentiment
        )?;
        writeln!(
            f,
            "    - Average Tone: {} (Score: {:.2})",
            tone_label(self.subjectivity),
            self.subjectivity
        )?;
        writeln!(f, "  Participation:")?;
        writeln!(f, "    - Total Words Spoken: {}", self.words)?;
        writeln!(f, "    - Number of Interventions: {}", self.interventions)?;
        writeln!(f)?;
        writeln!(f, "Actionable Suggestions for Your Next Discussion")?;
        for (goal, advice) in self.coaching() {
            writeln!(f, "  - Goal: {}. {}", goal, advice)?;
        }
        write!(f, "--- End of Report ---")
    }
}
