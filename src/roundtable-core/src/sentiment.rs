//! Sentiment scoring of the human's utterances.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::DiscussionError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SentimentScore {
    /// -1.0 (negative) to 1.0 (positive).
    pub polarity: f32,
    /// 0.0 (factual) to 1.0 (opinionated).
    pub subjectivity: f32,
}

#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<SentimentScore, DiscussionError>;
}

/// Splits text into word tokens and punctuation tokens. Apostrophes inside
/// a word stay with it ("don't" is one token); "good." is two.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let word = c.is_alphanumeric();
        let mut end = start;
        while let Some(&(i, ch)) = chars.peek() {
            let in_word_apostrophe = word
                && (ch == '\'' || ch == '\u{2019}')
                && text[i + ch.len_utf8()..]
                    .chars()
                    .next()
                    .is_some_and(char::is_alphanumeric);
            let continues = if word {
                ch.is_alphanumeric() || in_word_apostrophe
            } else {
                !ch.is_alphanumeric() && !ch.is_whitespace()
            };
            if !continues {
                break;
            }
            end = i + ch.len_utf8();
            chars.next();
        }
        tokens.push(&text[start..end]);
    }

    tokens
}

/// Lexicon scorer in the style of pattern/TextBlob: averages the scores of
/// sentiment-bearing words, scaled by a preceding intensifier and damped
/// and flipped by a preceding negation.
pub struct LexiconSentiment {
    lexicon: HashMap<&'static str, (f32, f32)>,
    intensifiers: HashMap<&'static str, f32>,
}

const NEGATIONS: [&str; 8] = ["not", "no", "never", "n't", "cannot", "nothing", "hardly", "without"];

const LEXICON: [(&str, f32, f32); 44] = [
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("excellent", 1.0, 1.0),
    ("amazing", 0.6, 0.9),
    ("awesome", 1.0, 1.0),
    ("wonderful", 1.0, 1.0),
    ("best", 1.0, 0.3),
    ("better", 0.5, 0.5),
    ("nice", 0.6, 1.0),
    ("happy", 0.8, 1.0),
    ("love", 0.5, 0.6),
    ("like", 0.2, 0.3),
    ("fair", 0.7, 0.9),
    ("easy", 0.43, 0.83),
    ("safe", 0.5, 0.5),
    ("positive", 0.23, 0.55),
    ("important", 0.4, 1.0),
    ("interesting", 0.5, 0.5),
    ("beneficial", 0.6, 0.4),
    ("productive", 0.5, 0.5),
    ("efficient", 0.4, 0.3),
    ("flexible", 0.3, 0.4),
    ("innovative", 0.5, 0.6),
    ("right", 0.29, 0.54),
    ("true", 0.35, 0.65),
    ("bad", -0.7, 0.67),
    ("worse", -0.4, 0.6),
    ("worst", -1.0, 1.0),
    ("terrible", -1.0, 1.0),
    ("awful", -1.0, 1.0),
    ("horrible", -1.0, 1.0),
    ("hate", -0.8, 0.9),
    ("sad", -0.5, 1.0),
    ("poor", -0.4, 0.6),
    ("negative", -0.3, 0.4),
    ("wrong", -0.5, 0.9),
    ("false", -0.4, 0.6),
    ("difficult", -0.5, 1.0),
    ("hard", -0.3, 0.54),
    ("expensive", -0.5, 0.7),
    ("risky", -0.4, 0.6),
    ("dangerous", -0.6, 0.9),
    ("lonely", -0.4, 0.7),
    ("stressful", -0.5, 0.7),
];

const INTENSIFIERS: [(&str, f32); 8] = [
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("so", 1.2),
    ("quite", 1.1),
    ("totally", 1.4),
    ("slightly", 0.7),
];

impl LexiconSentiment {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().map(|&(w, p, s)| (w, (p, s))).collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
        }
    }

    pub fn score(&self, text: &str) -> SentimentScore {
        let mut scored: Vec<(f32, f32)> = Vec::new();
        let mut intensity = 1.0_f32;
        let mut negated = false;

        for token in tokenize(text) {
            let word = token.to_lowercase();
            if !token.chars().any(char::is_alphanumeric) {
                intensity = 1.0;
                negated = false;
                continue;
            }

            if NEGATIONS.contains(&word.as_str()) || word.ends_with("n't") {
                negated = true;
            } else if let Some(&factor) = self.intensifiers.get(word.as_str()) {
                intensity *= factor;
            } else if let Some(&(polarity, subjectivity)) = self.lexicon.get(word.as_str()) {
                let mut p = (polarity * intensity).clamp(-1.0, 1.0);
                if negated {
                    p *= -0.5;
                }
                let s = (subjectivity * intensity).clamp(0.0, 1.0);
                scored.push((p, s));
                intensity = 1.0;
                negated = false;
            }
        }

        if scored.is_empty() {
            return SentimentScore::default();
        }

        let n = scored.len() as f32;
        SentimentScore {
            polarity: (scored.iter().map(|(p, _)| p).sum::<f32>() / n).clamp(-1.0, 1.0),
            subjectivity: (scored.iter().map(|(_, s)| s).sum::<f32>() / n).clamp(0.0, 1.0),
        }
    }
}

impl Default for LexiconSentiment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentAnalyzer for LexiconSentiment {
    async fn analyze(&self, text: &str) -> Result<SentimentScore, DiscussionError> {
        Ok(self.score(text))
    }
}
