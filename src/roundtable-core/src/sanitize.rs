//! Cleanup of language-model output before it is spoken.
//!
//! Models like to prefix a reply with their own name ("Milo:", "[Milo]:",
//! "(As Milo)"), emit markdown emphasis, or leak reasoning blocks. None of
//! that should reach the transcript or the speech renderer.

use regex::Regex;

use crate::error::DiscussionError;

/// Reasoning/internal tags stripped together with their content.
const REASONING_TAGS: [&str; 8] = [
    "thinking",
    "think",
    "reflection",
    "reasoning",
    "thought",
    "scratchpad",
    "analysis",
    "internal",
];

/// Removes self-identification labels and markup. `clean` is idempotent.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    patterns: Vec<Regex>,
    whitespace: Regex,
}

impl Sanitizer {
    /// Build a sanitizer that knows the given speaker names.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self, DiscussionError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                DiscussionError::ConfigError(format!("Invalid sanitizer pattern: {}", e))
            })
        };

        let mut patterns = Vec::new();
        for tag in REASONING_TAGS {
            patterns.push(compile(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>"))?);
        }
        // Unpaired reasoning tags; other angle-bracket text is prose.
        let tags = REASONING_TAGS.join("|");
        patterns.push(compile(&format!(r"(?i)</?(?:{tags})\b[^<>]*>"))?);

        for name in names {
            let name = regex::escape(name.as_ref());
            patterns.push(compile(&format!(r"(?i)\(\s*as\s+{name}\s*\)"))?);
            patterns.push(compile(&format!(r"\[\s*{name}\s*\]\s*:?"))?);
            patterns.push(compile(&format!(r"{name}\s*:"))?);
        }
        patterns.push(compile(r"[*#]")?);

        Ok(Self {
            patterns,
            whitespace: compile(r"\s+")?,
        })
    }

    /// Strip artifacts until nothing more matches, then normalize
    /// whitespace.
    pub fn clean(&self, text: &str) -> String {
        let mut current = text.to_string();
        loop {
            let mut next = current.clone();
            for pattern in &self.patterns {
                next = pattern.replace_all(&next, "").into_owned();
            }
            next = self.whitespace.replace_all(&next, " ").trim().to_string();

            if next == current {
                return next;
            }
            current = next;
        }
    }
}
