//! Grammar checking through a LanguageTool server.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::GrammarConfig;
use crate::error::DiscussionError;

/// One issue reported by a grammar checker.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarIssue {
    /// Offset of the flagged fragment in UTF-16 code units, as LanguageTool
    /// reports it.
    pub offset: usize,
    /// Length of the flagged fragment in characters.
    pub length: usize,
    pub replacement: Option<String>,
    pub message: String,
}

#[async_trait]
pub trait GrammarChecker: Send + Sync {
    async fn check(&self, text: &str) -> Result<Vec<GrammarIssue>, DiscussionError>;
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<CheckMatch>,
}

#[derive(Debug, Deserialize)]
struct CheckMatch {
    message: String,
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<Replacement>,
}

#[derive(Debug, Deserialize)]
struct Replacement {
    value: String,
}

/// Client for LanguageTool's `/v2/check` endpoint.
pub struct LanguageToolChecker {
    client: reqwest::Client,
    endpoint: String,
    language: String,
}

impl LanguageToolChecker {
    pub fn new(config: &GrammarConfig) -> Result<Self, DiscussionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                DiscussionError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
        })
    }
}

#[async_trait]
impl GrammarChecker for LanguageToolChecker {
    async fn check(&self, text: &str) -> Result<Vec<GrammarIssue>, DiscussionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .await
            .map_err(|e| DiscussionError::Collaborator(format!("Grammar check failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DiscussionError::Collaborator(format!(
                "Grammar check returned {}",
                response.status()
            )));
        }

        let body: CheckResponse = response
            .json()
            .await
            .map_err(|e| DiscussionError::Collaborator(format!("Grammar check parse error: {e}")))?;

        Ok(body.matches.into_iter().map(GrammarIssue::from).collect())
    }
}

impl From<CheckMatch> for GrammarIssue {
    fn from(m: CheckMatch) -> Self {
        GrammarIssue {
            offset: m.offset,
            length: m.length,
            replacement: m.replacements.into_iter().next().map(|r| r.value),
            message: m.message,
        }
    }
}
