//! Typed input standing in for the microphone.

use async_trait::async_trait;
use colored::Colorize;
use roundtable_core::{DiscussionError, SpeechInput};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Reads one line from stdin per capture.
pub struct ConsoleInput {
    lines: Mutex<Lines<BufReader<Stdin>>>,
    closed: AtomicBool,
}

impl ConsoleInput {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            closed: AtomicBool::new(false),
        }
    }

    /// True once stdin reached end of file.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechInput for ConsoleInput {
    async fn capture(
        &self,
        prompt: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<String>, DiscussionError> {
        if self.is_closed() {
            return Err(DiscussionError::Collaborator("Input is closed".to_string()));
        }

        if let Some(prompt) = prompt {
            print!("{} ", prompt.bright_green().bold());
            std::io::stdout().flush().ok();
        }

        let mut lines = self.lines.lock().await;
        match tokio::time::timeout(timeout, lines.next_line()).await {
            Err(_) => {
                println!();
                Ok(None)
            }
            Ok(Ok(Some(line))) => {
                let line = line.trim().to_string();
                Ok((!line.is_empty()).then_some(line))
            }
            Ok(Ok(None)) => {
                self.closed.store(true, Ordering::Relaxed);
                Err(DiscussionError::Collaborator("Input is closed".to_string()))
            }
            Ok(Err(e)) => Err(DiscussionError::Collaborator(format!(
                "Failed to read input: {}",
                e
            ))),
        }
    }
}
