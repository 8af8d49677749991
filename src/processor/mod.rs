//! Row processor: one chat-completion round trip turns a table of rows
//! into one derived string value per row.
//!
//! The call itself can fail and the returned text may not be the requested
//! JSON array, so the round trip runs in a bounded retry loop with
//! defensive parsing (see [`extract`]). The length of the result is an
//! invariant: once any array is recovered it is padded or truncated to
//! match the input, never rejected.

pub mod extract;
pub mod mock;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, Mode, MockPolicy};
use crate::llm::{ChatBackend, ChatMessage, ChatOptions, Role};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

const SYSTEM_ROLE: &str = "You transform table rows into one derived value per row, \
following the caller's instruction exactly.";

#[derive(Debug, Error)]
pub enum ProcessError {
    /// Every attempt failed; the caller may retry the whole request.
    #[error("language model gave no usable result after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
    /// The request itself is unprocessable; retrying will not help.
    #[error("{0}")]
    Invalid(String),
}

pub struct RowProcessor {
    backend: Arc<dyn ChatBackend>,
    opts: ChatOptions,
    mode: Mode,
    mock_policy: MockPolicy,
    max_rows: usize,
}

impl RowProcessor {
    pub fn new(backend: Arc<dyn ChatBackend>, cfg: &Config) -> Self {
        Self {
            backend,
            opts: ChatOptions { model: cfg.model(), temperature: 0.0 },
            mode: cfg.mode(),
            mock_policy: cfg.mock_policy(),
            max_rows: cfg.max_rows(),
        }
    }

    /// Derive one string per row. `rows` pass through to the model
    /// verbatim; no schema is imposed on them.
    pub async fn process(&self, rows: &[Value], prompt: &str) -> Result<Vec<String>, ProcessError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        if rows.len() > self.max_rows {
            return Err(ProcessError::Invalid(format!(
                "too many rows: {} exceeds the limit of {}",
                rows.len(),
                self.max_rows
            )));
        }
        if self.mode == Mode::Mock {
            return Ok(mock::mock_values(self.mock_policy, rows));
        }

        let messages = self.build_messages(rows, prompt)?;

        let mut last_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            let start = Instant::now();
            match self.attempt(&messages, rows.len()).await {
                Ok(values) => {
                    info!(
                        attempt,
                        latency_ms = start.elapsed().as_millis() as u64,
                        rows = rows.len(),
                        "completion parsed"
                    );
                    return Ok(values);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        latency_ms = start.elapsed().as_millis() as u64,
                        error = %e,
                        "completion attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
        }

        Err(ProcessError::Exhausted { attempts: MAX_ATTEMPTS, last_error })
    }

    fn build_messages(&self, rows: &[Value], prompt: &str) -> Result<Vec<ChatMessage>, ProcessError> {
        let rows_json = serde_json::to_string(rows)
            .map_err(|e| ProcessError::Invalid(format!("rows are not serializable: {}", e)))?;

        let user = format!(
            "Given this JSON array of rows:\n{rows}\n\nInstruction: {prompt}\n\n\
             Return a JSON array of strings with exactly {count} elements, one derived \
             value per row, in row order. Return only the derived values, not the row \
             objects, and no text besides the JSON array.",
            rows = rows_json,
            prompt = prompt,
            count = rows.len(),
        );

        Ok(vec![
            ChatMessage::new(Role::System, SYSTEM_ROLE),
            ChatMessage::new(Role::User, user),
        ])
    }

    async fn attempt(&self, messages: &[ChatMessage], expected: usize) -> Result<Vec<String>> {
        let text = self.backend.complete(messages, &self.opts).await?;
        let items = extract::parse_value_array(&text)?;
        Ok(extract::normalize_values(items, expected))
    }
}
