mod openrouter;

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use crate::schema::OutputSchema;

pub use openrouter::OpenRouterClient;

#[derive(Error, Debug)]
pub enum BackendError {
    /// The model answered, but not in the requested shape.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("{0}")]
    Failure(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A generative model that answers a prompt with a structured JSON object.
pub trait GenerationBackend {
    fn invoke(
        &self,
        prompt: &str,
        schema: OutputSchema,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send;
}

/// Strip a surrounding markdown code fence from a model answer.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_fence_is_removed() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
