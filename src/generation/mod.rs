pub mod prompt;

use tracing::{info, warn};

use crate::api::{BackendError, GenerationBackend};
use crate::error::{Result, ScriptError};
use crate::schema::OutputSchema;
use crate::script::PacingPolicy;

/// Produces a raw script for a topic from a schema-constrained model call,
/// retrying once with a reduced schema when the answer is malformed.
#[derive(Debug, Clone)]
pub struct ConstrainedGenerator<B> {
    backend: B,
    policy: PacingPolicy,
}

impl<B: GenerationBackend> ConstrainedGenerator<B> {
    pub fn new(backend: B) -> Self {
        Self::with_policy(backend, PacingPolicy::default())
    }

    pub fn with_policy(backend: B, policy: PacingPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn generate(&self, topic: &str) -> Result<String> {
        info!("Generating Manim script for: {}", topic);

        let primary = self
            .attempt(&prompt::primary(topic, &self.policy), OutputSchema::Full)
            .await;

        let raw = match primary {
            Ok(script) => script,
            Err(BackendError::SchemaViolation(message)) => {
                warn!("Structured answer rejected: {}", message);
                info!("Attempting fallback with simplified prompt...");
                self.attempt(&prompt::fallback(topic, &self.policy), OutputSchema::Reduced)
                    .await
                    .map_err(|e| match e {
                        BackendError::SchemaViolation(message) => ScriptError::SchemaViolation {
                            topic: topic.to_string(),
                            message,
                        },
                        other => ScriptError::Backend(other.to_string()),
                    })?
            }
            Err(other) => return Err(ScriptError::Backend(other.to_string())),
        };

        info!("Generated script: {} characters", raw.len());
        Ok(unescape_newlines(raw))
    }

    async fn attempt(
        &self,
        prompt: &str,
        schema: OutputSchema,
    ) -> std::result::Result<String, BackendError> {
        let value = self.backend.invoke(prompt, schema).await?;
        let script = schema
            .extract_script(value)
            .map_err(|e| BackendError::SchemaViolation(e.to_string()))?;

        if script.trim().is_empty() {
            return Err(BackendError::SchemaViolation(
                "complete_script is empty".to_string(),
            ));
        }
        Ok(script)
    }
}

/// LaTeX commands that begin with `\n` and must survive unescaping.
const LATEX_N_COMMANDS: [&str; 13] = [
    "nabla", "ne", "neg", "neq", "newline", "nexists", "ngeq", "ni", "nleq", "nmid", "not",
    "notin", "nu",
];

fn starts_latex_command(tail: &str) -> bool {
    let word = tail
        .find(|c: char| !c.is_ascii_alphabetic())
        .map_or(tail, |end| &tail[..end]);
    LATEX_N_COMMANDS.contains(&word)
}

/// Scripts that arrive on a single line with escaped `\n` sequences are
/// turned back into real lines. Escaped backslashes and LaTeX commands such
/// as `\nabla` are kept.
fn unescape_newlines(script: String) -> String {
    if script.contains('\n') || !script.contains("\\n") {
        return script;
    }

    let mut out = String::with_capacity(script.len());
    let mut rest = script.as_str();
    while let Some(i) = rest.find('\\') {
        out.push_str(&rest[..i]);
        let tail = &rest[i + 1..];
        if let Some(after) = tail.strip_prefix('\\') {
            out.push_str("\\\\");
            rest = after;
        } else if tail.starts_with('n') && !starts_latex_command(tail) {
            out.push('\n');
            rest = &tail[1..];
        } else {
            out.push('\\');
            rest = tail;
        }
    }
    out.push_str(rest);
    out
}
