use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Topic must not be empty")]
    EmptyTopic,

    #[error("Schema violation for topic '{topic}': {message}")]
    SchemaViolation { topic: String, message: String },

    #[error("No valid Scene class found in the generated code")]
    MissingSceneClass,

    #[error("No construct method found in the Scene class")]
    MissingEntryMethod,

    #[error("Generation backend error: {0}")]
    Backend(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed at {stage} for topic '{topic}': {source}")]
    Stage {
        topic: String,
        stage: Stage,
        #[source]
        source: Box<ScriptError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Pipeline stage an error surfaced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cache,
    Generation,
    Validation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Cache => "cache",
            Stage::Generation => "generation",
            Stage::Validation => "validation",
        };
        f.write_str(name)
    }
}

impl ScriptError {
    pub fn at(self, topic: &str, stage: Stage) -> Self {
        ScriptError::Stage {
            topic: topic.to_string(),
            stage,
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping stage wrappers.
    pub fn root(&self) -> &ScriptError {
        match self {
            ScriptError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_schema_violation(&self) -> bool {
        matches!(self.root(), ScriptError::SchemaViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wrapper_keeps_topic_and_cause() {
        let err = ScriptError::MissingEntryMethod.at("Pythagorean theorem", Stage::Validation);
        let text = err.to_string();
        assert!(text.contains("validation"));
        assert!(text.contains("Pythagorean theorem"));
        assert!(text.contains("construct"));
        assert!(matches!(err.root(), ScriptError::MissingEntryMethod));
    }

    #[test]
    fn schema_violation_is_detected_through_wrappers() {
        let err = ScriptError::SchemaViolation {
            topic: "t".into(),
            message: "missing field `complete_script`".into(),
        }
        .at("t", Stage::Generation);
        assert!(err.is_schema_violation());
        assert!(!ScriptError::Backend("401".into()).is_schema_violation());
    }
}
