use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Full structured answer requested from the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptDocument {
    /// Import statements, e.g. `from manim import *`
    pub imports: Vec<String>,
    /// Name of the Scene subclass
    pub class_name: String,
    pub class_definition: ClassDefinition,
    /// Full executable script; the only field used after generation
    pub complete_script: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub methods: Vec<MethodDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDefinition {
    pub name: String,
    pub parameters: Vec<String>,
    /// Method body with 4-space indentation
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

/// Reduced answer used by the fallback attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptDraft {
    pub class_name: String,
    pub complete_script: String,
}

/// Which output contract a generation request is held to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchema {
    Full,
    Reduced,
}

impl OutputSchema {
    pub fn name(self) -> &'static str {
        match self {
            OutputSchema::Full => "manim_script",
            OutputSchema::Reduced => "manim_script_draft",
        }
    }

    /// JSON Schema document sent along with the request.
    pub fn json_schema(self) -> Value {
        match self {
            OutputSchema::Full => json!({
                "type": "object",
                "properties": {
                    "imports": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "All necessary import statements for Manim"
                    },
                    "class_name": {
                        "type": "string",
                        "description": "Name of the Scene class (e.g., 'PythagoreanTheorem')"
                    },
                    "class_definition": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "docstring": { "type": "string" },
                            "methods": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "name": { "type": "string" },
                                        "parameters": {
                                            "type": "array",
                                            "items": { "type": "string" }
                                        },
                                        "body": {
                                            "type": "string",
                                            "description": "Complete method body with proper 4-space indentation"
                                        },
                                        "docstring": { "type": "string" }
                                    },
                                    "required": ["name", "parameters", "body"]
                                }
                            }
                        },
                        "required": ["name", "methods"]
                    },
                    "complete_script": {
                        "type": "string",
                        "description": "Full executable Manim Python script with proper PEP 8 formatting"
                    }
                },
                "required": ["imports", "class_name", "class_definition", "complete_script"]
            }),
            OutputSchema::Reduced => json!({
                "type": "object",
                "properties": {
                    "class_name": { "type": "string" },
                    "complete_script": {
                        "type": "string",
                        "description": "Full executable Manim Python script"
                    }
                },
                "required": ["class_name", "complete_script"]
            }),
        }
    }

    /// Coerce a structured answer into this schema and hand back `complete_script`.
    pub fn extract_script(self, value: Value) -> std::result::Result<String, serde_json::Error> {
        let script = match self {
            OutputSchema::Full => serde_json::from_value::<ScriptDocument>(value)?.complete_script,
            OutputSchema::Reduced => serde_json::from_value::<ScriptDraft>(value)?.complete_script,
        };
        Ok(script)
    }
}
