use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, ScriptError};

fn scene_class() -> &'static Regex {
    static SCENE_CLASS_RE: OnceLock<Regex> = OnceLock::new();
    SCENE_CLASS_RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*class\s+\w+\(\w*Scene\)\s*:")
            .expect("scene class regex should compile")
    })
}

fn entry_method() -> &'static Regex {
    static ENTRY_METHOD_RE: OnceLock<Regex> = OnceLock::new();
    ENTRY_METHOD_RE.get_or_init(|| {
        Regex::new(r"def\s+construct\(\s*self\s*\)\s*:").expect("construct regex should compile")
    })
}

/// Reject scripts that cannot possibly run: a Scene subclass and its
/// `construct(self)` entry point must both be present.
pub fn validate(text: &str) -> Result<&str> {
    if !scene_class().is_match(text) {
        return Err(ScriptError::MissingSceneClass);
    }
    if !entry_method().is_match(text) {
        return Err(ScriptError::MissingEntryMethod);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_scene() {
        let text = "from manim import *\n\nclass Demo(Scene):\n    def construct(self):\n        pass\n";
        assert_eq!(validate(text).unwrap(), text);
    }

    #[test]
    fn accepts_scene_variants() {
        let text = "class Orbit(ThreeDScene):\n    def construct(self):\n        pass\n";
        assert!(validate(text).is_ok());
    }

    #[test]
    fn class_without_construct_is_rejected() {
        let text = "class Demo(Scene):\n    def setup(self):\n        pass\n";
        assert!(matches!(validate(text), Err(ScriptError::MissingEntryMethod)));
    }

    #[test]
    fn construct_without_scene_class_is_rejected() {
        let text = "class Demo(object):\n    def construct(self):\n        pass\n";
        assert!(matches!(validate(text), Err(ScriptError::MissingSceneClass)));
    }

    #[test]
    fn empty_text_fails_on_scene_class_first() {
        assert!(matches!(validate(""), Err(ScriptError::MissingSceneClass)));
    }
}
