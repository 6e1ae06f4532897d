use std::sync::OnceLock;

use regex::Regex;

const INDENT: &str = "    ";

/// Where the scan currently is relative to the scene class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    TopLevel,
    InClass,
    InMethod,
}

/// How a single trimmed line moves the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    SceneClass,
    MethodDef,
    Statement,
}

fn scene_class_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^class\s+\w+\(\w*Scene\)\s*:").expect("scene class line regex should compile")
    })
}

fn classify(trimmed: &str) -> LineKind {
    if trimmed.is_empty() {
        LineKind::Blank
    } else if scene_class_line().is_match(trimmed) {
        LineKind::SceneClass
    } else if trimmed.starts_with("def ") {
        LineKind::MethodDef
    } else {
        LineKind::Statement
    }
}

impl Nesting {
    /// Returns the next state and the indentation depth for the line.
    fn step(self, kind: LineKind) -> (Nesting, usize) {
        match (self, kind) {
            (state, LineKind::Blank) => (state, 0),
            (_, LineKind::SceneClass) => (Nesting::InClass, 0),
            (Nesting::InClass | Nesting::InMethod, LineKind::MethodDef) => (Nesting::InMethod, 1),
            (Nesting::InMethod, _) => (Nesting::InMethod, 2),
            (Nesting::InClass, _) => (Nesting::InClass, 1),
            (Nesting::TopLevel, _) => (Nesting::TopLevel, 0),
        }
    }
}

/// Re-indent the script in one pass: class lines at column zero, method
/// headers one level in, everything inside a method two levels in.
///
/// Only indentation width is fixed; the relative order of lines is trusted.
pub fn reflow(text: &str) -> String {
    let mut state = Nesting::TopLevel;
    let mut lines = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        let (next, depth) = state.step(classify(trimmed));
        state = next;

        if trimmed.is_empty() {
            lines.push(String::new());
        } else {
            lines.push(format!("{}{}", INDENT.repeat(depth), trimmed));
        }
    }

    let mut out = lines.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_body_outside_class_stays_at_column_zero() {
        assert_eq!(reflow("    self.play(Write(title))"), "self.play(Write(title))");
        assert_eq!(reflow("def helper():\n  return 1"), "def helper():\nreturn 1");
    }

    #[test]
    fn class_level_line_gets_one_level() {
        let out = reflow("class Demo(Scene):\nconfig = {}\n");
        assert_eq!(out, "class Demo(Scene):\n    config = {}\n");
    }

    #[test]
    fn method_body_gets_two_levels() {
        let input = "from manim import *\n\nclass Demo(Scene):\ndef construct(self):\n  title = Text(\"Hi\")\n\n      self.play(Write(title))\n";
        let expected = "from manim import *\n\nclass Demo(Scene):\n    def construct(self):\n        title = Text(\"Hi\")\n\n        self.play(Write(title))\n";
        assert_eq!(reflow(input), expected);
    }

    #[test]
    fn blank_lines_lose_whitespace() {
        assert_eq!(reflow("class A(Scene):\n   \n"), "class A(Scene):\n\n");
    }

    #[test]
    fn new_scene_class_leaves_method() {
        let input = "class A(Scene):\ndef construct(self):\npass\nclass B(MovingCameraScene):\nx = 1";
        let expected =
            "class A(Scene):\n    def construct(self):\n        pass\nclass B(MovingCameraScene):\n    x = 1";
        assert_eq!(reflow(input), expected);
    }

    #[test]
    fn state_machine_transitions() {
        assert_eq!(
            Nesting::TopLevel.step(LineKind::MethodDef),
            (Nesting::TopLevel, 0)
        );
        assert_eq!(Nesting::InClass.step(LineKind::Statement), (Nesting::InClass, 1));
        assert_eq!(Nesting::InMethod.step(LineKind::MethodDef), (Nesting::InMethod, 1));
        assert_eq!(Nesting::InMethod.step(LineKind::SceneClass), (Nesting::InClass, 0));
        assert_eq!(Nesting::InMethod.step(LineKind::Blank), (Nesting::InMethod, 0));
    }
}
