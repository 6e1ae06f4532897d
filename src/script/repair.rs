//! Rule-based rewriting of defects the model is known to produce.
//!
//! Every rule is a pure text-to-text function that works inside single
//! statements. Rules run in list order and later rules may rely on earlier
//! output, e.g. the raw-string rule expects fractions to be normalized first.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

pub const MANIM_IMPORT: &str = "from manim import *";

/// Colors the generated scripts are allowed to set explicitly.
const PALETTE: [&str; 5] = ["BLUE", "GREEN", "RED", "PURPLE", "ORANGE"];

/// Text longer than this many characters gets the smaller font.
const LONG_TEXT_CHARS: usize = 20;
const LONG_TEXT_FONT_SIZE: u32 = 32;
const SHORT_TEXT_FONT_SIZE: u32 = 36;

const LABEL_BUFF: &str = "0.3";

pub type Rewrite = fn(&str) -> Cow<'_, str>;

#[derive(Clone, Copy)]
pub struct RepairRule {
    pub name: &'static str,
    rewrite: Rewrite,
}

impl RepairRule {
    pub const fn new(name: &'static str, rewrite: Rewrite) -> Self {
        Self { name, rewrite }
    }

    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        (self.rewrite)(text)
    }
}

impl std::fmt::Debug for RepairRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairRule").field("name", &self.name).finish()
    }
}

const STANDARD_RULES: [RepairRule; 13] = [
    RepairRule::new("manim-import", ensure_manim_import),
    RepairRule::new("duplicated-math-prefix", duplicated_math_prefix),
    RepairRule::new("line-label", line_label),
    RepairRule::new("latex-text-to-math", latex_text_to_math),
    RepairRule::new("missing-default-arguments", missing_default_arguments),
    RepairRule::new("positional-geometry-arguments", positional_geometry_arguments),
    RepairRule::new("object-label", object_label),
    RepairRule::new("fraction-raw-string", fraction_raw_string),
    RepairRule::new("math-raw-string", math_raw_string),
    RepairRule::new("text-markup-in-math", text_markup_in_math),
    RepairRule::new("label-spacing", label_spacing),
    RepairRule::new("text-font-size", text_font_size),
    RepairRule::new("palette-colors", palette_colors),
];

/// Ordered chain of repair rules.
#[derive(Debug, Clone)]
pub struct RepairEngine {
    rules: Vec<RepairRule>,
}

impl Default for RepairEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl RepairEngine {
    pub fn standard() -> Self {
        Self {
            rules: STANDARD_RULES.to_vec(),
        }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: RepairRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name)
    }

    /// Run every rule over the text. Never fails: a rule that does not match
    /// leaves the text untouched.
    pub fn repair(&self, text: &str) -> String {
        let mut current = text.to_string();
        for rule in &self.rules {
            let rewritten = match rule.apply(&current) {
                Cow::Borrowed(_) => continue,
                Cow::Owned(rewritten) => rewritten,
            };
            if rewritten != current {
                debug!("Repair rule '{}' rewrote the script", rule.name);
                current = rewritten;
            }
        }
        current
    }
}

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("repair pattern should compile"))
}

fn ensure_manim_import(text: &str) -> Cow<'_, str> {
    if text.contains(MANIM_IMPORT) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{}\n\n{}", MANIM_IMPORT, text))
    }
}

/// `MathMathTex` does not exist.
fn duplicated_math_prefix(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?:Math)+MathTex").replace_all(text, "MathTex")
}

/// `Line` has no `.label()`; build the label as a separate statement.
fn line_label(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r"(?m)^([ \t]*)(\w+) = Line\(([^)]*)\)\.label\(([^,]+),?\s*buff=([^)]+)\)",
    )
    .replace_all(
        text,
        "${1}${2} = Line(${3})\n${1}${2}_label = MathTex(${4}).next_to(${2}, UP, buff=${5})",
    )
}

/// `Tex` with math markup belongs in `MathTex`.
fn latex_text_to_math(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r#"\bTex\(("[^"]*[\\^_].*?"|'[^']*[\\^_].*?')\)"#,
    )
    .replace_all(text, "MathTex(${1})")
}

fn missing_default_arguments(text: &str) -> Cow<'_, str> {
    static OPACITY: OnceLock<Regex> = OnceLock::new();
    static VECTOR: OnceLock<Regex> = OnceLock::new();
    static TRACKER: OnceLock<Regex> = OnceLock::new();

    let text = cached(&OPACITY, r"(\w+)\.set_opacity\(\)").replace_all(text, "${1}.set_opacity(0.5)");
    let text = replace_owned(text, cached(&VECTOR, r"\bVector\(\)"), "Vector(RIGHT)");
    replace_owned(text, cached(&TRACKER, r"\bValueTracker\(\)"), "ValueTracker(0)")
}

fn positional_geometry_arguments(text: &str) -> Cow<'_, str> {
    static SQUARE: OnceLock<Regex> = OnceLock::new();
    static CIRCLE: OnceLock<Regex> = OnceLock::new();

    let text = cached(&SQUARE, r"\bSquare\(side_length=([^,)]+)").replace_all(text, "Square(${1}");
    replace_owned(text, cached(&CIRCLE, r"\bCircle\(radius=([^,)]+)"), "Circle(${1}")
}

/// Mobjects have no `.label()` either; attach a `MathTex` above them.
fn object_label(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(\w+)\.label\(([^)]+)\)").replace_all(text, "MathTex(${2}).next_to(${1}, UP)")
}

fn fraction_raw_string(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"MathTex\("(.*?)\\frac\{(.*?)\}\{(.*?)\}"(.*?)\)"#)
        .replace_all(text, r#"MathTex(r"${1}\frac{${2}}{${3}}"${4})"#)
}

fn math_raw_string(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"MathTex\("(.*?[\\^_\{\}].*?)"\)"#).replace_all(text, r#"MathTex(r"${1}")"#)
}

/// `MathTex(r"\text{...}")` is plain text in disguise.
fn text_markup_in_math(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"MathTex\(r?"\\text\{([^}]+)\}"\)"#).replace_all(text, r#"Text("${1}")"#)
}

fn label_spacing(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"MathTex\(([^)]+)\)\.next_to\(([^,]+),\s*UP\)").replace_all(
        text,
        |caps: &Captures| {
            format!(
                "MathTex({}).next_to({}, UP, buff={})",
                &caps[1], &caps[2], LABEL_BUFF
            )
        },
    )
}

fn text_font_size(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"\bText\("([^"]+)"\)"#).replace_all(text, |caps: &Captures| {
        let content = &caps[1];
        let size = if content.chars().count() > LONG_TEXT_CHARS {
            LONG_TEXT_FONT_SIZE
        } else {
            SHORT_TEXT_FONT_SIZE
        };
        format!("Text(\"{}\", font_size={})", content, size)
    })
}

/// Palette colors are currently kept as they are.
fn palette_colors(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = cached(&RE, r"\.set_color\((\w+)\)");
    if !re.is_match(text) {
        return Cow::Borrowed(text);
    }
    re.replace_all(text, |caps: &Captures| {
        let color = &caps[1];
        match PALETTE.iter().find(|c| **c == color) {
            Some(known) => format!(".set_color({})", known),
            None => caps[0].to_string(),
        }
    })
}

fn replace_owned<'a>(text: Cow<'a, str>, re: &Regex, replacement: &str) -> Cow<'a, str> {
    match text {
        Cow::Borrowed(borrowed) => re.replace_all(borrowed, replacement),
        Cow::Owned(owned) => Cow::Owned(re.replace_all(&owned, replacement).into_owned()),
    }
}
