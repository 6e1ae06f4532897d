//! Duration estimation and pacing adjustment.
//!
//! The runtime of a scene is estimated as the sum of every `self.wait(..)`
//! plus a fixed cost per `self.play(..)`. The balancer inserts, extends or
//! trims waits so the estimate lands near the target. It is a heuristic: the
//! output may still fall outside the acceptance band.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

const PLAY_CALL: &str = "self.play(";
const WAIT_CALL: &str = "self.wait(";

/// Knobs of the pacing heuristic, in seconds unless noted.
#[derive(Debug, Clone, PartialEq)]
pub struct PacingPolicy {
    pub seconds_per_animation: f64,
    pub min_total: f64,
    pub target_total: f64,
    pub max_total: f64,
    /// Longest a single wait may become when stretching.
    pub directive_cap: f64,
    /// Fraction of the deficit offered to each non-final wait.
    pub share_ratio: f64,
    pub share_cap: f64,
    /// Waits at or above this are shortened when the scene runs long.
    pub trim_threshold: f64,
    pub trim_factor: f64,
    pub trim_floor: f64,
    /// Wait appended when a script has none at all.
    pub final_hold: f64,
    pub transform_pause: f64,
    pub introduce_pause: f64,
    pub construct_pause: f64,
    pub remove_pause: f64,
    pub default_pause: f64,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            seconds_per_animation: 1.5,
            min_total: 26.0,
            target_total: 28.0,
            max_total: 32.0,
            directive_cap: 4.0,
            share_ratio: 0.3,
            share_cap: 2.0,
            trim_threshold: 4.0,
            trim_factor: 0.7,
            trim_floor: 2.0,
            final_hold: 2.0,
            transform_pause: 2.8,
            introduce_pause: 2.4,
            construct_pause: 3.2,
            remove_pause: 1.6,
            default_pause: 2.2,
        }
    }
}

impl PacingPolicy {
    pub fn in_band(&self, total: f64) -> bool {
        total >= self.min_total && total <= self.max_total
    }

    pub fn pause_for(&self, kind: AnimationKind) -> f64 {
        match kind {
            AnimationKind::Transform => self.transform_pause,
            AnimationKind::Introduce => self.introduce_pause,
            AnimationKind::Construct => self.construct_pause,
            AnimationKind::Remove => self.remove_pause,
            AnimationKind::Other => self.default_pause,
        }
    }
}

/// Category of a `self.play(..)` call, used to pick the pause after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationKind {
    Transform,
    Introduce,
    Construct,
    Remove,
    Other,
}

impl AnimationKind {
    pub fn classify(call: &str) -> Self {
        let has = |needles: &[&str]| needles.iter().any(|n| call.contains(n));

        if has(&[".animate", "Transform"]) {
            AnimationKind::Transform
        } else if has(&["FadeIn", "Write"]) {
            AnimationKind::Introduce
        } else if has(&["Create", "DrawBorderThenFill"]) {
            AnimationKind::Construct
        } else if has(&["FadeOut", "Uncreate", "Unwrite"]) {
            AnimationKind::Remove
        } else {
            AnimationKind::Other
        }
    }
}

/// A `self.wait(..)` found in the text.
#[derive(Debug, Clone, PartialEq)]
pub struct PacingDirective {
    /// Byte range of the argument between the parentheses.
    pub argument: Range<usize>,
    pub seconds: f64,
    /// Whether the argument is a number the balancer may rewrite.
    pub literal: bool,
}

/// A `self.play(..)` found in the text.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCall {
    pub start: usize,
    /// Byte offset just past the closing parenthesis, or the end of the
    /// line when the call is never closed.
    pub end: usize,
    pub closed: bool,
    pub kind: AnimationKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationEstimate {
    pub animation_count: usize,
    pub directive_count: usize,
    pub pacing_seconds: f64,
    pub total: f64,
}

fn wait_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"self\.wait\(([^)]*)\)").expect("wait regex should compile"))
}

fn construct_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([ \t]*)def\s+construct\(\s*self\s*\)\s*:")
            .expect("construct header regex should compile")
    })
}

fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map_or(0, |i| i + 1)
}

fn line_end(text: &str, pos: usize) -> usize {
    text[pos..].find('\n').map_or(text.len(), |i| pos + i)
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Tracks whether a scan is inside a string literal.
#[derive(Default)]
struct Quoting {
    quote: Option<char>,
    escaped: bool,
}

impl Quoting {
    /// Feed one character; returns true while it belongs to a string literal.
    fn step(&mut self, ch: char) -> bool {
        match self.quote {
            Some(q) => {
                if self.escaped {
                    self.escaped = false;
                } else if ch == '\\' {
                    self.escaped = true;
                } else if ch == q {
                    self.quote = None;
                }
                true
            }
            None if ch == '"' || ch == '\'' => {
                self.quote = Some(ch);
                true
            }
            None => false,
        }
    }
}

/// Whether `pos` sits after a `#` that starts a comment on its line.
fn is_commented(text: &str, pos: usize) -> bool {
    let mut quoting = Quoting::default();
    text[line_start(text, pos)..pos]
        .chars()
        .any(|ch| !quoting.step(ch) && ch == '#')
}

/// Seconds held by a wait argument, `None` when it is not a number.
/// Manim waits one second by default.
fn parse_seconds(argument: &str) -> Option<f64> {
    let value = argument.trim();
    let value = value.strip_prefix("duration=").unwrap_or(value).trim();
    if value.is_empty() {
        return Some(1.0);
    }
    value.parse().ok()
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn format_seconds(value: f64) -> String {
    format!("{}", round_tenth(value))
}

pub fn pacing_directives(text: &str) -> Vec<PacingDirective> {
    wait_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let argument = caps.get(1)?;
            if is_commented(text, whole.start()) {
                return None;
            }
            let seconds = parse_seconds(argument.as_str());
            Some(PacingDirective {
                argument: argument.range(),
                seconds: seconds.unwrap_or(0.0),
                literal: seconds.is_some(),
            })
        })
        .collect()
}

/// Offset of the parenthesis closing the one at `open`, skipping string
/// literals and comments.
fn closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quoting = Quoting::default();
    let mut in_comment = false;

    for (i, ch) in text[open..].char_indices() {
        if in_comment {
            in_comment = ch != '\n';
            continue;
        }
        if quoting.step(ch) {
            continue;
        }
        match ch {
            '#' => in_comment = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && ch == ')' {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn animation_calls(text: &str) -> Vec<AnimationCall> {
    text.match_indices(PLAY_CALL)
        .filter(|(start, _)| !is_commented(text, *start))
        .map(|(start, _)| {
            let open = start + PLAY_CALL.len() - 1;
            let close = closing_paren(text, open);
            let end = close.map_or_else(|| line_end(text, start), |close| close + 1);
            AnimationCall {
                start,
                end,
                closed: close.is_some(),
                kind: AnimationKind::classify(&text[start..end]),
            }
        })
        .collect()
}

/// Whether the next statement after `pos` is a wait.
fn followed_by_wait(text: &str, pos: usize) -> bool {
    let mut lines = text[pos..].split('\n');
    if let Some(i) = lines.next().and_then(|tail| tail.find(WAIT_CALL)) {
        if !is_commented(text, pos + i) {
            return true;
        }
    }
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        return trimmed.starts_with(WAIT_CALL);
    }
    false
}

/// Insertion point and indentation for a statement appended to `construct`.
fn entry_body_end(text: &str) -> Option<(usize, String)> {
    let caps = construct_header_re().captures(text)?;
    let header = caps.get(0)?;
    let header_indent = caps.get(1)?.as_str();

    let mut insert_at = line_end(text, header.end());
    let mut body_indent: Option<&str> = None;
    let mut pos = insert_at;

    while pos < text.len() {
        let start = pos + 1;
        let end = line_end(text, start);
        let line = &text[start..end];
        if !line.trim().is_empty() {
            let indent = leading_whitespace(line);
            if indent.len() <= header_indent.len() {
                break;
            }
            body_indent.get_or_insert(indent);
            insert_at = end;
        }
        pos = end;
    }

    let indent = body_indent.map_or_else(|| format!("{}    ", header_indent), str::to_string);
    Some((insert_at, indent))
}

struct Edit {
    range: Range<usize>,
    replacement: String,
}

impl Edit {
    fn insert(at: usize, replacement: String) -> Self {
        Self {
            range: at..at,
            replacement,
        }
    }
}

fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| edit.range.start);
    let mut out = String::with_capacity(text.len() + edits.len() * 24);
    let mut cursor = 0;
    for edit in edits {
        out.push_str(&text[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn wait_line(indent: &str, seconds: f64) -> String {
    format!("\n{}self.wait({})", indent, format_seconds(seconds))
}

#[derive(Debug, Clone, Default)]
pub struct DurationBalancer {
    policy: PacingPolicy,
}

impl DurationBalancer {
    pub fn new(policy: PacingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PacingPolicy {
        &self.policy
    }

    pub fn estimate(&self, text: &str) -> DurationEstimate {
        let directives = pacing_directives(text);
        let animation_count = animation_calls(text).len();
        let pacing_seconds: f64 = directives.iter().map(|d| d.seconds).sum();
        DurationEstimate {
            animation_count,
            directive_count: directives.len(),
            pacing_seconds,
            total: pacing_seconds + animation_count as f64 * self.policy.seconds_per_animation,
        }
    }

    /// Adjust the waits in a script so its estimated runtime approaches the
    /// target. Never fails; the result is returned even if still out of band.
    pub fn normalize(&self, text: &str) -> String {
        let text = self.ensure_final_hold(text);
        let text = self.pause_after_animations(&text);

        let estimate = self.estimate(&text);
        info!(
            "Video duration analysis: {} animations ({:.1}s) + {:.1}s waits = {:.1}s total",
            estimate.animation_count,
            estimate.total - estimate.pacing_seconds,
            estimate.pacing_seconds,
            estimate.total
        );

        let text = if estimate.total < self.policy.min_total {
            self.extend(&text, estimate.total)
        } else if estimate.total > self.policy.max_total {
            self.trim(&text, estimate.total)
        } else {
            text
        };

        let final_total = self.estimate(&text).total;
        if self.policy.in_band(final_total) {
            info!("Final duration estimate: {:.1}s (within target band)", final_total);
        } else {
            warn!(
                "Final duration estimate {:.1}s is outside {:.0}-{:.0}s",
                final_total, self.policy.min_total, self.policy.max_total
            );
        }
        text
    }

    fn ensure_final_hold(&self, text: &str) -> String {
        if !pacing_directives(text).is_empty() {
            return text.to_string();
        }
        match entry_body_end(text) {
            Some((at, indent)) => {
                debug!("No waits found, holding the final frame");
                apply_edits(text, vec![Edit::insert(at, wait_line(&indent, self.policy.final_hold))])
            }
            None => text.to_string(),
        }
    }

    fn pause_after_animations(&self, text: &str) -> String {
        let mut edits: Vec<(usize, String, AnimationKind)> = Vec::new();

        for call in animation_calls(text) {
            if !call.closed {
                warn!("Unbalanced self.play( call, leaving it unpaced");
                continue;
            }
            if followed_by_wait(text, call.end) {
                continue;
            }
            let at = line_end(text, call.end);
            let indent = leading_whitespace(&text[line_start(text, call.start)..]).to_string();
            // One pause per line, chosen by the last call on it.
            if edits.last().is_some_and(|(prev, _, _)| *prev == at) {
                edits.pop();
            }
            edits.push((at, indent, call.kind));
        }

        if edits.is_empty() {
            return text.to_string();
        }
        debug!("Inserting {} pauses after animations", edits.len());

        let edits = edits
            .into_iter()
            .map(|(at, indent, kind)| Edit::insert(at, wait_line(&indent, self.policy.pause_for(kind))))
            .collect();
        apply_edits(text, edits)
    }

    fn extend(&self, text: &str, total: f64) -> String {
        let policy = &self.policy;
        let deficit = policy.target_total - total;
        info!(
            "Extending video duration by {:.1} seconds to reach {:.0}-second target",
            deficit, policy.target_total
        );

        let directives = pacing_directives(text);
        let Some(last) = directives.last() else {
            return text.to_string();
        };
        // Waits driven by a variable keep their expression.
        let adjustable: Vec<&PacingDirective> = directives.iter().filter(|d| d.literal).collect();

        let mut edits = Vec::new();
        let mut absorbed = 0.0;
        let count = adjustable.len();

        // Earlier waits take their share first, so the final wait only gets
        // what is left and may get nothing at all.
        for (index, directive) in adjustable.iter().enumerate() {
            let remaining = (deficit - absorbed).max(0.0);
            let offer = if index + 1 == count {
                remaining
            } else {
                (deficit * policy.share_ratio).min(policy.share_cap).min(remaining)
            };
            let stretched = round_tenth((directive.seconds + offer).min(policy.directive_cap));
            if stretched <= directive.seconds {
                continue;
            }
            absorbed += stretched - directive.seconds;
            edits.push(Edit {
                range: directive.argument.clone(),
                replacement: format_seconds(stretched),
            });
        }

        // The residual goes after the last wait as a run of waits rather than
        // a single one, so that no wait ever exceeds the directive cap.
        let mut residual = round_tenth(deficit - absorbed);
        if residual > 0.05 {
            let at = line_end(text, last.argument.end);
            let indent = leading_whitespace(&text[line_start(text, last.argument.start)..]);
            let mut appended = String::new();
            while residual > 0.05 {
                let chunk = residual.min(policy.directive_cap);
                appended.push_str(&wait_line(indent, chunk));
                residual = round_tenth(residual - chunk);
            }
            edits.push(Edit::insert(at, appended));
        }

        apply_edits(text, edits)
    }

    fn trim(&self, text: &str, total: f64) -> String {
        let policy = &self.policy;
        info!(
            "Video too long ({:.1}s), shortening long waits toward {:.0}-second target",
            total, policy.target_total
        );

        let edits = pacing_directives(text)
            .into_iter()
            .filter(|d| d.literal && d.seconds >= policy.trim_threshold)
            .map(|d| Edit {
                replacement: format_seconds((d.seconds * policy.trim_factor).max(policy.trim_floor)),
                range: d.argument,
            })
            .collect();
        apply_edits(text, edits)
    }
}
