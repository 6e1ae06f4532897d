use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use super::pacing::{DurationBalancer, DurationEstimate};

const MIN_TEXT_ELEMENTS: usize = 2;
const MIN_WAIT_ELEMENTS: usize = 3;

/// Content counts of a finished script, used for informational warnings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStats {
    pub text_elements: usize,
    pub math_elements: usize,
    pub duration: DurationEstimate,
    pub within_band: bool,
}

fn count(pattern: &'static OnceLock<Regex>, source: &str, text: &str) -> usize {
    pattern
        .get_or_init(|| Regex::new(source).expect("stats regex should compile"))
        .find_iter(text)
        .count()
}

impl ScriptStats {
    pub fn collect(text: &str, balancer: &DurationBalancer) -> Self {
        static TEXT: OnceLock<Regex> = OnceLock::new();
        static MATH: OnceLock<Regex> = OnceLock::new();

        let duration = balancer.estimate(text);
        Self {
            text_elements: count(&TEXT, r"\bText\(", text),
            math_elements: count(&MATH, r"\bMathTex\(", text),
            within_band: balancer.policy().in_band(duration.total),
            duration,
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.text_elements < MIN_TEXT_ELEMENTS {
            warnings.push(format!(
                "Low text elements detected ({}); too few text elements for an explanation",
                self.text_elements
            ));
        }
        if self.duration.directive_count < MIN_WAIT_ELEMENTS {
            warnings.push(format!(
                "Low wait elements detected ({}); pacing may be rushed",
                self.duration.directive_count
            ));
        }
        warnings
    }

    pub fn log(&self) {
        for warning in self.warnings() {
            warn!("{}", warning);
        }
        info!(
            "Script validation: {} text elements, {} math elements",
            self.text_elements, self.math_elements
        );
        info!(
            "Duration estimate: {:.1} seconds ({} animations + {:.1}s waits), target status: {}",
            self.duration.total,
            self.duration.animation_count,
            self.duration.pacing_seconds,
            if self.within_band { "ACHIEVED" } else { "NEEDS ADJUSTMENT" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_elements_and_flags_sparse_scripts() {
        let text = "t = Text(\"a\")\nm = MathTex(r\"x\")\nself.play(Write(t))\nself.wait(2)\n";
        let stats = ScriptStats::collect(text, &DurationBalancer::default());
        assert_eq!(stats.text_elements, 1);
        assert_eq!(stats.math_elements, 1);
        assert_eq!(stats.duration.total, 3.5);
        assert!(!stats.within_band);

        let warnings = stats.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("too few text elements"));
        assert!(warnings[1].contains("pacing may be rushed"));
    }

    #[test]
    fn well_paced_script_has_no_warnings() {
        let mut text = String::from("a = Text(\"a\")\nb = Text(\"b\")\n");
        for _ in 0..6 {
            text.push_str("self.play(Write(a))\nself.wait(3)\n");
        }
        let stats = ScriptStats::collect(&text, &DurationBalancer::default());
        assert_eq!(stats.duration.total, 27.0);
        assert!(stats.within_band);
        assert!(stats.warnings().is_empty());
    }
}
