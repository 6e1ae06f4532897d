use crate::script::PacingPolicy;

/// Slack around the target quoted to the model, in seconds.
const PROMPT_WINDOW: f64 = 2.0;

/// Share of the runtime given to each teaching phase, as (name, low, high) percent.
const PHASES: [(&str, u32, u32); 5] = [
    ("Hook & context: a real-world question that motivates the topic", 10, 15),
    ("Conceptual foundation: the core idea in basic building blocks", 20, 25),
    ("Step-by-step breakdown: progressive reveal with color coding", 40, 50),
    ("Visual demonstration: a dynamic worked example", 15, 20),
    ("Summary & connections: recap and link back to the opening question", 10, 15),
];

fn phase_budget(policy: &PacingPolicy) -> String {
    PHASES
        .iter()
        .enumerate()
        .map(|(i, (name, low, high))| {
            let from = policy.target_total * f64::from(*low) / 100.0;
            let to = policy.target_total * f64::from(*high) / 100.0;
            format!(
                "{}. {} ({}-{}% of the video, about {:.0}-{:.0} seconds)",
                i + 1,
                name,
                low,
                high,
                from,
                to
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for the first attempt, paired with the full schema.
pub fn primary(topic: &str, policy: &PacingPolicy) -> String {
    format!(
        r#"You are an expert educator and Manim developer. Create a highly explanatory animation for the topic: "{topic}".

VIDEO LENGTH: the animation must run about {target:.0} seconds in total ({min:.0}-{max:.0} seconds is acceptable).

Respond ONLY with a JSON object of this shape:
{{
  "imports": ["from manim import *"],
  "class_name": "SceneName",
  "class_definition": {{
    "name": "SceneName",
    "methods": [
      {{ "name": "construct", "parameters": ["self"], "body": "    def construct(self):\n        ..." }}
    ]
  }},
  "complete_script": "from manim import *\n\nclass SceneName(Scene):\n    def construct(self):\n        ..."
}}
The JSON must be valid: no trailing commas, newlines escaped inside strings.

STRUCTURE THE EXPLANATION IN PHASES:
{phases}

PACING:
- Pause 1.5-2.5 seconds with self.wait() after every key point
- Pause before revealing the answer to a question
- Keep every single pause at or under {cap:.0} seconds

VISUAL STYLE:
- Consistent colors: BLUE for main concepts, GREEN for examples
- Label every important object and keep labels clear of the shapes they name
- Use arrows, highlights and zooms to direct attention

TECHNICAL REQUIREMENTS:
- One class deriving from Scene with a construct(self) method
- Proper 4-space indentation
- MathTex() for formulas with raw strings (r"..."), Text() for prose
- Do NOT call .label() on mobjects; place a MathTex with next_to() instead
- Do NOT include render commands"#,
        topic = topic,
        target = policy.target_total,
        min = policy.target_total - PROMPT_WINDOW,
        max = policy.target_total + PROMPT_WINDOW,
        phases = phase_budget(policy),
        cap = policy.directive_cap,
    )
}

/// Shorter prompt for the fallback attempt, paired with the reduced schema.
pub fn fallback(topic: &str, policy: &PacingPolicy) -> String {
    format!(
        r#"Generate a {target:.0}-second Manim educational video for "{topic}".

Structure: hook, conceptual foundation, main content with animations, summary.
Use smooth animations and self.wait() pauses so the total runs {min:.0}-{max:.0} seconds.

Return ONLY valid JSON:
{{
  "class_name": "EducationalScene",
  "complete_script": "from manim import *\n\nclass EducationalScene(Scene):\n    def construct(self):\n        ..."
}}"#,
        topic = topic,
        target = policy.target_total,
        min = policy.target_total - PROMPT_WINDOW,
        max = policy.target_total + PROMPT_WINDOW,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_name_topic_and_duration_window() {
        let policy = PacingPolicy::default();
        for prompt in [primary("Entropy", &policy), fallback("Entropy", &policy)] {
            assert!(prompt.contains("\"Entropy\""));
            assert!(prompt.contains("28-second") || prompt.contains("about 28 seconds"));
            assert!(prompt.contains("26-30"));
        }
    }

    #[test]
    fn phase_budget_follows_target() {
        let budget = phase_budget(&PacingPolicy::default());
        assert_eq!(budget.lines().count(), 5);
        assert!(budget.contains("40-50% of the video, about 11-14 seconds"));
    }
}
