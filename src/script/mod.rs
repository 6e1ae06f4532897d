//! Offline processing of a generated Manim script: structural checks,
//! defect repair, re-indentation and pacing.

pub mod indent;
pub mod pacing;
pub mod repair;
pub mod stats;
pub mod validate;

pub use indent::reflow;
pub use pacing::{DurationBalancer, DurationEstimate, PacingPolicy};
pub use repair::{RepairEngine, RepairRule};
pub use stats::ScriptStats;
pub use validate::validate;

use crate::error::Result;

/// Validate, repair, re-indent and pace a raw script.
#[derive(Debug, Clone, Default)]
pub struct ScriptProcessor {
    repair: RepairEngine,
    balancer: DurationBalancer,
}

impl ScriptProcessor {
    pub fn new(repair: RepairEngine, balancer: DurationBalancer) -> Self {
        Self { repair, balancer }
    }

    pub fn balancer(&self) -> &DurationBalancer {
        &self.balancer
    }

    pub fn process(&self, raw: &str) -> Result<String> {
        let checked = validate(raw)?;
        let repaired = self.repair.repair(checked);
        let reflowed = reflow(&repaired);
        let paced = self.balancer.normalize(&reflowed);

        ScriptStats::collect(&paced, &self.balancer).log();
        Ok(paced)
    }
}
