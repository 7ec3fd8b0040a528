//! Fill in defaults for incomplete planner output.

use super::wire::{PlanningMilestone, PlanningPlan, PlanningTask};

pub const DEFAULT_SUMMARY: &str = "Planning summary unavailable.";
pub const DEFAULT_RISK: &str = "Risks not specified.";
pub const FALLBACK_MILESTONE_TITLE: &str = "Initial Planning";
pub const FALLBACK_TASK_TITLE: &str = "Review audio transcript and extract action items";
pub const FALLBACK_TASK_NOTES: &str =
    "Generated fallback task because planner did not return milestones.";
pub const FALLBACK_TASK_ETA_DAYS: f64 = 2.0;

/// Return a plan with a non-empty summary, risk list, and milestone list.
///
/// Fields that are already present are passed through untouched. A blank
/// summary is treated as missing.
pub fn normalize_plan(plan: PlanningPlan) -> PlanningPlan {
    let summary = match plan.summary {
        Some(s) if !s.trim().is_empty() => s,
        _ => DEFAULT_SUMMARY.to_owned(),
    };

    let risks = if plan.risks.is_empty() {
        vec![DEFAULT_RISK.to_owned()]
    } else {
        plan.risks
    };

    let milestones = if plan.milestones.is_empty() {
        vec![fallback_milestone()]
    } else {
        plan.milestones
    };

    PlanningPlan {
        summary: Some(summary),
        risks,
        milestones,
    }
}

fn fallback_milestone() -> PlanningMilestone {
    PlanningMilestone {
        title: FALLBACK_MILESTONE_TITLE.to_owned(),
        due_date: None,
        tasks: vec![PlanningTask {
            title: FALLBACK_TASK_TITLE.to_owned(),
            owner: None,
            areas: vec![],
            eta_days: Some(FALLBACK_TASK_ETA_DAYS),
            notes: Some(FALLBACK_TASK_NOTES.to_owned()),
            depends_on: vec![],
        }],
    }
}
