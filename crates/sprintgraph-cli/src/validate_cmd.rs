//! `sprintgraph validate` command: report dependency problems in a plan.

use std::path::Path;

use anyhow::{Result, bail};

use sprintgraph_core::plan::{AnalysisResult, PlanReport, normalize_plan, validate_plan};

use crate::files::read_json;

/// Run the validate command.
///
/// The report covers the plan as the builder sees it, after normalization.
/// With `strict`, any warning makes the command fail.
pub fn run_validate(file: &Path, strict: bool, json: bool) -> Result<()> {
    let result: AnalysisResult = read_json(file)?;
    let report = validate_result(&result)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&result.response.meeting_id, &report);
    }

    if strict && !report.is_clean() {
        bail!(
            "plan for meeting {} has {} warning(s)",
            result.response.meeting_id,
            report.warnings.len()
        );
    }
    Ok(())
}

pub fn validate_result(result: &AnalysisResult) -> Result<PlanReport> {
    let Some(plan) = &result.response.plan else {
        bail!(
            "response for meeting {} carries no plan (status: {})",
            result.response.meeting_id,
            result.response.status
        );
    };
    Ok(validate_plan(&normalize_plan(plan.clone())))
}

fn print_report(meeting_id: &str, report: &PlanReport) {
    println!("Meeting: {meeting_id}");
    println!("Tasks: {}", report.task_count);
    if report.is_clean() {
        println!("No problems found.");
        return;
    }
    println!("Warnings ({}):", report.warnings.len());
    for warning in &report.warnings {
        println!("  - {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprintgraph_core::plan::PlanWarning;
    use sprintgraph_test_utils::{
        PlanBuilder, TaskBuilder, analysis_result, failed_response, write_json,
    };

    fn result_with_dangling_dependency() -> AnalysisResult {
        let plan = PlanBuilder::new()
            .milestone("A", [TaskBuilder::new("deploy").depends_on(&["build"])])
            .build();
        analysis_result("m1", plan)
    }

    #[test]
    fn reports_unresolved_title() {
        let report = validate_result(&result_with_dangling_dependency()).unwrap();
        assert_eq!(
            report.warnings,
            vec![PlanWarning::UnresolvedDependency {
                task: "deploy".to_owned(),
                dependency: "build".to_owned()
            }]
        );
    }

    #[test]
    fn validates_normalized_plan() {
        let report = validate_result(&analysis_result("m1", PlanBuilder::new().build())).unwrap();
        assert_eq!(report.task_count, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn missing_plan_is_an_error() {
        let mut result = analysis_result("m1", PlanBuilder::new().build());
        result.response = failed_response("m1", None);
        let err = validate_result(&result).unwrap_err();
        assert!(err.to_string().contains("carries no plan"));
    }

    #[test]
    fn strict_mode_fails_on_warnings() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_json(tmp.path(), "result.json", &result_with_dangling_dependency());

        assert!(run_validate(&path, false, true).is_ok());
        let err = run_validate(&path, true, true).unwrap_err();
        assert!(err.to_string().contains("1 warning(s)"));
    }
}
