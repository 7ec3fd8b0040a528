//! `sprintgraph build` command: turn one analysis result into a meeting.

use std::path::Path;

use anyhow::{Context, Result};

use sprintgraph_core::plan::{AnalysisResult, BuildOptions, planning_response_to_meeting};
use sprintgraph_store::MeetingSummary;

use crate::files::{read_json, write_json};

/// Run the build command.
pub fn run_build(file: &Path, output: Option<&Path>, options: &BuildOptions) -> Result<()> {
    let result: AnalysisResult = read_json(file)?;
    let meeting = build_meeting(&result, options)?;
    write_json(&meeting, output)
}

/// Build the meeting for `result`, with the meeting id attached to failures.
pub fn build_meeting(result: &AnalysisResult, options: &BuildOptions) -> Result<MeetingSummary> {
    planning_response_to_meeting(&result.response, &result.context, options)
        .with_context(|| format!("cannot build meeting {}", result.response.meeting_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprintgraph_test_utils::{
        analysis_result, failed_response, two_milestone_plan, write_json as write_fixture,
    };

    #[test]
    fn writes_meeting_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = analysis_result("m1", two_milestone_plan());
        let input = write_fixture(tmp.path(), "result.json", &result);
        let output = tmp.path().join("meeting.json");

        run_build(&input, Some(&output), &BuildOptions::default()).unwrap();

        let meeting: MeetingSummary = read_json(&output).unwrap();
        assert_eq!(meeting.id, "m1");
        assert_eq!(meeting.tasks.len(), 2);
        assert_eq!(meeting.cost, 1440);
    }

    #[test]
    fn failed_response_is_an_error_with_upstream_message() {
        let mut result = analysis_result("m1", two_milestone_plan());
        result.response = failed_response("m1", Some("analysis timed out"));

        let err = build_meeting(&result, &BuildOptions::default()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("cannot build meeting m1"), "got: {msg}");
        assert!(msg.contains("analysis timed out"), "got: {msg}");
    }
}
