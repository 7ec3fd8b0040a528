//! Integration tests for turning analysis results into meetings.
//!
//! Exercises the full path from a planner response through normalization,
//! graph construction, and merging into a store.

use std::collections::HashSet;

use chrono::NaiveDate;
use proptest::prelude::*;

use sprintgraph_core::plan::builder::{DEFAULT_HOURS_PER_DAY, UNASSIGNED_OWNER, estimate_hours};
use sprintgraph_core::plan::normalize::{FALLBACK_MILESTONE_TITLE, FALLBACK_TASK_TITLE};
use sprintgraph_core::plan::{
    AnalysisResult, BuildOptions, PlanStatus, PlanningError, build_task_graph,
    planning_response_to_meeting_on, validate_plan,
};
use sprintgraph_core::schedule::compute_schedule;
use sprintgraph_store::{MeetingStore, MeetingSummary, MergeOutcome};
use sprintgraph_test_utils::{
    PlanBuilder, TaskBuilder, analysis_result, failed_response, ready_response, sample_context,
    two_milestone_plan,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn build(result: &AnalysisResult, options: &BuildOptions) -> Result<MeetingSummary, PlanningError> {
    planning_response_to_meeting_on(&result.response, &result.context, date(), options)
}

#[test]
fn builds_meeting_from_ready_response() {
    let result = analysis_result("m1", two_milestone_plan());
    let meeting = build(&result, &BuildOptions::default()).expect("ready response should build");

    assert_eq!(meeting.id, "m1");
    assert_eq!(meeting.title, "Atlas");
    assert_eq!(meeting.date, "10/18/2026");
    assert_eq!(meeting.attendees, vec!["Ada", "Grace"]);
    assert_eq!(meeting.summary, "Stand up the service");
    assert_eq!(meeting.minutes, "Stand up the service\n\nA\n• setup\nB\n• build");
    assert_eq!(meeting.hours, 12);
    assert_eq!(meeting.cost, 1440);
    assert_eq!(meeting.tasks[1].depends_on, vec!["m1-task-0-0"]);
    // No transcript on the response: the context's is used.
    assert_eq!(
        meeting.transcript.as_deref(),
        Some("We agreed to set things up first.")
    );
}

#[test]
fn response_transcript_takes_precedence() {
    let mut result = analysis_result("m1", two_milestone_plan());
    result.response.transcript = Some("from the service".to_owned());
    result.response.prompt = Some("prompt text".to_owned());
    result.response.revision = Some(3);

    let meeting = build(&result, &BuildOptions::default()).unwrap();
    assert_eq!(meeting.transcript.as_deref(), Some("from the service"));
    assert_eq!(meeting.prompt.as_deref(), Some("prompt text"));
    assert_eq!(meeting.revision, Some(3));
}

#[test]
fn empty_plan_gets_fallback_task() {
    let result = analysis_result("m1", PlanBuilder::new().build());
    let meeting = build(&result, &BuildOptions::default()).unwrap();

    assert_eq!(meeting.tasks.len(), 1);
    let task = &meeting.tasks[0];
    assert_eq!(task.id, "m1-task-0-0");
    assert_eq!(task.name, FALLBACK_TASK_TITLE);
    assert_eq!(task.hours, 12);
    assert_eq!(task.owner, UNASSIGNED_OWNER);
    assert!(meeting.minutes.contains(FALLBACK_MILESTONE_TITLE));
}

#[test]
fn failed_response_uses_its_error_message() {
    let response = failed_response("m1", Some("transcription failed"));
    let err = planning_response_to_meeting_on(
        &response,
        &sample_context("m1"),
        date(),
        &BuildOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.to_string(), "transcription failed");
    assert!(matches!(
        err,
        PlanningError::Upstream {
            status: PlanStatus::Failed,
            ..
        }
    ));
}

#[test]
fn failed_response_without_message_is_generic() {
    let response = failed_response("m1", None);
    let err = planning_response_to_meeting_on(
        &response,
        &sample_context("m1"),
        date(),
        &BuildOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Planning failed");
}

#[test]
fn ready_response_without_plan_fails() {
    let mut response = ready_response("m1", PlanBuilder::new().build());
    response.plan = None;
    let err = planning_response_to_meeting_on(
        &response,
        &sample_context("m1"),
        date(),
        &BuildOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Planning failed");
}

#[test]
fn processing_response_fails() {
    let mut response = ready_response("m1", two_milestone_plan());
    response.status = PlanStatus::Processing;
    assert!(
        planning_response_to_meeting_on(
            &response,
            &sample_context("m1"),
            date(),
            &BuildOptions::default()
        )
        .is_err()
    );
}

#[test]
fn mismatched_context_is_rejected() {
    let response = ready_response("m1", two_milestone_plan());
    let err = planning_response_to_meeting_on(
        &response,
        &sample_context("m2"),
        date(),
        &BuildOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        PlanningError::MeetingIdMismatch {
            response: "m1".to_owned(),
            context: "m2".to_owned()
        }
    );
}

#[test]
fn failure_leaves_store_untouched() {
    let mut store = MeetingStore::new();
    let ok = analysis_result("m1", two_milestone_plan());
    let meeting = build(&ok, &BuildOptions::default()).unwrap();
    store.add_meeting(meeting);
    let before = store.snapshot();

    let failed = failed_response("m1", Some("boom"));
    let built = planning_response_to_meeting_on(
        &failed,
        &sample_context("m1"),
        date(),
        &BuildOptions::default(),
    );
    if let Ok(meeting) = built {
        store.add_meeting(meeting);
    }
    assert_eq!(store.snapshot(), before);
}

#[test]
fn rebuilt_meeting_replaces_in_store() {
    let mut store = MeetingStore::new();
    let options = BuildOptions::default();

    let first = analysis_result("m1", two_milestone_plan());
    let meeting = build(&first, &options).unwrap();
    assert_eq!(store.add_meeting(meeting), MergeOutcome::Inserted);

    let revised_plan = PlanBuilder::new()
        .risk("r1")
        .milestone("A", [TaskBuilder::new("setup").owner("Ada").eta(2.0)])
        .build();
    let second = analysis_result("m1", revised_plan);
    let meeting = build(&second, &options).unwrap();
    assert_eq!(store.add_meeting(meeting), MergeOutcome::Replaced);

    let task = store.task("m1-task-0-0").unwrap();
    assert_eq!(task.owner, "Ada");
    assert_eq!(task.hours, 12);
    // The old second task is still indexed.
    assert!(store.task("m1-task-1-0").is_some());
}

#[test]
fn built_graph_schedules_along_dependencies() {
    let plan = PlanBuilder::new()
        .risk("r")
        .milestone(
            "Core",
            [
                TaskBuilder::new("schema").eta(1.0),
                TaskBuilder::new("api").eta(2.0).depends_on(&["schema"]),
                TaskBuilder::new("docs").eta(0.5).depends_on(&["schema"]),
            ],
        )
        .milestone(
            "Release",
            [TaskBuilder::new("ship").depends_on(&["api", "docs"])],
        )
        .build();
    let graph = build_task_graph("m", &plan, &BuildOptions::default());
    let schedule = compute_schedule(&graph.tasks).unwrap();

    assert_eq!(schedule.makespan, 6 + 12 + 6);
    assert_eq!(
        schedule.critical_path,
        vec!["m-task-0-0", "m-task-0-1", "m-task-1-0"]
    );
}

#[test]
fn validation_agrees_with_builder_on_unresolved_edges() {
    let plan = PlanBuilder::new()
        .milestone(
            "A",
            [
                TaskBuilder::new("a").depends_on(&["missing"]),
                TaskBuilder::new("b").depends_on(&["a", "also missing"]),
            ],
        )
        .build();
    let graph = build_task_graph("m", &plan, &BuildOptions::default());
    let report = validate_plan(&plan);

    let from_builder: Vec<&str> = graph.unresolved.iter().map(|u| u.dependency.as_str()).collect();
    let from_report: Vec<&str> = report.unresolved().map(|(_, dep)| dep).collect();
    assert_eq!(from_builder, from_report);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn plan_with_shape(shape: &[usize]) -> sprintgraph_core::plan::PlanningPlan {
    shape
        .iter()
        .enumerate()
        .fold(PlanBuilder::new().risk("r"), |builder, (m, &count)| {
            builder.milestone(
                &format!("M{m}"),
                (0..count).map(|t| TaskBuilder::new(&format!("task {m}.{t}"))),
            )
        })
        .build()
}

proptest! {
    #[test]
    fn hours_follow_estimate(days in 0.0f64..500.0) {
        let expected = ((days * 6.0).round() as u32).max(2);
        prop_assert_eq!(estimate_hours(Some(days), DEFAULT_HOURS_PER_DAY), expected);
    }

    #[test]
    fn ids_are_unique_and_positional(shape in prop::collection::vec(0usize..6, 0..6)) {
        let plan = plan_with_shape(&shape);
        let graph = build_task_graph("mtg", &plan, &BuildOptions::default());

        prop_assert_eq!(graph.tasks.len(), shape.iter().sum::<usize>());
        let ids: HashSet<&str> = graph.tasks.iter().map(|t| t.id.as_str()).collect();
        prop_assert_eq!(ids.len(), graph.tasks.len());

        let mut nodes = graph.tasks.iter();
        for (m, &count) in shape.iter().enumerate() {
            for t in 0..count {
                let node = nodes.next().unwrap();
                prop_assert_eq!(&node.id, &format!("mtg-task-{m}-{t}"));
                prop_assert!(node.hours >= 2);
                prop_assert!(!node.risk.is_empty());
            }
        }
    }

    #[test]
    fn build_is_deterministic(shape in prop::collection::vec(0usize..4, 0..4)) {
        let plan = plan_with_shape(&shape);
        let a = build_task_graph("m", &plan, &BuildOptions::default());
        let b = build_task_graph("m", &plan, &BuildOptions::default());
        prop_assert_eq!(a, b);
    }
}
