//! Shared fixtures for sprintgraph integration tests.
//!
//! Builders for planner output ([`PlanBuilder`], [`TaskBuilder`]), canned
//! analysis responses and contexts, and hand-made store records for tests
//! that never run the graph builder.

use std::io::Write;
use std::path::Path;

use sprintgraph_core::plan::{
    AnalysisResult, MeetingContext, Participant, PlanStatus, PlanningMilestone, PlanningPlan,
    PlanningResponse, PlanningTask, ProjectInfo,
};
use sprintgraph_store::models::{MeetingSummary, TaskNode, TaskStatus};

// ---------------------------------------------------------------------------
// Planner output
// ---------------------------------------------------------------------------

/// Builder for a single [`PlanningTask`].
#[derive(Debug, Clone, Default)]
pub struct TaskBuilder {
    task: PlanningTask,
}

impl TaskBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            task: PlanningTask {
                title: title.to_owned(),
                ..Default::default()
            },
        }
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.task.owner = Some(owner.to_owned());
        self
    }

    pub fn eta(mut self, days: f64) -> Self {
        self.task.eta_days = Some(days);
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.task.notes = Some(notes.to_owned());
        self
    }

    pub fn areas(mut self, areas: &[&str]) -> Self {
        self.task.areas = areas.iter().map(|a| (*a).to_owned()).collect();
        self
    }

    pub fn depends_on(mut self, titles: &[&str]) -> Self {
        self.task.depends_on = titles.iter().map(|t| (*t).to_owned()).collect();
        self
    }

    pub fn build(self) -> PlanningTask {
        self.task
    }
}

impl From<TaskBuilder> for PlanningTask {
    fn from(builder: TaskBuilder) -> Self {
        builder.build()
    }
}

/// Builder for a [`PlanningPlan`]. Starts with no summary, risks, or
/// milestones, the same as an empty planner response.
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    plan: PlanningPlan,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.plan.summary = Some(summary.to_owned());
        self
    }

    pub fn risk(mut self, risk: &str) -> Self {
        self.plan.risks.push(risk.to_owned());
        self
    }

    /// Append a milestone holding `tasks` in order.
    pub fn milestone<T: Into<PlanningTask>>(
        mut self,
        title: &str,
        tasks: impl IntoIterator<Item = T>,
    ) -> Self {
        self.plan.milestones.push(PlanningMilestone {
            title: title.to_owned(),
            due_date: None,
            tasks: tasks.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn build(self) -> PlanningPlan {
        self.plan
    }
}

/// Two milestones, "setup" then "build" depending on it, one risk.
pub fn two_milestone_plan() -> PlanningPlan {
    PlanBuilder::new()
        .summary("Stand up the service")
        .risk("r1")
        .milestone("A", [TaskBuilder::new("setup")])
        .milestone("B", [TaskBuilder::new("build").depends_on(&["setup"])])
        .build()
}

// ---------------------------------------------------------------------------
// Analysis responses
// ---------------------------------------------------------------------------

pub fn sample_context(meeting_id: &str) -> MeetingContext {
    MeetingContext {
        meeting_id: meeting_id.to_owned(),
        project: ProjectInfo {
            name: "Atlas".to_owned(),
            repository_url: Some("https://example.com/atlas.git".to_owned()),
            goal: Some("Ship v1".to_owned()),
        },
        participants: vec![
            Participant {
                name: "Ada".to_owned(),
                role: "engineer".to_owned(),
            },
            Participant {
                name: "Grace".to_owned(),
                role: "lead".to_owned(),
            },
        ],
        issues: vec![],
        transcript: Some("We agreed to set things up first.".to_owned()),
    }
}

pub fn ready_response(meeting_id: &str, plan: PlanningPlan) -> PlanningResponse {
    PlanningResponse {
        meeting_id: meeting_id.to_owned(),
        status: PlanStatus::Ready,
        plan: Some(plan),
        agent_job_id: None,
        error: None,
        transcript: None,
        prompt: None,
        revision: None,
    }
}

pub fn failed_response(meeting_id: &str, error: Option<&str>) -> PlanningResponse {
    PlanningResponse {
        meeting_id: meeting_id.to_owned(),
        status: PlanStatus::Failed,
        plan: None,
        agent_job_id: None,
        error: error.map(str::to_owned),
        transcript: None,
        prompt: None,
        revision: None,
    }
}

/// A ready response paired with a matching context.
pub fn analysis_result(meeting_id: &str, plan: PlanningPlan) -> AnalysisResult {
    AnalysisResult {
        response: ready_response(meeting_id, plan),
        context: sample_context(meeting_id),
    }
}

// ---------------------------------------------------------------------------
// Store records
// ---------------------------------------------------------------------------

pub fn task_node(id: &str) -> TaskNode {
    TaskNode {
        id: id.to_owned(),
        name: format!("task {id}"),
        description: String::new(),
        owner: "Unassigned".to_owned(),
        depends_on: vec![],
        hours: 6,
        risk: "Unspecified risk".to_owned(),
        status: TaskStatus::Pending,
    }
}

/// A meeting holding a default [`task_node`] per id.
pub fn meeting(id: &str, task_ids: &[&str]) -> MeetingSummary {
    let tasks: Vec<TaskNode> = task_ids.iter().map(|t| task_node(t)).collect();
    let hours: u64 = tasks.iter().map(|t| u64::from(t.hours)).sum();
    MeetingSummary {
        id: id.to_owned(),
        title: format!("meeting {id}"),
        date: "1/1/2026".to_owned(),
        attendees: vec![],
        summary: String::new(),
        minutes: String::new(),
        tasks,
        resources: vec![],
        hours,
        cost: hours * 120,
        transcript: None,
        prompt: None,
        revision: None,
    }
}

pub fn meeting_with_revision(id: &str, task_ids: &[&str], revision: u64) -> MeetingSummary {
    MeetingSummary {
        revision: Some(revision),
        ..meeting(id, task_ids)
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Serialize `value` as pretty JSON into `dir/name` and return the path.
pub fn write_json<T: serde::Serialize>(dir: &Path, name: &str, value: &T) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create fixture file");
    let json = serde_json::to_string_pretty(value).expect("serialize fixture");
    file.write_all(json.as_bytes()).expect("write fixture file");
    path
}
