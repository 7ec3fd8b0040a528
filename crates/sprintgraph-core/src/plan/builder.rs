//! Task graph construction.
//!
//! Turns a normalized plan into [`TaskNode`]s with resolved dependency edges
//! and wraps them into a [`MeetingSummary`]. Dependencies are declared by
//! task *title*, so the build runs in two passes: the first assigns every
//! task its id and records a title -> id map, the second resolves edges
//! against that map only.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sprintgraph_store::models::{MeetingSummary, TaskNode, TaskStatus};

use super::normalize::normalize_plan;
use super::wire::{MeetingContext, PlanStatus, PlanningPlan, PlanningResponse, PlanningTask};

pub const DEFAULT_HOURS_PER_DAY: u32 = 6;
pub const DEFAULT_HOURLY_RATE: u32 = 120;
pub const MIN_TASK_HOURS: u32 = 2;
pub const UNASSIGNED_OWNER: &str = "Unassigned";
pub const UNSPECIFIED_RISK: &str = "Unspecified risk";
pub const GENERIC_FAILURE_MESSAGE: &str = "Planning failed";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How dependency titles that match no task are reported.
///
/// The built graph is the same in every mode: such edges are always dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyMode {
    /// Trace at debug level only.
    #[default]
    Silent,
    /// Log every dropped edge as a warning.
    Warn,
}

impl fmt::Display for DependencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Silent => "silent",
            Self::Warn => "warn",
        };
        f.write_str(s)
    }
}

impl FromStr for DependencyMode {
    type Err = DependencyModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "silent" => Ok(Self::Silent),
            "warn" => Ok(Self::Warn),
            other => Err(DependencyModeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`DependencyMode`] string.
#[derive(Debug, Clone, Error)]
#[error("invalid dependency mode {0:?} (expected silent or warn)")]
pub struct DependencyModeParseError(pub String);

/// Tunables for a build. The defaults are the fixed conversion rates the
/// planner's output is calibrated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Working hours credited per estimated day.
    pub hours_per_day: u32,
    /// Cost per hour of work.
    pub hourly_rate: u32,
    pub dependency_mode: DependencyMode,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            hourly_rate: DEFAULT_HOURLY_RATE,
            dependency_mode: DependencyMode::Silent,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and results
// ---------------------------------------------------------------------------

/// Errors that prevent a meeting from being built.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanningError {
    /// The analysis service did not produce a plan.
    #[error("{message}")]
    Upstream {
        meeting_id: String,
        status: PlanStatus,
        message: String,
    },

    #[error("context is for meeting {context:?} but the response is for {response:?}")]
    MeetingIdMismatch { response: String, context: String },
}

/// A dependency title that matched no task and was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedDependency {
    pub task_id: String,
    pub task_title: String,
    pub dependency: String,
}

/// Output of [`build_task_graph`].
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    /// Nodes in plan order (milestone by milestone).
    pub tasks: Vec<TaskNode>,
    pub unresolved: Vec<UnresolvedDependency>,
    /// Sum of task hours, widened so large estimates cannot overflow.
    pub hours: u64,
    pub cost: u64,
    /// Union of task areas, first-seen order.
    pub resources: Vec<String>,
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// Synthetic node id for the task at `task_index` in milestone `milestone_index`.
pub fn task_id(meeting_id: &str, milestone_index: usize, task_index: usize) -> String {
    format!("{meeting_id}-task-{milestone_index}-{task_index}")
}

/// Convert an estimate in days to whole hours, never below [`MIN_TASK_HOURS`].
///
/// A missing estimate counts as one day.
pub fn estimate_hours(eta_days: Option<f64>, hours_per_day: u32) -> u32 {
    let raw = (eta_days.unwrap_or(1.0) * f64::from(hours_per_day)).round();
    // `as` saturates: negatives and NaN become 0, overflow becomes u32::MAX.
    (raw as u32).max(MIN_TASK_HOURS)
}

/// Risk tag for the task at `task_index` within its milestone.
///
/// Cycles through `risks`. An empty entry falls back to the first risk,
/// then to [`UNSPECIFIED_RISK`].
pub fn select_risk(risks: &[String], task_index: usize) -> String {
    let fallback = risks
        .first()
        .filter(|r| !r.is_empty())
        .map(String::as_str)
        .unwrap_or(UNSPECIFIED_RISK);
    if risks.is_empty() {
        return fallback.to_owned();
    }
    let picked = &risks[task_index % risks.len()];
    if picked.is_empty() {
        fallback.to_owned()
    } else {
        picked.clone()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Graph build
// ---------------------------------------------------------------------------

/// Build the task graph for one meeting.
///
/// `plan` is expected to be normalized; an empty risk list still yields the
/// [`UNSPECIFIED_RISK`] sentinel rather than an empty tag.
pub fn build_task_graph(
    meeting_id: &str,
    plan: &PlanningPlan,
    options: &BuildOptions,
) -> TaskGraph {
    // Pass 1: assign ids, build nodes without edges, record title -> id.
    let mut title_to_id: HashMap<&str, String> = HashMap::new();
    let mut nodes: Vec<TaskNode> = Vec::with_capacity(plan.task_count());
    let mut declared: Vec<&PlanningTask> = Vec::with_capacity(plan.task_count());

    for (milestone_index, milestone) in plan.milestones.iter().enumerate() {
        for (task_index, task) in milestone.tasks.iter().enumerate() {
            let id = task_id(meeting_id, milestone_index, task_index);
            // Later tasks with the same title shadow earlier ones.
            title_to_id.insert(task.title.as_str(), id.clone());

            nodes.push(TaskNode {
                id,
                name: task.title.clone(),
                description: non_empty(task.notes.as_deref())
                    .unwrap_or(&milestone.title)
                    .to_owned(),
                owner: non_empty(task.owner.as_deref())
                    .unwrap_or(UNASSIGNED_OWNER)
                    .to_owned(),
                depends_on: Vec::new(),
                hours: estimate_hours(task.eta_days, options.hours_per_day),
                risk: select_risk(&plan.risks, task_index),
                status: TaskStatus::Pending,
            });
            declared.push(task);
        }
    }

    // Pass 2: resolve declared titles against the map; drop what is missing.
    let mut unresolved = Vec::new();
    for (node, task) in nodes.iter_mut().zip(&declared) {
        let mut seen: HashSet<&str> = HashSet::new();
        for dependency in &task.depends_on {
            match title_to_id.get(dependency.as_str()) {
                Some(dep_id) => {
                    if seen.insert(dep_id.as_str()) {
                        node.depends_on.push(dep_id.clone());
                    }
                }
                None => {
                    match options.dependency_mode {
                        DependencyMode::Silent => tracing::debug!(
                            meeting_id = %meeting_id,
                            task = %node.name,
                            dependency = %dependency,
                            "dropping unresolved dependency"
                        ),
                        DependencyMode::Warn => tracing::warn!(
                            meeting_id = %meeting_id,
                            task = %node.name,
                            dependency = %dependency,
                            "dropping unresolved dependency"
                        ),
                    }
                    unresolved.push(UnresolvedDependency {
                        task_id: node.id.clone(),
                        task_title: node.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
    }

    let hours: u64 = nodes.iter().map(|n| u64::from(n.hours)).sum();
    let cost = hours.saturating_mul(u64::from(options.hourly_rate));

    let mut seen_areas: HashSet<&str> = HashSet::new();
    let resources: Vec<String> = declared
        .iter()
        .flat_map(|task| task.areas.iter())
        .filter(|area| seen_areas.insert(area.as_str()))
        .cloned()
        .collect();

    tracing::debug!(
        meeting_id = %meeting_id,
        tasks = nodes.len(),
        unresolved = unresolved.len(),
        hours,
        "task graph built"
    );

    TaskGraph {
        tasks: nodes,
        unresolved,
        hours,
        cost,
        resources,
    }
}

// ---------------------------------------------------------------------------
// Meeting build
// ---------------------------------------------------------------------------

/// Render the plain-text minutes for a plan: summary, blank line, then each
/// milestone followed by a bullet per task.
pub fn format_minutes(plan: &PlanningPlan) -> String {
    let mut lines: Vec<String> = vec![plan.summary.clone().unwrap_or_default(), String::new()];
    for milestone in &plan.milestones {
        let mut block = milestone.title.clone();
        for task in &milestone.tasks {
            block.push_str("\n• ");
            block.push_str(&task.title);
        }
        lines.push(block);
    }
    lines.join("\n").trim().to_owned()
}

/// Format a date the way meeting records display it (`M/D/YYYY`).
pub fn format_meeting_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

/// Build a [`MeetingSummary`] from an analysis response, dated today.
pub fn planning_response_to_meeting(
    response: &PlanningResponse,
    context: &MeetingContext,
    options: &BuildOptions,
) -> Result<MeetingSummary, PlanningError> {
    let today = chrono::Local::now().date_naive();
    planning_response_to_meeting_on(response, context, today, options)
}

/// Build a [`MeetingSummary`] from an analysis response with an explicit date.
///
/// Fails without side effects when the response carries no usable plan.
pub fn planning_response_to_meeting_on(
    response: &PlanningResponse,
    context: &MeetingContext,
    date: NaiveDate,
    options: &BuildOptions,
) -> Result<MeetingSummary, PlanningError> {
    let plan = match (&response.status, &response.plan) {
        (PlanStatus::Ready, Some(plan)) => plan,
        _ => {
            let message = non_empty(response.error.as_deref())
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_owned();
            return Err(PlanningError::Upstream {
                meeting_id: response.meeting_id.clone(),
                status: response.status,
                message,
            });
        }
    };

    if context.meeting_id != response.meeting_id {
        return Err(PlanningError::MeetingIdMismatch {
            response: response.meeting_id.clone(),
            context: context.meeting_id.clone(),
        });
    }

    let plan = normalize_plan(plan.clone());
    let graph = build_task_graph(&response.meeting_id, &plan, options);

    let transcript = non_empty(response.transcript.as_deref())
        .or_else(|| non_empty(context.transcript.as_deref()))
        .map(str::to_owned);

    Ok(MeetingSummary {
        id: response.meeting_id.clone(),
        title: context.project.name.clone(),
        date: format_meeting_date(date),
        attendees: context.participants.iter().map(|p| p.name.clone()).collect(),
        minutes: format_minutes(&plan),
        summary: plan.summary.unwrap_or_default(),
        tasks: graph.tasks,
        resources: graph.resources,
        hours: graph.hours,
        cost: graph.cost,
        transcript,
        prompt: response.prompt.clone(),
        revision: response.revision,
    })
}
