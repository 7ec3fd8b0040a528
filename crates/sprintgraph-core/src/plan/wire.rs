//! JSON wire types exchanged with the meeting-analysis service.
//!
//! Field names follow the service's camelCase contract and are mapped via
//! `serde`. Collections the service may omit default to empty.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single task inside a milestone, as returned by the planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanningTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Code areas, directories, or files the task touches.
    #[serde(default)]
    pub areas: Vec<String>,
    /// Estimated duration in days. May be fractional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Titles (not ids) of tasks that must finish first.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// A named group of tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanningMilestone {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tasks: Vec<PlanningTask>,
}

/// Planner output for one meeting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanningPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub milestones: Vec<PlanningMilestone>,
}

impl PlanningPlan {
    /// Total number of tasks across all milestones.
    pub fn task_count(&self) -> usize {
        self.milestones.iter().map(|m| m.tasks.len()).sum()
    }
}

/// Processing state reported by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Processing,
    Ready,
    Failed,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Response body of the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanningResponse {
    pub meeting_id: String,
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanningPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Monotonic version attached by the producer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

/// A meeting participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub role: String,
}

/// Reference to a tracker issue discussed in the meeting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Project the meeting was about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

/// Request context submitted alongside the meeting audio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeetingContext {
    pub meeting_id: String,
    pub project: ProjectInfo,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub issues: Vec<IssueReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// A completed analysis: the service response paired with the context it
/// was requested with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub response: PlanningResponse,
    pub context: MeetingContext,
}
