//! Plan handling: wire types, normalization, graph construction, validation.

pub mod builder;
pub mod normalize;
pub mod validate;
pub mod wire;

pub use builder::{
    BuildOptions, DependencyMode, PlanningError, TaskGraph, UnresolvedDependency,
    build_task_graph, format_minutes, planning_response_to_meeting,
    planning_response_to_meeting_on,
};
pub use normalize::normalize_plan;
pub use validate::{PlanReport, PlanWarning, validate_plan};
pub use wire::{
    AnalysisResult, IssueReference, MeetingContext, Participant, PlanStatus, PlanningMilestone,
    PlanningPlan, PlanningResponse, PlanningTask, ProjectInfo,
};
