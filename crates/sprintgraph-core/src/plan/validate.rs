//! Plan validation.
//!
//! The builder tolerates loosely-specified plans: it drops dependency titles
//! it cannot resolve and lets duplicate titles shadow each other. This module
//! reports those situations as warnings without rejecting the plan:
//! - dependency titles that match no task,
//! - titles shared by more than one task,
//! - tasks that depend on their own title,
//! - dependency cycles among the resolvable edges (Kahn's algorithm).

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use thiserror::Error;

use super::wire::PlanningPlan;

/// A non-fatal problem found in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    #[error("task {task:?} depends on unknown task {dependency:?}")]
    UnresolvedDependency { task: String, dependency: String },

    #[error("title {title:?} is used by {occurrences} tasks; dependencies resolve to the last one")]
    DuplicateTitle { title: String, occurrences: usize },

    #[error("task {task:?} depends on itself")]
    SelfDependency { task: String },

    #[error("dependency cycle detected involving tasks: {}", .tasks.join(", "))]
    DependencyCycle { tasks: Vec<String> },
}

/// Result of [`validate_plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub task_count: usize,
    pub warnings: Vec<PlanWarning>,
}

impl PlanReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Dependency titles that the builder will drop.
    pub fn unresolved(&self) -> impl Iterator<Item = (&str, &str)> {
        self.warnings.iter().filter_map(|w| match w {
            PlanWarning::UnresolvedDependency { task, dependency } => {
                Some((task.as_str(), dependency.as_str()))
            }
            _ => None,
        })
    }
}

/// Inspect a plan for dependency problems.
///
/// Never fails; an empty report means the builder will keep every declared
/// edge.
pub fn validate_plan(plan: &PlanningPlan) -> PlanReport {
    let titles: Vec<&str> = plan
        .milestones
        .iter()
        .flat_map(|m| m.tasks.iter().map(|t| t.title.as_str()))
        .collect();

    let mut warnings = Vec::new();

    // Occurrence counts, reported in first-seen order.
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for title in &titles {
        let count = counts.entry(*title).or_insert(0);
        if *count == 0 {
            first_seen.push(*title);
        }
        *count += 1;
    }
    for title in &first_seen {
        let occurrences = counts[title];
        if occurrences > 1 {
            warnings.push(PlanWarning::DuplicateTitle {
                title: (*title).to_owned(),
                occurrences,
            });
        }
    }

    // Same shadowing rule as the builder: the last occurrence wins.
    let title_to_idx: HashMap<&str, usize> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| (*title, i))
        .collect();

    let n = titles.len();
    let mut adj: Vec<Vec<usize>> = vec![vec![]; n];
    let mut in_degree = vec![0usize; n];

    let tasks = plan.milestones.iter().flat_map(|m| m.tasks.iter());
    for (task_idx, task) in tasks.enumerate() {
        let mut linked: Vec<usize> = Vec::new();
        for dep in &task.depends_on {
            match title_to_idx.get(dep.as_str()) {
                None => warnings.push(PlanWarning::UnresolvedDependency {
                    task: task.title.clone(),
                    dependency: dep.clone(),
                }),
                Some(&dep_idx) => {
                    if dep_idx == task_idx {
                        warnings.push(PlanWarning::SelfDependency {
                            task: task.title.clone(),
                        });
                        continue;
                    }
                    if linked.contains(&dep_idx) {
                        continue;
                    }
                    linked.push(dep_idx);
                    // Edge: dep -> task (dep must complete before task).
                    adj[dep_idx].push(task_idx);
                    in_degree[task_idx] += 1;
                }
            }
        }
    }

    if let Some(cycle) = find_cycle(&adj, in_degree) {
        warnings.push(PlanWarning::DependencyCycle {
            tasks: cycle.into_iter().map(|i| titles[i].to_owned()).collect(),
        });
    }

    PlanReport {
        task_count: n,
        warnings,
    }
}

/// Run Kahn's algorithm and return the indices left unsorted, if any.
fn find_cycle(adj: &[Vec<usize>], mut in_degree: Vec<usize>) -> Option<Vec<usize>> {
    let mut queue: VecDeque<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, deg)| **deg == 0)
        .map(|(i, _)| i)
        .collect();

    let mut sorted_count = 0usize;
    while let Some(node) = queue.pop_front() {
        sorted_count += 1;
        for &neighbor in &adj[node] {
            in_degree[neighbor] -= 1;
            if in_degree[neighbor] == 0 {
                queue.push_back(neighbor);
            }
        }
    }

    if sorted_count == adj.len() {
        return None;
    }
    Some(
        in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg > 0)
            .map(|(i, _)| i)
            .collect(),
    )
}
