//! Scheduling metrics over a built task graph.
//!
//! Computes a topological order, earliest start/finish and slack for every
//! task (critical path method, durations in hours), the overall makespan,
//! and one critical path.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use thiserror::Error;

use sprintgraph_store::models::TaskNode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("dependency cycle detected involving tasks: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Timing of one task, in hours from the start of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledTask {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub hours: u64,
    pub earliest_start: u64,
    pub earliest_finish: u64,
    pub latest_start: u64,
    pub latest_finish: u64,
    /// `latest_start - earliest_start`; zero on the critical path.
    pub slack: u64,
}

impl ScheduledTask {
    pub fn is_critical(&self) -> bool {
        self.slack == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    /// Tasks in topological order; ties keep input order.
    pub tasks: Vec<ScheduledTask>,
    pub makespan: u64,
    /// Ids along one longest dependency chain, first to last.
    pub critical_path: Vec<String>,
}

impl Schedule {
    pub fn task(&self, id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// Compute the schedule for `tasks`.
///
/// Edges pointing at ids outside `tasks` are ignored. Fails if the
/// remaining edges contain a cycle (including a task depending on itself).
pub fn compute_schedule(tasks: &[TaskNode]) -> Result<Schedule, ScheduleError> {
    let n = tasks.len();
    let id_to_idx: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    // preds[i]: tasks i waits on; succs[i]: tasks waiting on i.
    let mut preds: Vec<Vec<usize>> = vec![vec![]; n];
    let mut succs: Vec<Vec<usize>> = vec![vec![]; n];
    for (i, task) in tasks.iter().enumerate() {
        for dep in &task.depends_on {
            if let Some(&d) = id_to_idx.get(dep.as_str()) {
                if !preds[i].contains(&d) {
                    preds[i].push(d);
                    succs[d].push(i);
                }
            }
        }
    }

    let order = topological_order(&preds, &succs).map_err(|stuck| {
        ScheduleError::Cycle(stuck.into_iter().map(|i| tasks[i].id.clone()).collect())
    })?;

    // Forward pass.
    let mut earliest_start = vec![0u64; n];
    let mut earliest_finish = vec![0u64; n];
    for &i in &order {
        earliest_start[i] = preds[i]
            .iter()
            .map(|&p| earliest_finish[p])
            .max()
            .unwrap_or(0);
        earliest_finish[i] = earliest_start[i] + u64::from(tasks[i].hours);
    }
    let makespan = earliest_finish.iter().copied().max().unwrap_or(0);

    // Backward pass.
    let mut latest_finish = vec![makespan; n];
    let mut latest_start = vec![0u64; n];
    for &i in order.iter().rev() {
        latest_finish[i] = succs[i]
            .iter()
            .map(|&s| latest_start[s])
            .min()
            .unwrap_or(makespan);
        latest_start[i] = latest_finish[i] - u64::from(tasks[i].hours);
    }

    let critical_path = critical_path(&preds, &earliest_finish, makespan)
        .into_iter()
        .map(|i| tasks[i].id.clone())
        .collect();

    let scheduled = order
        .iter()
        .map(|&i| ScheduledTask {
            id: tasks[i].id.clone(),
            name: tasks[i].name.clone(),
            owner: tasks[i].owner.clone(),
            hours: u64::from(tasks[i].hours),
            earliest_start: earliest_start[i],
            earliest_finish: earliest_finish[i],
            latest_start: latest_start[i],
            latest_finish: latest_finish[i],
            slack: latest_start[i] - earliest_start[i],
        })
        .collect();

    Ok(Schedule {
        tasks: scheduled,
        makespan,
        critical_path,
    })
}

/// Kahn's algorithm, always taking the lowest ready index next.
///
/// On a cycle, returns the indices that could not be ordered.
fn topological_order(preds: &[Vec<usize>], succs: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let mut in_degree: Vec<usize> = preds.iter().map(Vec::len).collect();
    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, deg)| **deg == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(preds.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &next in &succs[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() == preds.len() {
        Ok(order)
    } else {
        Err(in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg > 0)
            .map(|(i, _)| i)
            .collect())
    }
}

/// Walk back from the first task finishing at `makespan`, always through the
/// first predecessor that finishes exactly when the current task can start.
fn critical_path(preds: &[Vec<usize>], earliest_finish: &[u64], makespan: u64) -> Vec<usize> {
    let Some(mut current) = earliest_finish.iter().position(|&f| f == makespan) else {
        return Vec::new();
    };
    let mut path = vec![current];
    loop {
        let start = preds[current]
            .iter()
            .map(|&p| earliest_finish[p])
            .max()
            .unwrap_or(0);
        let mut candidates: Vec<usize> = preds[current]
            .iter()
            .copied()
            .filter(|&p| earliest_finish[p] == start)
            .collect();
        candidates.sort_unstable();
        match candidates.first() {
            Some(&p) => {
                path.push(p);
                current = p;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
