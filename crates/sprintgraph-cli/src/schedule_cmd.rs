//! `sprintgraph schedule` command: timing and workload for one meeting.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use sprintgraph_core::allocation::{OwnerAllocation, allocate_by_owner};
use sprintgraph_core::schedule::{Schedule, compute_schedule};
use sprintgraph_store::MeetingSummary;

use crate::files::read_json;

/// Everything the command reports, for `--json`.
#[derive(Debug, Serialize)]
pub struct ScheduleReport {
    pub meeting_id: String,
    pub schedule: Schedule,
    pub allocations: Vec<OwnerAllocation>,
}

/// Run the schedule command on a meeting JSON file.
pub fn run_schedule(
    file: &Path,
    capacity_hours: u32,
    hours_per_day: u32,
    json: bool,
) -> Result<()> {
    let meeting: MeetingSummary = read_json(file)?;
    let report = schedule_meeting(&meeting, capacity_hours)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&meeting, &report, hours_per_day);
    }
    Ok(())
}

pub fn schedule_meeting(meeting: &MeetingSummary, capacity_hours: u32) -> Result<ScheduleReport> {
    let schedule = compute_schedule(&meeting.tasks)
        .with_context(|| format!("cannot schedule meeting {}", meeting.id))?;
    Ok(ScheduleReport {
        meeting_id: meeting.id.clone(),
        schedule,
        allocations: allocate_by_owner(&meeting.tasks, capacity_hours),
    })
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn print_report(meeting: &MeetingSummary, report: &ScheduleReport, hours_per_day: u32) {
    println!("Meeting: {} ({})", meeting.title, meeting.id);
    println!();

    if report.schedule.tasks.is_empty() {
        println!("No tasks.");
        return;
    }

    println!(
        "  {:<24} {:<32} {:<14} {:>6} {:>6} {:>6} {:>6}",
        "ID", "TASK", "OWNER", "HOURS", "START", "FINISH", "SLACK"
    );
    println!("{}", "-".repeat(102));
    for task in &report.schedule.tasks {
        let marker = if task.is_critical() { '*' } else { ' ' };
        println!(
            "{marker} {:<24} {:<32} {:<14} {:>6} {:>6} {:>6} {:>6}",
            truncate(&task.id, 24),
            truncate(&task.name, 32),
            truncate(&task.owner, 14),
            task.hours,
            task.earliest_start,
            task.earliest_finish,
            task.slack,
        );
    }
    println!();

    let makespan = report.schedule.makespan;
    if hours_per_day > 0 {
        let days = makespan as f64 / f64::from(hours_per_day);
        println!("Makespan: {makespan}h (~{days:.1} days at {hours_per_day}h/day)");
    } else {
        println!("Makespan: {makespan}h");
    }
    println!("Critical path: {}", report.schedule.critical_path.join(" -> "));
    println!();

    println!("{:<20} {:>10} {:>10} {:>8}", "OWNER", "ALLOCATED", "CAPACITY", "UTIL");
    for owner in &report.allocations {
        let flag = if owner.is_overbooked() { " !" } else { "" };
        println!(
            "{:<20} {:>10} {:>10} {:>7.0}%{flag}",
            truncate(&owner.name, 20),
            owner.allocated_hours,
            owner.capacity_hours,
            owner.utilization * 100.0,
        );
    }
}
