//! Per-owner workload allocation.

use serde::Serialize;

use sprintgraph_store::models::TaskNode;

/// Hours one owner can take on in a planning window.
pub const DEFAULT_CAPACITY_HOURS: u32 = 120;

/// Workload assigned to one owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerAllocation {
    pub name: String,
    pub capacity_hours: u32,
    pub allocated_hours: u64,
    /// `allocated_hours / capacity_hours`; above 1.0 means overbooked.
    pub utilization: f64,
    /// Task ids in input order.
    pub tasks: Vec<String>,
}

impl OwnerAllocation {
    pub fn is_overbooked(&self) -> bool {
        self.allocated_hours > u64::from(self.capacity_hours)
    }
}

/// Group `tasks` by owner, in the order owners first appear.
///
/// A zero capacity reports zero utilization rather than dividing by zero.
pub fn allocate_by_owner(tasks: &[TaskNode], capacity_hours: u32) -> Vec<OwnerAllocation> {
    let mut allocations: Vec<OwnerAllocation> = Vec::new();
    for task in tasks {
        let idx = match allocations.iter().position(|a| a.name == task.owner) {
            Some(idx) => idx,
            None => {
                allocations.push(OwnerAllocation {
                    name: task.owner.clone(),
                    capacity_hours,
                    allocated_hours: 0,
                    utilization: 0.0,
                    tasks: Vec::new(),
                });
                allocations.len() - 1
            }
        };
        let entry = &mut allocations[idx];
        entry.allocated_hours += u64::from(task.hours);
        entry.tasks.push(task.id.clone());
    }

    for entry in &mut allocations {
        if capacity_hours > 0 {
            entry.utilization = entry.allocated_hours as f64 / f64::from(capacity_hours);
        }
    }
    allocations
}
