use crate::calendar::WorkCalendar;
use crate::resource::{Resource, ResourceId};
use crate::schedule::{ScheduleResult, TaskSchedule};
use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Load carried by one resource over the project horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub resource_id: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub total_hours: f64,
    /// Working days in the horizon times working hours per day.
    pub available_hours: f64,
    pub allocation_percentage: f64,
    /// Heaviest single day, with each task's hours spread evenly over its days.
    pub peak_daily_hours: f64,
    pub peak_allocation_percentage: f64,
    pub overallocated: bool,
    pub tasks: Vec<TaskId>,
}

struct Horizon {
    start: NaiveDate,
    end: NaiveDate,
}

impl Horizon {
    /// Exclusive finish; milestones touch the horizon when they sit inside it.
    fn intersects(&self, scheduled: &TaskSchedule) -> bool {
        if scheduled.start_date == scheduled.end_date {
            return self.start <= scheduled.start_date && scheduled.start_date <= self.end;
        }
        scheduled.start_date < self.end && scheduled.end_date > self.start
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-resource load of `result`, keyed by resource id.
///
/// Read-only: nothing is moved here, leveling belongs to the auto-scheduler.
pub fn allocate(
    result: &ScheduleResult,
    tasks: &[Task],
    resources: &[Resource],
    calendar: &WorkCalendar,
) -> BTreeMap<ResourceId, ResourceAllocation> {
    let horizon = Horizon {
        start: result.start_date,
        end: result.end_date,
    };
    let working_days = calendar
        .working_days_between(horizon.start, horizon.end)
        .max(1);
    let hours_per_day = f64::from(calendar.working_hours_per_day());
    let available_hours = working_days as f64 * hours_per_day;
    let names: HashMap<ResourceId, &str> = resources
        .iter()
        .filter_map(|r| r.name.as_deref().map(|name| (r.id, name)))
        .collect();

    // Group contributing tasks by resource
    let mut groups: BTreeMap<ResourceId, Vec<(&Task, &TaskSchedule)>> = BTreeMap::new();
    for task in tasks {
        let Some(scheduled) = result.task(task.id) else {
            continue;
        };
        if !horizon.intersects(scheduled) {
            continue;
        }
        for resource in &task.assignees {
            let group = groups.entry(*resource).or_default();
            if !group.iter().any(|(t, _)| t.id == task.id) {
                group.push((task, scheduled));
            }
        }
    }

    let groups: Vec<(ResourceId, Vec<(&Task, &TaskSchedule)>)> = groups.into_iter().collect();
    groups
        .par_iter()
        .map(|(resource_id, assigned)| {
            let total_hours: f64 = assigned.iter().map(|(t, _)| t.estimated_hours).sum();

            let mut daily: BTreeMap<i64, f64> = BTreeMap::new();
            for (task, scheduled) in assigned {
                if scheduled.duration_days == 0 {
                    continue;
                }
                let first = calendar.working_days_between(horizon.start, scheduled.start_date);
                let per_day = task.estimated_hours / scheduled.duration_days as f64;
                for offset in first..first + scheduled.duration_days {
                    *daily.entry(offset).or_default() += per_day;
                }
            }
            let peak_daily_hours = daily.values().copied().fold(0.0, f64::max);

            let allocation_percentage = total_hours / available_hours * 100.0;
            let mut contributing: Vec<TaskId> = assigned.iter().map(|(t, _)| t.id).collect();
            contributing.sort_unstable();

            let allocation = ResourceAllocation {
                resource_id: *resource_id,
                name: names.get(resource_id).map(|name| name.to_string()),
                total_hours: round2(total_hours),
                available_hours: round2(available_hours),
                allocation_percentage: round2(allocation_percentage),
                peak_daily_hours: round2(peak_daily_hours),
                peak_allocation_percentage: round2(peak_daily_hours / hours_per_day * 100.0),
                overallocated: allocation_percentage > 100.0,
                tasks: contributing,
            };
            (*resource_id, allocation)
        })
        .collect()
}
