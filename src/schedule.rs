use crate::dependency::DependencyStatus;
use crate::task::TaskId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Computed dates for one task. Finish dates are exclusive: the first working
/// day after the task's last day of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSchedule {
    pub task_id: TaskId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub earliest_start: NaiveDate,
    pub earliest_finish: NaiveDate,
    pub latest_start: NaiveDate,
    pub latest_finish: NaiveDate,
    pub duration_days: i64,
    /// Latest start minus earliest start, in working days.
    pub slack: i64,
    pub critical: bool,
    /// Clamped to the project start by a lead time or an early pin.
    pub constrained: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Working days between the start bound and the last finish.
    pub total_duration: i64,
    pub critical_path: Vec<TaskId>,
    /// Ordered by task id.
    pub tasks: Vec<TaskSchedule>,
    pub dependencies: Vec<DependencyStatus>,
}

impl ScheduleResult {
    pub fn task(&self, task_id: TaskId) -> Option<&TaskSchedule> {
        self.tasks
            .binary_search_by_key(&task_id, |t| t.task_id)
            .ok()
            .map(|idx| &self.tasks[idx])
    }

    pub fn critical_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.critical).count()
    }

    pub fn constrained_tasks(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.constrained)
            .map(|t| t.task_id)
            .collect()
    }

    pub fn critical_path_summary(&self) -> CriticalPathSummary {
        CriticalPathSummary {
            tasks: self.critical_path.clone(),
            total_duration: self.total_duration,
            start_date: self.start_date,
            end_date: self.end_date,
            slack: self.tasks.iter().map(|t| (t.task_id, t.slack)).collect(),
            task_count: self.tasks.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPathSummary {
    /// Ordered from the first task of the chain to the last.
    pub tasks: Vec<TaskId>,
    pub total_duration: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub slack: BTreeMap<TaskId, i64>,
    pub task_count: usize,
}

impl CriticalPathSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("tasks={}", self.task_count));
        parts.push(format!(
            "critical={}",
            self.slack.values().filter(|s| **s == 0).count()
        ));
        parts.push(format!("start={}", self.start_date));
        parts.push(format!("finish={}", self.end_date));
        parts.push(format!("duration={}d", self.total_duration));
        if !self.tasks.is_empty() {
            let chain = self
                .tasks
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("->");
            parts.push(format!("crit_path={}", chain));
        }
        parts.join(", ")
    }
}
