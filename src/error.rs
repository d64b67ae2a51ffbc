use crate::dependency::DependencyType;
use crate::task::TaskId;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("dependency references unknown task {task_id}")]
    UnknownTaskReference { task_id: TaskId },

    #[error("duplicate dependency {depends_on_id} -> {task_id} ({kind})")]
    DuplicateDependency {
        depends_on_id: TaskId,
        task_id: TaskId,
        kind: DependencyType,
    },

    #[error("dependency graph contains a cycle: {}", format_cycle(.cycle))]
    CyclicDependencyGraph { cycle: Vec<TaskId> },

    #[error("task {task_id} has invalid duration {hours}")]
    InvalidDuration { task_id: TaskId, hours: f64 },

    #[error("invalid constraint bounds: {0}")]
    InvalidConstraintBounds(BoundsViolation),

    #[error("duplicate task id {task_id}")]
    DuplicateTask { task_id: TaskId },

    #[error("task {task_id} has invalid progress {progress} (must be between 0 and 100)")]
    InvalidProgress { task_id: TaskId, progress: f64 },

    #[error("task {task_id} ends on {end} before it starts on {start}")]
    InvalidTaskDates {
        task_id: TaskId,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid option {field}={value}: {reason}")]
    InvalidOption {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("no start date given and no task carries a planned start")]
    MissingStartDate,

    #[error("dependency {depends_on_id} -> {task_id} has lag {lag}, outside the supported range")]
    InvalidLag {
        depends_on_id: TaskId,
        task_id: TaskId,
        lag: i64,
    },

    #[error("working-day offset {offset} from {anchor} is past the supported date range")]
    DateOutOfRange { anchor: NaiveDate, offset: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundsViolation {
    #[error("end bound {end} is before start bound {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error(
        "end bound {end} is before the earliest feasible finish {required_finish}; \
         task {task_id} cannot meet it"
    )]
    EndBeforeFinish {
        end: NaiveDate,
        required_finish: NaiveDate,
        task_id: TaskId,
    },
}

impl ScheduleError {
    /// Stable machine-readable code used by the CLI and HTTP adapters.
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleError::UnknownTaskReference { .. } => "unknown_task_reference",
            ScheduleError::DuplicateDependency { .. } => "duplicate_dependency",
            ScheduleError::CyclicDependencyGraph { .. } => "cyclic_dependency_graph",
            ScheduleError::InvalidDuration { .. } => "invalid_duration",
            ScheduleError::InvalidConstraintBounds(_) => "invalid_constraint_bounds",
            ScheduleError::DuplicateTask { .. } => "duplicate_task",
            ScheduleError::InvalidProgress { .. } => "invalid_progress",
            ScheduleError::InvalidTaskDates { .. } => "invalid_task_dates",
            ScheduleError::InvalidOption { .. } => "invalid_option",
            ScheduleError::MissingStartDate => "missing_start_date",
            ScheduleError::InvalidLag { .. } => "invalid_lag",
            ScheduleError::DateOutOfRange { .. } => "date_out_of_range",
        }
    }

    pub fn cycle(&self) -> Option<&[TaskId]> {
        match self {
            ScheduleError::CyclicDependencyGraph { cycle } => Some(cycle),
            _ => None,
        }
    }
}

fn format_cycle(cycle: &[TaskId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
