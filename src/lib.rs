pub mod allocation;
pub mod auto_schedule;
pub mod calculations;
pub mod calendar;
pub mod config;
pub mod cpm;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod gantt;
pub mod graph;
pub mod resource;
pub mod schedule;
pub mod task;
pub mod task_validation;

#[cfg(feature = "http_api")]
pub mod http_api;

pub use allocation::{ResourceAllocation, allocate};
pub use auto_schedule::{AutoScheduleOptions, auto_schedule};
pub use calendar::{CalendarConfig, WorkCalendar, duration_to_days};
pub use config::{ConfigError, EngineConfig};
pub use cpm::{CpmScheduler, ScheduleBounds};
pub use dependency::{Dependency, DependencyStatus, DependencyType};
pub use engine::{ScheduleRequest, ScheduleResponse};
pub use error::{BoundsViolation, ScheduleError};
pub use gantt::{GanttRow, gantt_dataframe};
pub use graph::{CycleReport, ScheduleDag, detect_cycle, would_create_cycle};
pub use resource::{Resource, ResourceId};
pub use schedule::{CriticalPathSummary, ScheduleResult, TaskSchedule};
pub use task::{Task, TaskId, TaskPriority, TaskStatus};
