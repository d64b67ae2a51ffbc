use crate::allocation::{ResourceAllocation, allocate};
use crate::auto_schedule::{self, AutoScheduleOptions};
use crate::cpm::{self, ScheduleBounds};
use crate::dependency::{Dependency, DependencyStatus};
use crate::error::ScheduleError;
use crate::gantt::{GanttRow, gantt_rows};
use crate::graph::{ScheduleDag, detect_cycle, would_create_cycle};
use crate::resource::Resource;
use crate::schedule::{CriticalPathSummary, ScheduleResult};
use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One project's tasks, edges and options, as sent by a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Absent options fall back to the configured defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<AutoScheduleOptions>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl ScheduleRequest {
    pub fn new(tasks: Vec<Task>, dependencies: Vec<Dependency>) -> Self {
        Self {
            tasks,
            dependencies,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: AutoScheduleOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
        self
    }

    /// Fill in `defaults` when the request carries no options of its own.
    pub fn or_defaults(mut self, defaults: &AutoScheduleOptions) -> Self {
        self.options.get_or_insert_with(|| defaults.clone());
        self
    }

    pub fn effective_options(&self) -> AutoScheduleOptions {
        self.options.clone().unwrap_or_default()
    }

    fn build(&self) -> Result<ScheduleDag, ScheduleError> {
        ScheduleDag::build(&self.tasks, &self.dependencies)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyValidation {
    pub task_count: usize,
    pub dependency_count: usize,
    pub topological_order: Vec<TaskId>,
    pub dependencies: Vec<DependencyStatus>,
}

/// Answer for a single proposed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCheck {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<TaskId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub schedule: ScheduleResult,
    pub critical_path: CriticalPathSummary,
    pub resource_allocation: Vec<ResourceAllocation>,
}

/// Structural check of the request's graph, with the criticality of every edge.
pub fn validate_dependencies(
    request: &ScheduleRequest,
) -> Result<DependencyValidation, ScheduleError> {
    let dag = request.build()?;
    let report = detect_cycle(&dag).into_result()?;
    let options = request.effective_options();
    let calendar = options.calendar()?;

    // Without a resolvable start there are no pins either, so any anchor gives
    // the same slack. An end bound has nothing to be measured from.
    let bounds = match options.resolve_bounds(&dag) {
        Ok(bounds) => bounds,
        Err(ScheduleError::MissingStartDate) if options.end_date.is_none() => {
            ScheduleBounds::starting(NaiveDate::default())
        }
        Err(err) => return Err(err),
    };
    let result = cpm::schedule(&dag, &report, &calendar, bounds)?;

    Ok(DependencyValidation {
        task_count: dag.task_count(),
        dependency_count: dag.dependency_count(),
        topological_order: report.topological_ids(&dag),
        dependencies: result.dependencies,
    })
}

/// Whether adding `candidate` to the request's graph keeps it valid.
pub fn check_dependency(
    request: &ScheduleRequest,
    candidate: &Dependency,
) -> Result<DependencyCheck, ScheduleError> {
    let dag = request.build()?;
    detect_cycle(&dag).into_result()?;

    let duplicate = request.dependencies.iter().any(|dep| {
        dep.depends_on_id == candidate.depends_on_id
            && dep.task_id == candidate.task_id
            && dep.kind == candidate.kind
    });
    if duplicate {
        return Err(ScheduleError::DuplicateDependency {
            depends_on_id: candidate.depends_on_id,
            task_id: candidate.task_id,
            kind: candidate.kind,
        });
    }

    let cycle = would_create_cycle(&dag, candidate)?;
    Ok(DependencyCheck {
        valid: cycle.is_none(),
        cycle,
    })
}

pub fn auto_schedule(request: &ScheduleRequest) -> Result<ScheduleResult, ScheduleError> {
    let dag = request.build()?;
    auto_schedule::auto_schedule(&dag, &request.effective_options())
}

pub fn critical_path(request: &ScheduleRequest) -> Result<CriticalPathSummary, ScheduleError> {
    Ok(auto_schedule(request)?.critical_path_summary())
}

fn allocations_for(
    request: &ScheduleRequest,
    result: &ScheduleResult,
) -> Result<Vec<ResourceAllocation>, ScheduleError> {
    let calendar = request.effective_options().calendar()?;
    Ok(allocate(result, &request.tasks, &request.resources, &calendar)
        .into_values()
        .collect())
}

pub fn resource_allocation(
    request: &ScheduleRequest,
) -> Result<Vec<ResourceAllocation>, ScheduleError> {
    let result = auto_schedule(request)?;
    allocations_for(request, &result)
}

pub fn gantt(request: &ScheduleRequest) -> Result<Vec<GanttRow>, ScheduleError> {
    let result = auto_schedule(request)?;
    Ok(gantt_rows(&result, &request.tasks))
}

/// Build, schedule and allocate in one go.
pub fn run(request: &ScheduleRequest) -> Result<ScheduleResponse, ScheduleError> {
    let schedule = auto_schedule(request)?;
    let resource_allocation = allocations_for(request, &schedule)?;
    Ok(ScheduleResponse {
        critical_path: schedule.critical_path_summary(),
        schedule,
        resource_allocation,
    })
}

/// Independent projects scheduled in parallel; results keep the input order.
pub fn schedule_batch(
    requests: &[ScheduleRequest],
) -> Vec<Result<ScheduleResponse, ScheduleError>> {
    tracing::debug!(projects = requests.len(), "scheduling batch");
    requests.par_iter().map(run).collect()
}
