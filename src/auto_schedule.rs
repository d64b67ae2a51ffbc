use crate::calendar::{CalendarConfig, WorkCalendar};
use crate::cpm::{CpmPasses, CpmScheduler, ScheduleBounds};
use crate::dependency::Window;
use crate::error::ScheduleError;
use crate::graph::{ScheduleDag, detect_cycle};
use crate::resource::ResourceId;
use crate::schedule::ScheduleResult;
use chrono::NaiveDate;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScheduleOptions {
    #[serde(default = "default_true")]
    pub respect_dependencies: bool,
    /// Serialize tasks that share a resource, in priority order.
    #[serde(default)]
    pub optimize_resources: bool,
    #[serde(default = "default_true")]
    pub avoid_weekends: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive project end bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_working_hours_per_day")]
    pub working_hours_per_day: u32,
    #[serde(default)]
    pub buffer_days: i64,
    #[serde(default = "default_true")]
    pub apply_buffer: bool,
}

fn default_true() -> bool {
    true
}

fn default_working_hours_per_day() -> u32 {
    8
}

impl Default for AutoScheduleOptions {
    fn default() -> Self {
        Self {
            respect_dependencies: true,
            optimize_resources: false,
            avoid_weekends: true,
            start_date: None,
            end_date: None,
            working_hours_per_day: default_working_hours_per_day(),
            buffer_days: 0,
            apply_buffer: true,
        }
    }
}

impl AutoScheduleOptions {
    /// Options carrying the calendar knobs of `config` and nothing else.
    pub fn from_calendar(config: &CalendarConfig) -> Self {
        Self {
            avoid_weekends: config.avoid_weekends,
            working_hours_per_day: config.working_hours_per_day,
            buffer_days: config.buffer_days,
            apply_buffer: config.apply_buffer,
            ..Self::default()
        }
    }

    pub fn starting(mut self, start: NaiveDate) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn calendar_config(&self) -> CalendarConfig {
        CalendarConfig {
            avoid_weekends: self.avoid_weekends,
            working_hours_per_day: self.working_hours_per_day,
            buffer_days: self.buffer_days,
            apply_buffer: self.apply_buffer,
        }
    }

    pub fn calendar(&self) -> Result<WorkCalendar, ScheduleError> {
        WorkCalendar::new(&self.calendar_config())
    }

    /// Explicit start, else the earliest planned or pinned start among the tasks.
    pub fn resolve_bounds(&self, dag: &ScheduleDag) -> Result<ScheduleBounds, ScheduleError> {
        let start = match self.start_date {
            Some(start) => start,
            None => dag
                .tasks()
                .flat_map(|task| task.start_date.into_iter().chain(task.pinned_start))
                .min()
                .ok_or(ScheduleError::MissingStartDate)?,
        };
        Ok(ScheduleBounds {
            start,
            end: self.end_date,
        })
    }
}

/// Commit dates for every task of `dag` under `options`.
///
/// Cycles are rejected even when `respect_dependencies` is off.
pub fn auto_schedule(
    dag: &ScheduleDag,
    options: &AutoScheduleOptions,
) -> Result<ScheduleResult, ScheduleError> {
    let calendar = options.calendar()?;
    let bounds = options.resolve_bounds(dag)?;
    let report = detect_cycle(dag).into_result()?;

    let unlinked;
    let working = if options.respect_dependencies {
        dag
    } else {
        unlinked = dag.without_dependencies();
        &unlinked
    };
    let order = report.topological_order();

    let scheduler = CpmScheduler::new(working, &calendar, bounds)?;
    let lower_bounds = scheduler.pinned_bounds();
    let baseline = scheduler.passes(order, &lower_bounds)?;

    let passes = if options.optimize_resources {
        level_resources(&scheduler, working, order, lower_bounds, baseline)?
    } else {
        baseline
    };
    scheduler.finish(&passes)
}

/// Per-resource task sequences, fixed from the baseline schedule.
///
/// Ranked by priority, then slack, then early start. A task never queues
/// ahead of one of its own transitive predecessors on the same resource.
fn resource_sequences(dag: &ScheduleDag, baseline: &CpmPasses) -> Vec<Vec<NodeIndex>> {
    let mut by_resource: BTreeMap<ResourceId, Vec<NodeIndex>> = BTreeMap::new();
    for node in dag.sorted_nodes() {
        for resource in &dag.graph[node].assignees {
            let queue = by_resource.entry(*resource).or_default();
            if !queue.contains(&node) {
                queue.push(node);
            }
        }
    }

    by_resource
        .into_values()
        .map(|mut queue| {
            queue.sort_by_key(|ix| {
                let task = &dag.graph[*ix];
                (
                    Reverse(task.priority.weight()),
                    baseline.slack[ix.index()],
                    baseline.early.windows[ix.index()].start,
                    task.id,
                )
            });
            predecessors_first(dag, queue)
        })
        .collect()
}

fn ancestors(dag: &ScheduleDag, node: NodeIndex) -> HashSet<NodeIndex> {
    let mut seen = HashSet::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        for (pred, _) in dag.incoming(current) {
            if seen.insert(pred) {
                stack.push(pred);
            }
        }
    }
    seen
}

/// Takes the first ranked task with no ancestor still waiting in the queue.
fn predecessors_first(dag: &ScheduleDag, mut pending: Vec<NodeIndex>) -> Vec<NodeIndex> {
    let lineage: HashMap<NodeIndex, HashSet<NodeIndex>> = pending
        .iter()
        .map(|ix| (*ix, ancestors(dag, *ix)))
        .collect();

    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let next = pending
            .iter()
            .position(|ix| !pending.iter().any(|other| lineage[ix].contains(other)))
            .unwrap_or(0);
        ordered.push(pending.remove(next));
    }
    ordered
}

/// Start offsets that clear each task of the ones ahead of it on every resource.
fn plan_shifts(sequences: &[Vec<NodeIndex>], windows: &[Window]) -> BTreeMap<usize, i64> {
    let mut shifts: BTreeMap<usize, i64> = BTreeMap::new();

    for queue in sequences {
        let mut placed: Vec<Window> = Vec::with_capacity(queue.len());
        for node in queue {
            let current = windows[node.index()];
            let duration = current.duration();
            if duration == 0 {
                continue;
            }

            let mut start = current.start;
            while let Some(blocking) = placed
                .iter()
                .filter(|p| p.start < start + duration && start < p.finish)
                .map(|p| p.finish)
                .max()
            {
                start = blocking;
            }
            placed.push(Window::new(start, duration));

            if start > current.start {
                let entry = shifts.entry(node.index()).or_insert(start);
                *entry = (*entry).max(start);
            }
        }
    }
    shifts
}

fn level_resources(
    scheduler: &CpmScheduler<'_>,
    dag: &ScheduleDag,
    order: &[NodeIndex],
    mut lower_bounds: Vec<Option<i64>>,
    baseline: CpmPasses,
) -> Result<CpmPasses, ScheduleError> {
    let sequences = resource_sequences(dag, &baseline);
    let max_rounds = 2 * dag.task_count() + 1;
    let mut passes = baseline;

    for round in 0..max_rounds {
        let shifts = plan_shifts(&sequences, &passes.early.windows);
        if shifts.is_empty() {
            tracing::debug!(rounds = round, "resource leveling settled");
            return Ok(passes);
        }
        tracing::debug!(round, shifted = shifts.len(), "leveling round");

        let mut progressed = false;
        for (ix, start) in shifts {
            let bound = &mut lower_bounds[ix];
            if bound.is_none_or(|b| start > b) {
                *bound = Some(start);
                progressed = true;
            }
        }
        if !progressed {
            tracing::warn!(rounds = round, "resource leveling stalled; some overlap may remain");
            return Ok(passes);
        }
        passes = scheduler.passes(order, &lower_bounds)?;
    }

    tracing::warn!(
        rounds = max_rounds,
        "resource leveling hit its round limit; some resource overlap may remain"
    );
    Ok(passes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{Dependency, DependencyType};
    use crate::task::{Task, TaskPriority};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn options() -> AutoScheduleOptions {
        AutoScheduleOptions {
            avoid_weekends: false,
            ..AutoScheduleOptions::default()
        }
        .starting(d(2025, 1, 1))
    }

    #[test]
    fn options_fill_defaults_from_json() {
        let parsed: AutoScheduleOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, AutoScheduleOptions::default());
        assert!(parsed.respect_dependencies);
        assert!(parsed.avoid_weekends);
        assert!(!parsed.optimize_resources);
    }

    #[test]
    fn start_falls_back_to_the_earliest_planned_date() {
        let mut a = Task::new(1, "a", 8.0);
        a.start_date = Some(d(2025, 2, 10));
        let b = Task::new(2, "b", 8.0).with_pinned_start(d(2025, 2, 3));
        let dag = ScheduleDag::build(&[a, b], &[]).unwrap();

        let bounds = AutoScheduleOptions::default().resolve_bounds(&dag).unwrap();
        assert_eq!(bounds.start, d(2025, 2, 3));

        let bare = ScheduleDag::build(&[Task::new(1, "a", 8.0)], &[]).unwrap();
        assert_eq!(
            AutoScheduleOptions::default().resolve_bounds(&bare),
            Err(ScheduleError::MissingStartDate)
        );
    }

    #[test]
    fn out_of_range_hours_are_rejected() {
        let dag = ScheduleDag::build(&[Task::new(1, "a", 8.0)], &[]).unwrap();
        let opts = AutoScheduleOptions {
            working_hours_per_day: 25,
            ..options()
        };
        let err = auto_schedule(&dag, &opts).unwrap_err();
        assert_eq!(err.code(), "invalid_option");
    }

    #[test]
    fn higher_priority_keeps_its_slot() {
        let tasks = vec![
            Task::new(1, "low", 16.0).with_assignees(vec![7]),
            Task::new(2, "urgent", 24.0)
                .with_assignees(vec![7])
                .with_priority(TaskPriority::High),
        ];
        let dag = ScheduleDag::build(&tasks, &[]).unwrap();
        let opts = AutoScheduleOptions {
            optimize_resources: true,
            ..options()
        };
        let result = auto_schedule(&dag, &opts).unwrap();
        assert_eq!(result.task(2).unwrap().start_date, d(2025, 1, 1));
        assert_eq!(result.task(1).unwrap().start_date, d(2025, 1, 4));
        assert_eq!(result.total_duration, 5);
    }

    #[test]
    fn shifted_task_drags_its_successors() {
        // 1 and 2 share resource 9; 3 follows 2
        let tasks = vec![
            Task::new(1, "pour", 24.0).with_assignees(vec![9]),
            Task::new(2, "frame", 16.0).with_assignees(vec![9]),
            Task::new(3, "inspect", 8.0),
        ];
        let deps = vec![Dependency::finish_to_start(2, 3)];
        let dag = ScheduleDag::build(&tasks, &deps).unwrap();
        let opts = AutoScheduleOptions {
            optimize_resources: true,
            ..options()
        };
        let result = auto_schedule(&dag, &opts).unwrap();
        let frame = result.task(2).unwrap();
        let inspect = result.task(3).unwrap();
        assert_eq!(frame.start_date, d(2025, 1, 4));
        assert_eq!(inspect.start_date, frame.end_date);
    }

    #[test]
    fn start_to_start_predecessor_keeps_its_place_on_the_resource() {
        // Y drives X through SS, so X queues behind Y despite its priority
        let tasks = vec![
            Task::new(1, "x", 24.0)
                .with_assignees(vec![5])
                .with_priority(TaskPriority::High),
            Task::new(2, "y", 24.0)
                .with_assignees(vec![5])
                .with_priority(TaskPriority::Low),
        ];
        let deps = vec![Dependency::new(2, 1, DependencyType::StartToStart)];
        let dag = ScheduleDag::build(&tasks, &deps).unwrap();
        let opts = AutoScheduleOptions {
            optimize_resources: true,
            ..options()
        };

        let result = auto_schedule(&dag, &opts).unwrap();
        let x = result.task(1).unwrap();
        let y = result.task(2).unwrap();
        assert_eq!(y.start_date, d(2025, 1, 1));
        assert_eq!(y.end_date, d(2025, 1, 4));
        assert_eq!(x.start_date, d(2025, 1, 4));
        assert_eq!(x.end_date, d(2025, 1, 7));
        assert_eq!(result.total_duration, 6);
    }

    #[test]
    fn queue_never_puts_a_task_before_its_ancestor() {
        // 3 -> 2 -> 1 on one resource, ranked the other way round
        let tasks = vec![
            Task::new(1, "a", 8.0)
                .with_assignees(vec![4])
                .with_priority(TaskPriority::High),
            Task::new(2, "b", 8.0).with_assignees(vec![4]),
            Task::new(3, "c", 8.0)
                .with_assignees(vec![4])
                .with_priority(TaskPriority::Low),
            Task::new(4, "d", 8.0)
                .with_assignees(vec![4])
                .with_priority(TaskPriority::High),
        ];
        let deps = vec![
            Dependency::new(3, 2, DependencyType::StartToStart),
            Dependency::new(2, 1, DependencyType::StartToStart),
        ];
        let dag = ScheduleDag::build(&tasks, &deps).unwrap();
        let calendar = options().calendar().unwrap();
        let scheduler =
            CpmScheduler::new(&dag, &calendar, ScheduleBounds::starting(d(2025, 1, 1))).unwrap();
        let report = detect_cycle(&dag);
        let passes = scheduler
            .passes(report.topological_order(), &scheduler.pinned_bounds())
            .unwrap();

        let sequences = resource_sequences(&dag, &passes);
        let ids: Vec<_> = sequences[0].iter().map(|ix| dag.graph[*ix].id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn ignoring_dependencies_still_rejects_cycles() {
        let tasks = vec![Task::new(1, "a", 8.0), Task::new(2, "b", 8.0)];
        let deps = vec![
            Dependency::finish_to_start(1, 2),
            Dependency::finish_to_start(2, 1),
        ];
        let dag = ScheduleDag::build(&tasks, &deps).unwrap();
        let opts = AutoScheduleOptions {
            respect_dependencies: false,
            ..options()
        };
        assert_eq!(
            auto_schedule(&dag, &opts).unwrap_err().code(),
            "cyclic_dependency_graph"
        );
    }

    #[test]
    fn ignoring_dependencies_starts_everything_together() {
        let tasks = vec![Task::new(1, "a", 16.0), Task::new(2, "b", 8.0)];
        let deps = vec![Dependency::finish_to_start(1, 2)];
        let dag = ScheduleDag::build(&tasks, &deps).unwrap();
        let opts = AutoScheduleOptions {
            respect_dependencies: false,
            ..options()
        };
        let result = auto_schedule(&dag, &opts).unwrap();
        assert_eq!(result.task(2).unwrap().start_date, d(2025, 1, 1));
        assert_eq!(result.total_duration, 2);
        assert!(result.dependencies.is_empty());
    }
}
