use crate::calculations::backward_pass::BackwardPass;
use crate::calculations::critical_path::CriticalPathWalker;
use crate::calculations::forward_pass::{EarlyDates, ForwardPass};
use crate::calendar::WorkCalendar;
use crate::dependency::{DependencyStatus, Window};
use crate::error::{BoundsViolation, ScheduleError};
use crate::graph::{CycleReport, Link, ScheduleDag, detect_cycle};
use crate::schedule::{ScheduleResult, TaskSchedule};
use crate::task_validation::MAX_ESTIMATED_HOURS;
use chrono::NaiveDate;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Project start and optional inclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBounds {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl ScheduleBounds {
    pub fn starting(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    pub fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }
}

/// Output of one forward/backward round, indexed by node index.
#[derive(Debug, Clone)]
pub(crate) struct CpmPasses {
    pub(crate) early: EarlyDates,
    pub(crate) late: Vec<Window>,
    pub(crate) slack: Vec<i64>,
}

pub struct CpmScheduler<'a> {
    dag: &'a ScheduleDag,
    calendar: &'a WorkCalendar,
    bounds: ScheduleBounds,
    anchor: NaiveDate,
    durations: Vec<i64>,
    end_offset: Option<i64>,
}

impl<'a> CpmScheduler<'a> {
    pub fn new(
        dag: &'a ScheduleDag,
        calendar: &'a WorkCalendar,
        bounds: ScheduleBounds,
    ) -> Result<Self, ScheduleError> {
        if let Some(end) = bounds.end {
            if end < bounds.start {
                return Err(ScheduleError::InvalidConstraintBounds(
                    BoundsViolation::EndBeforeStart {
                        start: bounds.start,
                        end,
                    },
                ));
            }
        }

        for node in dag.sorted_nodes() {
            let task = &dag.graph[node];
            if !(0.0..=MAX_ESTIMATED_HOURS).contains(&task.estimated_hours) {
                return Err(ScheduleError::InvalidDuration {
                    task_id: task.id,
                    hours: task.estimated_hours,
                });
            }
        }

        let durations = dag
            .graph
            .node_weights()
            .map(|task| calendar.duration_to_days(task.estimated_hours))
            .collect();
        let anchor = calendar.roll_forward(bounds.start);
        let end_offset = bounds
            .end
            .map(|end| calendar.count_available_days(anchor, end));

        Ok(Self {
            dag,
            calendar,
            bounds,
            anchor,
            durations,
            end_offset,
        })
    }

    /// Date of a working-day offset from the project's first working day.
    pub fn date_of(&self, offset: i64) -> Result<NaiveDate, ScheduleError> {
        self.calendar
            .checked_add_working_days(self.anchor, offset)
            .ok_or(ScheduleError::DateOutOfRange {
                anchor: self.anchor,
                offset,
            })
    }

    pub fn offset_of(&self, date: NaiveDate) -> i64 {
        self.calendar.working_days_between(self.anchor, date)
    }

    /// Last working day covered by an exclusive finish offset.
    fn last_day(&self, finish: i64) -> Result<NaiveDate, ScheduleError> {
        if finish <= 0 {
            Ok(self.anchor)
        } else {
            self.date_of(finish - 1)
        }
    }

    /// Start-no-earlier-than offsets coming from each task's `pinned_start`.
    pub fn pinned_bounds(&self) -> Vec<Option<i64>> {
        self.dag
            .graph
            .node_weights()
            .map(|task| task.pinned_start.map(|date| self.offset_of(date)))
            .collect()
    }

    pub(crate) fn passes(
        &self,
        order: &[NodeIndex],
        lower_bounds: &[Option<i64>],
    ) -> Result<CpmPasses, ScheduleError> {
        let buffer = self.calendar.buffer_days();
        let early =
            ForwardPass::new(self.dag, &self.durations, buffer).execute(order, lower_bounds);
        let project_finish = early.windows.iter().map(|w| w.finish).max().unwrap_or(0);
        let finish_bound = self.end_offset.unwrap_or(project_finish);
        let late =
            BackwardPass::new(self.dag, &self.durations, buffer).execute(order, finish_bound);

        let slack: Vec<i64> = early
            .windows
            .iter()
            .zip(&late)
            .map(|(e, l)| l.start - e.start)
            .collect();

        let worst = self
            .dag
            .graph
            .node_indices()
            .filter(|ix| slack[ix.index()] < 0)
            .min_by_key(|ix| (slack[ix.index()], self.dag.graph[*ix].id));
        if let Some(node) = worst {
            let required_finish = self.last_day(project_finish)?;
            return Err(ScheduleError::InvalidConstraintBounds(
                BoundsViolation::EndBeforeFinish {
                    end: self.bounds.end.unwrap_or(required_finish),
                    required_finish,
                    task_id: self.dag.graph[node].id,
                },
            ));
        }

        tracing::debug!(
            tasks = self.dag.task_count(),
            project_finish,
            finish_bound,
            "cpm passes complete"
        );
        Ok(CpmPasses { early, late, slack })
    }

    pub(crate) fn finish(&self, passes: &CpmPasses) -> Result<ScheduleResult, ScheduleError> {
        let buffer = self.calendar.buffer_days();
        let early = &passes.early.windows;
        let project_finish = early.iter().map(|w| w.finish).max().unwrap_or(0);

        let walker = CriticalPathWalker::new(self.dag, early, &passes.slack, buffer);
        let critical_path = walker
            .walk()
            .into_iter()
            .map(|ix| self.dag.graph[ix].id)
            .collect();

        let tasks = self
            .dag
            .sorted_nodes()
            .into_iter()
            .map(|node| {
                let ix = node.index();
                let (e, l) = (early[ix], passes.late[ix]);
                let (start, finish) = (self.date_of(e.start)?, self.date_of(e.finish)?);
                Ok(TaskSchedule {
                    task_id: self.dag.graph[node].id,
                    start_date: start,
                    end_date: finish,
                    earliest_start: start,
                    earliest_finish: finish,
                    latest_start: self.date_of(l.start)?,
                    latest_finish: self.date_of(l.finish)?,
                    duration_days: self.durations[ix],
                    slack: passes.slack[ix],
                    critical: passes.slack[ix] == 0,
                    constrained: passes.early.constrained[ix],
                })
            })
            .collect::<Result<Vec<TaskSchedule>, ScheduleError>>()?;

        let dependencies = self
            .dag
            .dependencies()
            .into_iter()
            .map(|dep| {
                let critical = match (
                    self.dag.index_of(dep.depends_on_id),
                    self.dag.index_of(dep.task_id),
                ) {
                    (Some(pred), Some(succ)) => walker.is_critical_edge(
                        pred,
                        succ,
                        &Link {
                            kind: dep.kind,
                            lag: dep.lag,
                        },
                    ),
                    _ => false,
                };
                DependencyStatus {
                    task_id: dep.task_id,
                    depends_on_id: dep.depends_on_id,
                    kind: dep.kind,
                    lag: dep.lag,
                    critical,
                }
            })
            .collect();

        let result = ScheduleResult {
            start_date: self.anchor,
            end_date: self.date_of(project_finish)?,
            total_duration: project_finish,
            critical_path,
            tasks,
            dependencies,
        };

        let constrained = result.constrained_tasks();
        if !constrained.is_empty() {
            tracing::warn!(?constrained, "tasks clamped to the project start");
        }
        tracing::info!(
            tasks = result.tasks.len(),
            critical = result.critical_count(),
            total_duration = result.total_duration,
            end = %result.end_date,
            "schedule computed"
        );
        Ok(result)
    }
}

/// Topological order from the report, recomputed when it does not cover the graph.
pub(crate) fn resolve_order<'r>(
    dag: &ScheduleDag,
    report: &'r CycleReport,
) -> Result<Cow<'r, [NodeIndex]>, ScheduleError> {
    if report.has_cycle() {
        return Err(ScheduleError::CyclicDependencyGraph {
            cycle: report.cycle().to_vec(),
        });
    }
    if report.topological_order().len() == dag.task_count() {
        return Ok(Cow::Borrowed(report.topological_order()));
    }
    let fresh = detect_cycle(dag).into_result()?;
    Ok(Cow::Owned(fresh.topological_order().to_vec()))
}

/// Earliest-date schedule of `dag`. Fails fast when `report` holds a cycle.
pub fn schedule(
    dag: &ScheduleDag,
    report: &CycleReport,
    calendar: &WorkCalendar,
    bounds: ScheduleBounds,
) -> Result<ScheduleResult, ScheduleError> {
    let order = resolve_order(dag, report)?;
    let scheduler = CpmScheduler::new(dag, calendar, bounds)?;
    let passes = scheduler.passes(&order, &scheduler.pinned_bounds())?;
    scheduler.finish(&passes)
}
