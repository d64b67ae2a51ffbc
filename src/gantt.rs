use crate::resource::ResourceId;
use crate::schedule::ScheduleResult;
use crate::task::{Task, TaskId, TaskPriority, TaskStatus};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Days from 0001-01-01 to 1970-01-01, the offset polars dates count from.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One bar of a Gantt chart: task fields joined with committed dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttRow {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    pub assignees: Vec<ResourceId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i64,
    pub slack: i64,
    pub critical: bool,
}

pub fn gantt_rows(result: &ScheduleResult, tasks: &[Task]) -> Vec<GanttRow> {
    let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    result
        .tasks
        .iter()
        .filter_map(|scheduled| {
            let task = by_id.get(&scheduled.task_id)?;
            Some(GanttRow {
                id: task.id,
                name: task.name.clone(),
                status: task.status,
                priority: task.priority,
                progress: task.progress,
                parent_id: task.parent_id,
                assignees: task.assignees.clone(),
                start_date: scheduled.start_date,
                end_date: scheduled.end_date,
                duration_days: scheduled.duration_days,
                slack: scheduled.slack,
                critical: scheduled.critical,
            })
        })
        .collect()
}

fn date_to_i32(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn date_series(name: &'static str, dates: impl Iterator<Item = NaiveDate>) -> PolarsResult<Series> {
    let days: Vec<i32> = dates.map(date_to_i32).collect();
    Series::new(PlSmallStr::from_static(name), days).cast(&DataType::Date)
}

/// Column-oriented view of `rows`, with `Date` typed start and end columns.
pub fn gantt_dataframe(rows: &[GanttRow]) -> PolarsResult<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(12);

    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    columns.push(Series::new(PlSmallStr::from_static("id"), ids).into_column());

    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    columns.push(Series::new(PlSmallStr::from_static("name"), names).into_column());

    let status: Vec<&str> = rows.iter().map(|r| r.status.as_str()).collect();
    columns.push(Series::new(PlSmallStr::from_static("status"), status).into_column());

    let priority: Vec<&str> = rows.iter().map(|r| r.priority.as_str()).collect();
    columns.push(Series::new(PlSmallStr::from_static("priority"), priority).into_column());

    columns.push(date_series("start_date", rows.iter().map(|r| r.start_date))?.into_column());
    columns.push(date_series("end_date", rows.iter().map(|r| r.end_date))?.into_column());

    let durations: Vec<i64> = rows.iter().map(|r| r.duration_days).collect();
    columns.push(Series::new(PlSmallStr::from_static("duration_days"), durations).into_column());

    let slack: Vec<i64> = rows.iter().map(|r| r.slack).collect();
    columns.push(Series::new(PlSmallStr::from_static("slack"), slack).into_column());

    let critical: Vec<bool> = rows.iter().map(|r| r.critical).collect();
    columns.push(Series::new(PlSmallStr::from_static("critical"), critical).into_column());

    let progress: Vec<f64> = rows.iter().map(|r| r.progress).collect();
    columns.push(Series::new(PlSmallStr::from_static("progress"), progress).into_column());

    let parents: Vec<Option<i32>> = rows.iter().map(|r| r.parent_id).collect();
    columns.push(Series::new(PlSmallStr::from_static("parent_id"), parents).into_column());

    let assignees: Vec<Series> = rows
        .iter()
        .map(|r| Series::new(PlSmallStr::from_static(""), r.assignees.clone()))
        .collect();
    columns.push(Series::new(PlSmallStr::from_static("assignees"), assignees).into_column());

    DataFrame::new(columns)
}
