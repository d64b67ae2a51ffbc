use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest lead or lag, in working days, a dependency may carry.
pub const MAX_LAG_DAYS: i64 = 3_650;

/// Relationship between a predecessor and its successor.
///
/// Constraint arithmetic works on working-day offsets; windows are half-open,
/// so a task occupying offsets `[start, finish)` has `finish = start + duration`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

/// Start and finish offsets of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: i64,
    pub finish: i64,
}

impl Window {
    pub fn new(start: i64, duration: i64) -> Self {
        Self {
            start,
            finish: start + duration,
        }
    }

    pub fn duration(&self) -> i64 {
        self.finish - self.start
    }
}

impl DependencyType {
    pub const ALL: [DependencyType; 4] = [
        DependencyType::FinishToStart,
        DependencyType::StartToStart,
        DependencyType::FinishToFinish,
        DependencyType::StartToFinish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "finish_to_start",
            DependencyType::StartToStart => "start_to_start",
            DependencyType::FinishToFinish => "finish_to_finish",
            DependencyType::StartToFinish => "start_to_finish",
        }
    }

    /// Earliest start the successor may take given the predecessor's early window.
    pub fn earliest_start(&self, predecessor: Window, lag: i64, own_duration: i64) -> i64 {
        match self {
            DependencyType::FinishToStart => predecessor.finish + lag,
            DependencyType::StartToStart => predecessor.start + lag,
            DependencyType::FinishToFinish => predecessor.finish + lag - own_duration,
            DependencyType::StartToFinish => predecessor.start + lag - own_duration,
        }
    }

    /// Latest finish the predecessor may take given the successor's late window.
    pub fn latest_finish(&self, successor: Window, lag: i64, own_duration: i64) -> i64 {
        match self {
            DependencyType::FinishToStart => successor.start - lag,
            DependencyType::StartToStart => successor.start - lag + own_duration,
            DependencyType::FinishToFinish => successor.finish - lag,
            DependencyType::StartToFinish => successor.finish - lag + own_duration,
        }
    }

    /// True when the edge alone determines the successor's start.
    pub fn is_driving(&self, predecessor: Window, successor: Window, lag: i64) -> bool {
        self.earliest_start(predecessor, lag, successor.duration()) == successor.start
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "finish_to_start" | "fs" => Ok(DependencyType::FinishToStart),
            "start_to_start" | "ss" => Ok(DependencyType::StartToStart),
            "finish_to_finish" | "ff" => Ok(DependencyType::FinishToFinish),
            "start_to_finish" | "sf" => Ok(DependencyType::StartToFinish),
            _ => Err(format!("unknown dependency type '{s}'")),
        }
    }
}

/// Directed edge `depends_on_id -> task_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub task_id: TaskId,
    pub depends_on_id: TaskId,
    #[serde(rename = "type", default)]
    pub kind: DependencyType,
    #[serde(default)]
    pub lag: i64,
}

impl Dependency {
    pub fn new(depends_on_id: TaskId, task_id: TaskId, kind: DependencyType) -> Self {
        Self {
            task_id,
            depends_on_id,
            kind,
            lag: 0,
        }
    }

    pub fn finish_to_start(depends_on_id: TaskId, task_id: TaskId) -> Self {
        Self::new(depends_on_id, task_id, DependencyType::FinishToStart)
    }

    pub fn with_lag(mut self, lag: i64) -> Self {
        self.lag = lag;
        self
    }

    pub fn has_valid_lag(&self) -> bool {
        (-MAX_LAG_DAYS..=MAX_LAG_DAYS).contains(&self.lag)
    }
}

/// A dependency as reported back to the caller, with its criticality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub task_id: TaskId,
    pub depends_on_id: TaskId,
    #[serde(rename = "type")]
    pub kind: DependencyType,
    pub lag: i64,
    pub critical: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_constraints_per_type() {
        let pred = Window::new(2, 3); // [2, 5)
        assert_eq!(DependencyType::FinishToStart.earliest_start(pred, 0, 4), 5);
        assert_eq!(DependencyType::StartToStart.earliest_start(pred, 1, 4), 3);
        assert_eq!(DependencyType::FinishToFinish.earliest_start(pred, 0, 4), 1);
        assert_eq!(DependencyType::StartToFinish.earliest_start(pred, 0, 1), 1);
        assert_eq!(DependencyType::FinishToStart.earliest_start(pred, -2, 4), 3);
    }

    #[test]
    fn backward_constraints_mirror_forward_ones() {
        let succ = Window::new(10, 2); // [10, 12)
        assert_eq!(DependencyType::FinishToStart.latest_finish(succ, 1, 3), 9);
        assert_eq!(DependencyType::StartToStart.latest_finish(succ, 0, 3), 13);
        assert_eq!(DependencyType::FinishToFinish.latest_finish(succ, 0, 3), 12);
        assert_eq!(DependencyType::StartToFinish.latest_finish(succ, 0, 3), 15);
    }

    #[test]
    fn dependency_wire_shape() {
        let json = r#"{"task_id": 2, "depends_on_id": 1, "type": "start_to_start", "lag": -1}"#;
        let dep: Dependency = serde_json::from_str(json).unwrap();
        assert_eq!(dep.kind, DependencyType::StartToStart);
        assert_eq!(dep.lag, -1);

        let defaulted: Dependency =
            serde_json::from_str(r#"{"task_id": 2, "depends_on_id": 1}"#).unwrap();
        assert_eq!(defaulted.kind, DependencyType::FinishToStart);
        assert_eq!(defaulted.lag, 0);
    }

    #[test]
    fn parses_short_codes() {
        assert_eq!("FF".parse::<DependencyType>().unwrap(), DependencyType::FinishToFinish);
        assert!("xx".parse::<DependencyType>().is_err());
    }
}
