use crate::error::ScheduleError;
use crate::task::Task;
use std::collections::HashSet;

const EPSILON: f64 = 1e-6;

/// Upper bound on a single task's effort.
pub const MAX_ESTIMATED_HOURS: f64 = 1_000_000.0;

pub fn validate_task(task: &Task) -> Result<(), ScheduleError> {
    if !(0.0..=MAX_ESTIMATED_HOURS).contains(&task.estimated_hours) {
        return Err(ScheduleError::InvalidDuration {
            task_id: task.id,
            hours: task.estimated_hours,
        });
    }

    if !task.progress.is_finite() || task.progress < -EPSILON || task.progress > 100.0 + EPSILON {
        return Err(ScheduleError::InvalidProgress {
            task_id: task.id,
            progress: task.progress,
        });
    }

    if let (Some(start), Some(end)) = (task.start_date, task.end_date) {
        if end < start {
            return Err(ScheduleError::InvalidTaskDates {
                task_id: task.id,
                start,
                end,
            });
        }
    }

    Ok(())
}

pub fn validate_task_collection(tasks: &[Task]) -> Result<(), ScheduleError> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(ScheduleError::DuplicateTask { task_id: task.id });
        }
        validate_task(task)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn rejects_negative_hours() {
        let task = Task::new(3, "Pour slab", -4.0);
        assert_eq!(
            validate_task(&task),
            Err(ScheduleError::InvalidDuration {
                task_id: 3,
                hours: -4.0
            })
        );
    }

    #[test]
    fn rejects_unbounded_hours() {
        for hours in [f64::NAN, f64::INFINITY, MAX_ESTIMATED_HOURS + 1.0] {
            let task = Task::new(4, "Forever", hours);
            assert_eq!(validate_task(&task).unwrap_err().code(), "invalid_duration");
        }
        assert!(validate_task(&Task::new(4, "Long", MAX_ESTIMATED_HOURS)).is_ok());
    }

    #[test]
    fn rejects_progress_out_of_range() {
        let mut task = Task::new(1, "Framing", 8.0);
        task.progress = 140.0;
        assert!(matches!(
            validate_task(&task),
            Err(ScheduleError::InvalidProgress { task_id: 1, .. })
        ));
    }

    #[test]
    fn rejects_end_before_start() {
        let mut task = Task::new(1, "Framing", 8.0);
        task.start_date = NaiveDate::from_ymd_opt(2025, 5, 12);
        task.end_date = NaiveDate::from_ymd_opt(2025, 5, 9);
        assert!(matches!(
            validate_task(&task),
            Err(ScheduleError::InvalidTaskDates { task_id: 1, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let tasks = vec![Task::new(1, "A", 8.0), Task::new(1, "B", 8.0)];
        assert_eq!(
            validate_task_collection(&tasks),
            Err(ScheduleError::DuplicateTask { task_id: 1 })
        );
    }
}
