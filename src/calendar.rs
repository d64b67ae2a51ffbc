use crate::error::ScheduleError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MIN_WORKING_HOURS_PER_DAY: u32 = 1;
pub const MAX_WORKING_HOURS_PER_DAY: u32 = 24;
pub const MAX_BUFFER_DAYS: i64 = 30;

/// Inputs every calendar computation depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_avoid_weekends")]
    pub avoid_weekends: bool,
    #[serde(default = "default_working_hours_per_day")]
    pub working_hours_per_day: u32,
    #[serde(default)]
    pub buffer_days: i64,
    /// When false, `buffer_days` is not added to finish-to-start edges.
    #[serde(default = "default_apply_buffer")]
    pub apply_buffer: bool,
}

fn default_avoid_weekends() -> bool {
    true
}

fn default_working_hours_per_day() -> u32 {
    8
}

fn default_apply_buffer() -> bool {
    true
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            avoid_weekends: default_avoid_weekends(),
            working_hours_per_day: default_working_hours_per_day(),
            buffer_days: 0,
            apply_buffer: default_apply_buffer(),
        }
    }
}

impl CalendarConfig {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !(MIN_WORKING_HOURS_PER_DAY..=MAX_WORKING_HOURS_PER_DAY)
            .contains(&self.working_hours_per_day)
        {
            return Err(ScheduleError::InvalidOption {
                field: "working_hours_per_day",
                value: self.working_hours_per_day.to_string(),
                reason: "must be between 1 and 24",
            });
        }
        if !(0..=MAX_BUFFER_DAYS).contains(&self.buffer_days) {
            return Err(ScheduleError::InvalidOption {
                field: "buffer_days",
                value: self.buffer_days.to_string(),
                reason: "must be between 0 and 30",
            });
        }
        Ok(())
    }
}

/// `ceil(hours / working_hours_per_day)`, at least one day for any positive duration.
pub fn duration_to_days(hours: f64, working_hours_per_day: u32) -> i64 {
    if hours <= 0.0 || working_hours_per_day == 0 {
        return 0;
    }
    let days = (hours / f64::from(working_hours_per_day)).ceil() as i64;
    days.max(1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    non_working_days: HashSet<Weekday>,
    working_hours_per_day: u32,
    buffer_days: i64,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::from_config(&CalendarConfig::default())
    }
}

impl WorkCalendar {
    const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];

    /// Validated construction; out-of-range hours or buffer fail with `InvalidOption`.
    pub fn new(config: &CalendarConfig) -> Result<Self, ScheduleError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: &CalendarConfig) -> Self {
        let non_working_days = if config.avoid_weekends {
            HashSet::from(Self::WEEKEND)
        } else {
            HashSet::new()
        };
        let buffer_days = if config.apply_buffer {
            config.buffer_days
        } else {
            0
        };
        Self {
            non_working_days,
            working_hours_per_day: config.working_hours_per_day,
            buffer_days,
        }
    }

    pub fn avoids_weekends(&self) -> bool {
        !self.non_working_days.is_empty()
    }

    pub fn working_hours_per_day(&self) -> u32 {
        self.working_hours_per_day
    }

    /// Extra lag applied to every finish-to-start edge.
    pub fn buffer_days(&self) -> i64 {
        self.buffer_days
    }

    pub fn duration_to_days(&self, hours: f64) -> i64 {
        duration_to_days(hours, self.working_hours_per_day)
    }

    /// Check if a date is available for scheduling
    pub fn is_available(&self, date: NaiveDate) -> bool {
        !self.non_working_days.contains(&date.weekday())
    }

    /// The date itself when available, otherwise the next available date.
    pub fn roll_forward(&self, date: NaiveDate) -> NaiveDate {
        if self.is_available(date) {
            return date;
        }
        self.step(date, true).unwrap_or(date)
    }

    /// Find the next available date after a given date
    pub fn next_available(&self, from: NaiveDate) -> NaiveDate {
        self.step(from, true).unwrap_or(from)
    }

    /// Find the previous available date before a given date
    pub fn prev_available(&self, from: NaiveDate) -> NaiveDate {
        self.step(from, false).unwrap_or(from)
    }

    /// Nearest available date strictly after (or before) `from`; `None` at the end of the range.
    fn step(&self, from: NaiveDate, forward: bool) -> Option<NaiveDate> {
        let mut current = from;
        loop {
            current = if forward {
                current.succ_opt()?
            } else {
                current.pred_opt()?
            };
            if self.is_available(current) {
                return Some(current);
            }
        }
    }

    /// Advance `date` by `n` working days (backwards for negative `n`).
    ///
    /// A non-working anchor is first rolled forward, so the result is always
    /// an available date. Saturates at the ends of the supported date range.
    pub fn add_working_days(&self, date: NaiveDate, n: i64) -> NaiveDate {
        self.checked_add_working_days(date, n)
            .unwrap_or(if n >= 0 { NaiveDate::MAX } else { NaiveDate::MIN })
    }

    /// `add_working_days`, or `None` when the result falls outside the date range.
    pub fn checked_add_working_days(&self, date: NaiveDate, n: i64) -> Option<NaiveDate> {
        let start = self.roll_forward(date);
        if !self.avoids_weekends() {
            return start.checked_add_signed(Duration::try_days(n)?);
        }

        let forward = n >= 0;
        let distance = n.unsigned_abs();
        let weeks = Duration::try_weeks(i64::try_from(distance / 5).ok()?)?;
        let mut current = if forward {
            start.checked_add_signed(weeks)?
        } else {
            start.checked_sub_signed(weeks)?
        };
        for _ in 0..(distance % 5) {
            current = self.step(current, forward)?;
        }
        Some(current)
    }

    /// Shift a date by a signed lag using the same rule as task placement.
    pub fn apply_lag(&self, date: NaiveDate, lag_days: i64) -> NaiveDate {
        self.add_working_days(date, lag_days)
    }

    /// Signed number of working days in `[start, end)`.
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end >= start {
            self.count_in_half_open(start, end)
        } else {
            -self.count_in_half_open(end, start)
        }
    }

    fn count_in_half_open(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let total = (end - start).num_days();
        if !self.avoids_weekends() {
            return total;
        }
        let full_weeks = total / 7;
        let mut count = full_weeks * 5;
        let mut current = start + Duration::weeks(full_weeks);
        while current < end {
            if self.is_available(current) {
                count += 1;
            }
            current += Duration::days(1);
        }
        count
    }

    /// Count available days in a date range (inclusive)
    pub fn count_available_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return 0;
        }
        match end.succ_opt() {
            Some(after) => self.count_in_half_open(start, after),
            None => self.count_in_half_open(start, end) + i64::from(self.is_available(end)),
        }
    }

    /// Get all available days in a date range (inclusive)
    pub fn available_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.is_available(*day))
            .collect()
    }
}
