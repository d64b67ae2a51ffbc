use chrono::{Datelike, NaiveDate, Weekday};
use pretty_assertions::assert_eq;
use schedule_engine::calendar::{CalendarConfig, WorkCalendar};
use schedule_engine::cpm::{ScheduleBounds, schedule};
use schedule_engine::task_validation::MAX_ESTIMATED_HOURS;
use schedule_engine::{
    BoundsViolation, Dependency, DependencyType, ScheduleDag, ScheduleError, ScheduleResult, Task,
    detect_cycle,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn calendar(avoid_weekends: bool, buffer_days: i64) -> WorkCalendar {
    WorkCalendar::new(&CalendarConfig {
        avoid_weekends,
        working_hours_per_day: 8,
        buffer_days,
        apply_buffer: true,
    })
    .unwrap()
}

fn run(
    tasks: &[Task],
    deps: &[Dependency],
    cal: &WorkCalendar,
    bounds: ScheduleBounds,
) -> Result<ScheduleResult, ScheduleError> {
    let dag = ScheduleDag::build(tasks, deps)?;
    let report = detect_cycle(&dag);
    schedule(&dag, &report, cal, bounds)
}

/// A(2d) -> B(3d) -> C(4d), optionally with a free-floating D(1d).
fn abc(with_d: bool) -> (Vec<Task>, Vec<Dependency>) {
    let mut tasks = vec![
        Task::new(1, "A", 16.0),
        Task::new(2, "B", 24.0),
        Task::new(3, "C", 32.0),
    ];
    if with_d {
        tasks.push(Task::new(4, "D", 8.0));
    }
    let deps = vec![
        Dependency::finish_to_start(1, 2),
        Dependency::finish_to_start(2, 3),
    ];
    (tasks, deps)
}

#[test]
fn three_task_chain_is_fully_critical() {
    let (tasks, deps) = abc(false);
    let result = run(
        &tasks,
        &deps,
        &calendar(false, 0),
        ScheduleBounds::starting(d(2025, 1, 1)),
    )
    .unwrap();

    let a = result.task(1).unwrap();
    let b = result.task(2).unwrap();
    let c = result.task(3).unwrap();
    assert_eq!((a.start_date, a.end_date), (d(2025, 1, 1), d(2025, 1, 3)));
    assert_eq!((b.start_date, b.end_date), (d(2025, 1, 3), d(2025, 1, 6)));
    assert_eq!((c.start_date, c.end_date), (d(2025, 1, 6), d(2025, 1, 10)));

    assert_eq!(result.critical_path, vec![1, 2, 3]);
    assert_eq!(result.total_duration, 9);
    assert_eq!(result.start_date, d(2025, 1, 1));
    assert_eq!(result.end_date, d(2025, 1, 10));
    assert!(result.tasks.iter().all(|t| t.slack == 0 && t.critical));
    assert!(result.dependencies.iter().all(|dep| dep.critical));
}

#[test]
fn parallel_task_floats() {
    let (tasks, deps) = abc(true);
    let result = run(
        &tasks,
        &deps,
        &calendar(false, 0),
        ScheduleBounds::starting(d(2025, 1, 1)),
    )
    .unwrap();

    let task_d = result.task(4).unwrap();
    assert_eq!(task_d.slack, 8);
    assert!(!task_d.critical);
    assert_eq!(task_d.latest_start, d(2025, 1, 9));
    assert_eq!(result.critical_path, vec![1, 2, 3]);

    let summary = result.critical_path_summary();
    assert_eq!(summary.task_count, 4);
    assert_eq!(summary.slack[&4], 8);
    assert_eq!(summary.total_duration, 9);
}

#[test]
fn scheduling_is_deterministic() {
    let (tasks, mut deps) = abc(true);
    // Extra finish-to-finish feeder into C
    deps.push(Dependency::new(4, 3, DependencyType::FinishToFinish).with_lag(3));
    let cal = calendar(true, 1);
    let bounds = ScheduleBounds::starting(d(2025, 3, 7));
    let first = run(&tasks, &deps, &cal, bounds).unwrap();
    let second = run(&tasks, &deps, &cal, bounds).unwrap();
    assert_eq!(first, second);
}

#[test]
fn tie_prefers_latest_finish_then_smallest_id() {
    // 1(1d) and 2(1d) both feed 3 and both are tight; 1 wins on id
    let tasks = vec![Task::new(1, "", 8.0), Task::new(2, "", 8.0), Task::new(3, "", 8.0)];
    let deps = vec![
        Dependency::finish_to_start(2, 3),
        Dependency::finish_to_start(1, 3),
    ];
    let result = run(
        &tasks,
        &deps,
        &calendar(false, 0),
        ScheduleBounds::starting(d(2025, 1, 1)),
    )
    .unwrap();
    assert_eq!(result.critical_path, vec![1, 3]);

    // 11(2d) finishes later than 12(1d) under an SS edge; the later finisher wins
    let tasks = vec![Task::new(11, "", 16.0), Task::new(12, "", 8.0), Task::new(13, "", 8.0)];
    let deps = vec![
        Dependency::new(11, 13, DependencyType::StartToStart).with_lag(1),
        Dependency::finish_to_start(12, 13),
    ];
    let result = run(
        &tasks,
        &deps,
        &calendar(false, 0),
        ScheduleBounds::starting(d(2025, 1, 1)),
    )
    .unwrap();
    assert_eq!(result.task(13).unwrap().start_date, d(2025, 1, 2));
    assert_eq!(result.critical_path, vec![11, 13]);
}

#[test]
fn each_dependency_type_constrains_its_pair() {
    let tasks = vec![
        Task::new(1, "A", 16.0), // [0, 2)
        Task::new(2, "SS", 24.0),
        Task::new(3, "FF", 8.0),
        Task::new(4, "SF", 8.0),
    ];
    let deps = vec![
        Dependency::new(1, 2, DependencyType::StartToStart).with_lag(1),
        Dependency::new(1, 3, DependencyType::FinishToFinish),
        Dependency::new(1, 4, DependencyType::StartToFinish).with_lag(3),
    ];
    let result = run(
        &tasks,
        &deps,
        &calendar(false, 0),
        ScheduleBounds::starting(d(2025, 1, 1)),
    )
    .unwrap();

    // SS: start 1 day after A starts
    assert_eq!(result.task(2).unwrap().start_date, d(2025, 1, 2));
    // FF: finish together with A
    assert_eq!(result.task(3).unwrap().end_date, result.task(1).unwrap().end_date);
    // SF: finish 3 days after A starts
    assert_eq!(result.task(4).unwrap().end_date, d(2025, 1, 4));
    assert_eq!(result.critical_path, vec![1, 2]);
}

#[test]
fn weekends_are_skipped_for_start_and_end() {
    let tasks = vec![Task::new(1, "A", 16.0), Task::new(2, "B", 8.0)];
    let deps = vec![Dependency::finish_to_start(1, 2)];
    // Friday start
    let result = run(
        &tasks,
        &deps,
        &calendar(true, 0),
        ScheduleBounds::starting(d(2025, 1, 3)),
    )
    .unwrap();

    let b = result.task(2).unwrap();
    assert_eq!(b.start_date, d(2025, 1, 7));
    assert_eq!(b.end_date, d(2025, 1, 8));
    assert_eq!(result.total_duration, 3);
    for t in &result.tasks {
        for date in [t.start_date, t.end_date, t.latest_start, t.latest_finish] {
            assert!(!matches!(date.weekday(), Weekday::Sat | Weekday::Sun));
        }
    }
}

#[test]
fn saturday_start_bound_rolls_to_monday() {
    let tasks = vec![Task::new(1, "A", 8.0)];
    let result = run(
        &tasks,
        &[],
        &calendar(true, 0),
        ScheduleBounds::starting(d(2025, 1, 4)),
    )
    .unwrap();
    assert_eq!(result.start_date, d(2025, 1, 6));
    assert_eq!(result.task(1).unwrap().start_date, d(2025, 1, 6));
}

#[test]
fn buffer_days_stretch_finish_to_start_edges() {
    let (tasks, deps) = abc(false);
    let result = run(
        &tasks,
        &deps,
        &calendar(false, 2),
        ScheduleBounds::starting(d(2025, 1, 1)),
    )
    .unwrap();
    assert_eq!(result.task(2).unwrap().start_date, d(2025, 1, 5));
    assert_eq!(result.total_duration, 13);
    assert_eq!(result.critical_path, vec![1, 2, 3]);
}

#[test]
fn lead_before_project_start_is_clamped_and_flagged() {
    let tasks = vec![Task::new(1, "A", 16.0), Task::new(2, "B", 24.0)];
    let deps = vec![Dependency::finish_to_start(1, 2).with_lag(-5)];
    let result = run(
        &tasks,
        &deps,
        &calendar(false, 0),
        ScheduleBounds::starting(d(2025, 1, 1)),
    )
    .unwrap();

    let b = result.task(2).unwrap();
    assert!(b.constrained);
    assert_eq!(b.start_date, d(2025, 1, 1));
    assert!(!result.task(1).unwrap().constrained);
    assert_eq!(result.constrained_tasks(), vec![2]);
}

#[test]
fn end_bound_before_start_bound_is_rejected() {
    let (tasks, deps) = abc(false);
    let bounds = ScheduleBounds::starting(d(2025, 1, 10)).with_end(d(2025, 1, 2));
    let err = run(&tasks, &deps, &calendar(false, 0), bounds).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::InvalidConstraintBounds(BoundsViolation::EndBeforeStart {
            start: d(2025, 1, 10),
            end: d(2025, 1, 2),
        })
    );
}

#[test]
fn infeasible_end_bound_is_surfaced_not_clamped() {
    let (tasks, deps) = abc(false);
    let bounds = ScheduleBounds::starting(d(2025, 1, 1)).with_end(d(2025, 1, 5));
    let err = run(&tasks, &deps, &calendar(false, 0), bounds).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::InvalidConstraintBounds(BoundsViolation::EndBeforeFinish {
            end: d(2025, 1, 5),
            required_finish: d(2025, 1, 9),
            task_id: 1,
        })
    );
}

#[test]
fn exact_end_bound_keeps_the_chain_critical() {
    let (tasks, deps) = abc(true);
    // Inclusive end: the ninth working day
    let bounds = ScheduleBounds::starting(d(2025, 1, 1)).with_end(d(2025, 1, 9));
    let result = run(&tasks, &deps, &calendar(false, 0), bounds).unwrap();
    assert_eq!(result.critical_path, vec![1, 2, 3]);
    assert_eq!(result.task(4).unwrap().slack, 8);
}

#[test]
fn loose_end_bound_gives_every_task_slack() {
    let (tasks, deps) = abc(false);
    let bounds = ScheduleBounds::starting(d(2025, 1, 1)).with_end(d(2025, 1, 20));
    let result = run(&tasks, &deps, &calendar(false, 0), bounds).unwrap();
    assert!(result.tasks.iter().all(|t| t.slack == 11));
    assert!(result.critical_path.is_empty());
    assert_eq!(result.total_duration, 9);
}

#[test]
fn cyclic_graph_is_refused() {
    let (tasks, mut deps) = abc(false);
    deps.push(Dependency::finish_to_start(3, 1));
    let err = run(
        &tasks,
        &deps,
        &calendar(false, 0),
        ScheduleBounds::starting(d(2025, 1, 1)),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ScheduleError::CyclicDependencyGraph {
            cycle: vec![1, 2, 3, 1]
        }
    );
}

/// Small deterministic generator so graph shapes vary without extra dependencies.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

#[test]
fn forward_pass_never_exceeds_backward_pass() {
    for seed in 1..=25u64 {
        let mut rng = Lcg(seed);
        let count = 3 + rng.next(10) as i32;
        let tasks: Vec<Task> = (1..=count)
            .map(|id| Task::new(id, format!("T{id}"), (rng.next(40)) as f64))
            .collect();

        let mut deps = Vec::new();
        for to in 2..=count {
            for from in 1..to {
                if rng.next(4) == 0 {
                    let kind = DependencyType::ALL[rng.next(4) as usize];
                    let lag = rng.next(7) as i64 - 3;
                    deps.push(Dependency::new(from, to, kind).with_lag(lag));
                }
            }
        }

        let cal = calendar(seed % 2 == 0, (seed % 3) as i64);
        let bounds = ScheduleBounds::starting(d(2025, 2, 3));
        let result = run(&tasks, &deps, &cal, bounds).unwrap();

        for t in &result.tasks {
            assert!(t.earliest_start <= t.latest_start, "seed {seed} task {}", t.task_id);
            assert!(t.earliest_finish <= t.latest_finish, "seed {seed} task {}", t.task_id);
            assert!(t.slack >= 0, "seed {seed} task {}", t.task_id);
        }
        assert!(!result.critical_path.is_empty(), "seed {seed}");
        for id in &result.critical_path {
            assert_eq!(result.task(*id).unwrap().slack, 0, "seed {seed} task {id}");
        }
        let last_finish = result.tasks.iter().map(|t| t.earliest_finish).max().unwrap();
        assert_eq!(result.end_date, last_finish, "seed {seed}");
        assert_eq!(
            cal.working_days_between(result.start_date, result.end_date),
            result.total_duration,
            "seed {seed}"
        );
        assert_eq!(result, run(&tasks, &deps, &cal, bounds).unwrap(), "seed {seed}");
    }
}

#[test]
fn schedule_past_the_last_representable_date_is_an_error() {
    // A century of maximal tasks at one hour per day runs past the calendar range
    let tasks: Vec<Task> = (1..=100)
        .map(|id| Task::new(id, format!("T{id}"), MAX_ESTIMATED_HOURS))
        .collect();
    let deps: Vec<Dependency> = (1..100)
        .map(|id| Dependency::finish_to_start(id, id + 1))
        .collect();
    let cal = WorkCalendar::new(&CalendarConfig {
        avoid_weekends: false,
        working_hours_per_day: 1,
        buffer_days: 0,
        apply_buffer: true,
    })
    .unwrap();

    let err = run(&tasks, &deps, &cal, ScheduleBounds::starting(d(2025, 1, 1))).unwrap_err();
    assert_eq!(err.code(), "date_out_of_range");
    assert!(matches!(err, ScheduleError::DateOutOfRange { offset, .. } if offset > 0));
}
