pub mod cycle;
pub mod schedule_dag;

pub use cycle::{CycleReport, detect_cycle, would_create_cycle};
pub use schedule_dag::{Link, ScheduleDag};
