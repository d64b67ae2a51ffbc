use super::effective_lag;
use crate::dependency::Window;
use crate::graph::ScheduleDag;
use petgraph::graph::NodeIndex;

/// Early windows indexed by node index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarlyDates {
    pub windows: Vec<Window>,
    /// Set when the task's natural start fell before the project start and was clamped.
    pub constrained: Vec<bool>,
}

pub struct ForwardPass<'a> {
    dag: &'a ScheduleDag,
    durations: &'a [i64],
    buffer_days: i64,
}

impl<'a> ForwardPass<'a> {
    pub fn new(dag: &'a ScheduleDag, durations: &'a [i64], buffer_days: i64) -> Self {
        Self {
            dag,
            durations,
            buffer_days,
        }
    }

    /// `order` must be topological; `lower_bounds` holds start-no-earlier-than offsets.
    pub fn execute(&self, order: &[NodeIndex], lower_bounds: &[Option<i64>]) -> EarlyDates {
        let count = self.dag.task_count();
        let mut windows = vec![Window::new(0, 0); count];
        let mut constrained = vec![false; count];

        for &node in order {
            let ix = node.index();
            let duration = self.durations[ix];

            // Early start is the tightest of all incoming constraints
            let driven = self
                .dag
                .incoming(node)
                .into_iter()
                .map(|(pred, link)| {
                    link.kind.earliest_start(
                        windows[pred.index()],
                        effective_lag(&link, self.buffer_days),
                        duration,
                    )
                })
                .max();

            let natural = match (driven, lower_bounds.get(ix).copied().flatten()) {
                (Some(a), Some(b)) => a.max(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => 0,
            };
            if natural < 0 {
                constrained[ix] = true;
            }
            windows[ix] = Window::new(natural.max(0), duration);
        }

        EarlyDates {
            windows,
            constrained,
        }
    }
}
