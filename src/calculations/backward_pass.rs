use super::effective_lag;
use crate::dependency::Window;
use crate::graph::ScheduleDag;
use petgraph::graph::NodeIndex;

pub struct BackwardPass<'a> {
    dag: &'a ScheduleDag,
    durations: &'a [i64],
    buffer_days: i64,
}

impl<'a> BackwardPass<'a> {
    pub fn new(dag: &'a ScheduleDag, durations: &'a [i64], buffer_days: i64) -> Self {
        Self {
            dag,
            durations,
            buffer_days,
        }
    }

    /// Late windows indexed by node index. No task may finish after `finish_bound`.
    pub fn execute(&self, order: &[NodeIndex], finish_bound: i64) -> Vec<Window> {
        let mut late = vec![Window::new(finish_bound, 0); self.dag.task_count()];

        // Reverse topological order
        for &node in order.iter().rev() {
            let ix = node.index();
            let duration = self.durations[ix];

            // Determine allowed late finish from successors' late windows
            let latest_finish = self
                .dag
                .outgoing(node)
                .into_iter()
                .map(|(succ, link)| {
                    link.kind.latest_finish(
                        late[succ.index()],
                        effective_lag(&link, self.buffer_days),
                        duration,
                    )
                })
                .fold(finish_bound, i64::min);

            late[ix] = Window {
                start: latest_finish - duration,
                finish: latest_finish,
            };
        }
        late
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Dependency;
    use crate::graph::detect_cycle;
    use crate::task::Task;

    #[test]
    fn join_takes_the_tighter_successor() {
        // 1 -> {2, 3} -> 4 with durations 2, 3, 1, 2
        let tasks: Vec<Task> = (1..=4).map(|id| Task::new(id, "", 8.0)).collect();
        let deps = vec![
            Dependency::finish_to_start(1, 2),
            Dependency::finish_to_start(1, 3),
            Dependency::finish_to_start(2, 4),
            Dependency::finish_to_start(3, 4),
        ];
        let dag = ScheduleDag::build(&tasks, &deps).unwrap();
        let report = detect_cycle(&dag);
        let durations = [2, 3, 1, 2];
        let late = BackwardPass::new(&dag, &durations, 0).execute(report.topological_order(), 7);

        let at = |id| late[dag.index_of(id).unwrap().index()];
        assert_eq!(at(4), Window::new(5, 2));
        assert_eq!(at(2), Window::new(2, 3));
        assert_eq!(at(3), Window::new(4, 1));
        assert_eq!(at(1), Window::new(0, 2));
    }
}
