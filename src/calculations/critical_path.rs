use super::effective_lag;
use crate::dependency::Window;
use crate::graph::{Link, ScheduleDag};
use petgraph::graph::NodeIndex;
use std::cmp::Reverse;

pub struct CriticalPathWalker<'a> {
    dag: &'a ScheduleDag,
    early: &'a [Window],
    slack: &'a [i64],
    buffer_days: i64,
}

impl<'a> CriticalPathWalker<'a> {
    pub fn new(
        dag: &'a ScheduleDag,
        early: &'a [Window],
        slack: &'a [i64],
        buffer_days: i64,
    ) -> Self {
        Self {
            dag,
            early,
            slack,
            buffer_days,
        }
    }

    fn is_critical(&self, node: NodeIndex) -> bool {
        self.slack[node.index()] == 0
    }

    /// True when `pred -> succ` is tight and both ends carry zero slack.
    pub fn is_critical_edge(&self, pred: NodeIndex, succ: NodeIndex, link: &Link) -> bool {
        self.is_critical(pred)
            && self.is_critical(succ)
            && link.kind.is_driving(
                self.early[pred.index()],
                self.early[succ.index()],
                effective_lag(link, self.buffer_days),
            )
    }

    /// Critical task finishing last; terminal tasks first, then the smallest id.
    fn terminal(&self) -> Option<NodeIndex> {
        let project_finish = self.early.iter().map(|w| w.finish).max()?;
        self.dag
            .graph
            .node_indices()
            .filter(|ix| self.is_critical(*ix) && self.early[ix.index()].finish == project_finish)
            .min_by_key(|ix| {
                let has_successors = !self.dag.outgoing(*ix).is_empty();
                (has_successors, self.dag.graph[*ix].id)
            })
    }

    /// Chain of zero-slack tasks from a start task to the project finish.
    pub fn walk(&self) -> Vec<NodeIndex> {
        let Some(mut current) = self.terminal() else {
            return Vec::new();
        };
        let mut path = vec![current];

        loop {
            let next = self
                .dag
                .incoming(current)
                .into_iter()
                .filter(|(pred, link)| self.is_critical_edge(*pred, current, link))
                .map(|(pred, _)| pred)
                // latest early finish wins, then the smallest id
                .max_by_key(|pred| {
                    (
                        self.early[pred.index()].finish,
                        Reverse(self.dag.graph[*pred].id),
                    )
                });

            match next {
                Some(pred) if !path.contains(&pred) => {
                    path.push(pred);
                    current = pred;
                }
                _ => break,
            }
        }

        path.reverse();
        path
    }
}
