use super::schedule_dag::ScheduleDag;
use crate::dependency::Dependency;
use crate::error::ScheduleError;
use crate::task::TaskId;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    OnStack,
    Done,
}

/// Outcome of cycle detection: the offending loop, or a topological order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CycleReport {
    cycle: Vec<TaskId>,
    order: Vec<NodeIndex>,
}

impl CycleReport {
    pub fn has_cycle(&self) -> bool {
        !self.cycle.is_empty()
    }

    /// Task ids forming the loop, first and last equal. Empty when acyclic.
    pub fn cycle(&self) -> &[TaskId] {
        &self.cycle
    }

    /// Empty when a cycle was found.
    pub fn topological_order(&self) -> &[NodeIndex] {
        &self.order
    }

    pub fn topological_ids(&self, dag: &ScheduleDag) -> Vec<TaskId> {
        self.order.iter().map(|ix| dag.graph[*ix].id).collect()
    }

    pub fn into_result(self) -> Result<Self, ScheduleError> {
        if self.has_cycle() {
            Err(ScheduleError::CyclicDependencyGraph { cycle: self.cycle })
        } else {
            Ok(self)
        }
    }
}

struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    cursor: usize,
}

fn sorted_successors(dag: &ScheduleDag, node: NodeIndex) -> Vec<NodeIndex> {
    let mut next: Vec<NodeIndex> = dag
        .graph
        .neighbors_directed(node, Direction::Outgoing)
        .collect();
    next.sort_by_key(|ix| dag.graph[*ix].id);
    next.dedup();
    next
}

/// Depth-first search with an explicit recursion stack.
pub fn detect_cycle(dag: &ScheduleDag) -> CycleReport {
    let graph = &dag.graph;
    let mut state = vec![VisitState::Unvisited; graph.node_count()];
    let mut postorder: Vec<NodeIndex> = Vec::with_capacity(graph.node_count());

    for root in dag.sorted_nodes() {
        if state[root.index()] != VisitState::Unvisited {
            continue;
        }
        state[root.index()] = VisitState::OnStack;
        let mut stack = vec![Frame {
            node: root,
            successors: sorted_successors(dag, root),
            cursor: 0,
        }];

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            if let Some(&next) = frame.successors.get(frame.cursor) {
                frame.cursor += 1;
                match state[next.index()] {
                    VisitState::Unvisited => {
                        state[next.index()] = VisitState::OnStack;
                        stack.push(Frame {
                            node: next,
                            successors: sorted_successors(dag, next),
                            cursor: 0,
                        });
                    }
                    VisitState::OnStack => {
                        let from = stack.iter().position(|f| f.node == next).unwrap_or(0);
                        let mut cycle: Vec<TaskId> =
                            stack[from..].iter().map(|f| graph[f.node].id).collect();
                        cycle.push(graph[next].id);
                        tracing::debug!(?cycle, "dependency cycle detected");
                        return CycleReport {
                            cycle,
                            order: Vec::new(),
                        };
                    }
                    VisitState::Done => {}
                }
            } else {
                let node = frame.node;
                stack.pop();
                state[node.index()] = VisitState::Done;
                postorder.push(node);
            }
        }
    }

    postorder.reverse();
    CycleReport {
        cycle: Vec::new(),
        order: postorder,
    }
}

/// The cycle that adding `candidate` would close, if any.
///
/// The graph itself is assumed acyclic; only paths through the new edge are searched.
pub fn would_create_cycle(
    dag: &ScheduleDag,
    candidate: &Dependency,
) -> Result<Option<Vec<TaskId>>, ScheduleError> {
    let source = dag
        .index_of(candidate.depends_on_id)
        .ok_or(ScheduleError::UnknownTaskReference {
            task_id: candidate.depends_on_id,
        })?;
    let target = dag
        .index_of(candidate.task_id)
        .ok_or(ScheduleError::UnknownTaskReference {
            task_id: candidate.task_id,
        })?;

    if source == target {
        return Ok(Some(vec![candidate.task_id, candidate.task_id]));
    }

    // Breadth-first from the new edge's target back to its source.
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([target]);
    let mut reached = false;
    while let Some(node) = queue.pop_front() {
        if node == source {
            reached = true;
            break;
        }
        for next in sorted_successors(dag, node) {
            if next != target && !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    if !reached {
        return Ok(None);
    }

    let mut path = vec![source];
    let mut current = source;
    while let Some(&prev) = parent.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();

    let mut cycle = vec![candidate.depends_on_id];
    cycle.extend(path.into_iter().map(|ix| dag.graph[ix].id));
    Ok(Some(cycle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn dag(ids: &[TaskId], edges: &[(TaskId, TaskId)]) -> ScheduleDag {
        let tasks: Vec<Task> = ids.iter().map(|id| Task::new(*id, "", 8.0)).collect();
        let deps: Vec<Dependency> = edges
            .iter()
            .map(|(from, to)| Dependency::finish_to_start(*from, *to))
            .collect();
        ScheduleDag::build(&tasks, &deps).unwrap()
    }

    #[test]
    fn three_cycle_is_reported_closed() {
        let graph = dag(&[1, 2, 3], &[(1, 2), (2, 3), (3, 1)]);
        let report = detect_cycle(&graph);
        assert!(report.has_cycle());
        assert_eq!(report.cycle(), &[1, 2, 3, 1]);
        assert!(report.topological_order().is_empty());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph = dag(&[1, 2], &[(1, 2), (2, 2)]);
        let report = detect_cycle(&graph);
        assert_eq!(report.cycle(), &[2, 2]);
    }

    #[test]
    fn acyclic_graph_yields_topological_order() {
        let graph = dag(&[4, 3, 2, 1], &[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let report = detect_cycle(&graph);
        assert!(!report.has_cycle());
        let order = report.topological_ids(&graph);
        assert_eq!(order.len(), 4);
        let pos = |id: TaskId| order.iter().position(|x| *x == id).unwrap();
        assert!(pos(1) < pos(2));
        assert!(pos(1) < pos(3));
        assert!(pos(2) < pos(4));
        assert!(pos(3) < pos(4));
    }

    #[test]
    fn into_result_carries_the_cycle() {
        let graph = dag(&[1, 2], &[(1, 2), (2, 1)]);
        let err = detect_cycle(&graph).into_result().unwrap_err();
        assert_eq!(
            err,
            ScheduleError::CyclicDependencyGraph {
                cycle: vec![1, 2, 1]
            }
        );
    }

    #[test]
    fn candidate_edge_closing_a_loop_is_detected() {
        let graph = dag(&[1, 2, 3], &[(1, 2), (2, 3)]);
        let closing = Dependency::finish_to_start(3, 1);
        assert_eq!(
            would_create_cycle(&graph, &closing).unwrap(),
            Some(vec![3, 1, 2, 3])
        );
        let harmless = Dependency::finish_to_start(1, 3);
        assert_eq!(would_create_cycle(&graph, &harmless).unwrap(), None);
        let unknown = Dependency::finish_to_start(1, 42);
        assert!(would_create_cycle(&graph, &unknown).is_err());
    }
}
