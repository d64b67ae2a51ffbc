use crate::dependency::{Dependency, DependencyType};
use crate::error::ScheduleError;
use crate::task::{Task, TaskId};
use crate::task_validation;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

/// Edge payload: relationship type and signed lag in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub kind: DependencyType,
    pub lag: i64,
}

/// Task arena plus index-based edge lists, edges pointing predecessor -> successor.
#[derive(Debug, Clone)]
pub struct ScheduleDag {
    pub graph: DiGraph<Task, Link>,
    pub id_to_index: HashMap<TaskId, NodeIndex>,
}

impl ScheduleDag {
    pub fn build(tasks: &[Task], dependencies: &[Dependency]) -> Result<Self, ScheduleError> {
        task_validation::validate_task_collection(tasks)?;

        let mut graph: DiGraph<Task, Link> =
            DiGraph::with_capacity(tasks.len(), dependencies.len());
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::with_capacity(tasks.len());

        // Add nodes first
        for task in tasks {
            let node_ix = graph.add_node(task.clone());
            id_to_index.insert(task.id, node_ix);
        }

        // Add edges: depends_on -> task
        let mut seen: HashSet<(TaskId, TaskId, DependencyType)> =
            HashSet::with_capacity(dependencies.len());
        for dep in dependencies {
            let source = *id_to_index
                .get(&dep.depends_on_id)
                .ok_or(ScheduleError::UnknownTaskReference {
                    task_id: dep.depends_on_id,
                })?;
            let target = *id_to_index
                .get(&dep.task_id)
                .ok_or(ScheduleError::UnknownTaskReference {
                    task_id: dep.task_id,
                })?;
            if !dep.has_valid_lag() {
                return Err(ScheduleError::InvalidLag {
                    depends_on_id: dep.depends_on_id,
                    task_id: dep.task_id,
                    lag: dep.lag,
                });
            }
            if !seen.insert((dep.depends_on_id, dep.task_id, dep.kind)) {
                return Err(ScheduleError::DuplicateDependency {
                    depends_on_id: dep.depends_on_id,
                    task_id: dep.task_id,
                    kind: dep.kind,
                });
            }
            graph.add_edge(
                source,
                target,
                Link {
                    kind: dep.kind,
                    lag: dep.lag,
                },
            );
        }

        tracing::debug!(
            tasks = graph.node_count(),
            dependencies = graph.edge_count(),
            "built dependency graph"
        );
        Ok(Self { graph, id_to_index })
    }

    /// Same task arena with every edge removed.
    pub fn without_dependencies(&self) -> Self {
        let mut graph = self.graph.clone();
        graph.clear_edges();
        Self {
            graph,
            id_to_index: self.id_to_index.clone(),
        }
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, task_id: TaskId) -> Option<NodeIndex> {
        self.id_to_index.get(&task_id).copied()
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.index_of(task_id).map(|ix| &self.graph[ix])
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.graph.node_weights()
    }

    /// Node indices ordered by ascending task id.
    pub fn sorted_nodes(&self) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        nodes.sort_by_key(|ix| self.graph[*ix].id);
        nodes
    }

    /// Direct predecessors of `node` with the connecting edge, ordered by task id.
    pub fn incoming(&self, node: NodeIndex) -> Vec<(NodeIndex, Link)> {
        self.neighbours(node, Direction::Incoming)
    }

    /// Direct successors of `node` with the connecting edge, ordered by task id.
    pub fn outgoing(&self, node: NodeIndex) -> Vec<(NodeIndex, Link)> {
        self.neighbours(node, Direction::Outgoing)
    }

    fn neighbours(&self, node: NodeIndex, direction: Direction) -> Vec<(NodeIndex, Link)> {
        let mut edges: Vec<(NodeIndex, Link)> = self
            .graph
            .edges_directed(node, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                (other, *edge.weight())
            })
            .collect();
        edges.sort_by_key(|(ix, link)| (self.graph[*ix].id, link.kind));
        edges
    }

    pub fn predecessors(&self, task_id: TaskId) -> Vec<(TaskId, Link)> {
        self.index_of(task_id)
            .map(|ix| {
                self.incoming(ix)
                    .into_iter()
                    .map(|(pred, link)| (self.graph[pred].id, link))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn successors(&self, task_id: TaskId) -> Vec<(TaskId, Link)> {
        self.index_of(task_id)
            .map(|ix| {
                self.outgoing(ix)
                    .into_iter()
                    .map(|(succ, link)| (self.graph[succ].id, link))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Edges back in input order.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.graph
            .edge_indices()
            .filter_map(|edge| {
                let (source, target) = self.graph.edge_endpoints(edge)?;
                let link = self.graph[edge];
                Some(Dependency {
                    task_id: self.graph[target].id,
                    depends_on_id: self.graph[source].id,
                    kind: link.kind,
                    lag: link.lag,
                })
            })
            .collect()
    }
}
