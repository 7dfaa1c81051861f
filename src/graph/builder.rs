//! Task graph construction from a plan's task list.
//!
//! All structural validation happens here: duplicate ids, references to
//! unknown tasks, and cycles are rejected before the scheduler ever sees
//! the graph.

use std::collections::{HashMap, HashSet};

use crate::errors::GraphError;
use crate::task::{Task, TaskId};

/// Index into the task list.
pub type TaskIndex = usize;

/// A validated directed acyclic graph of tasks.
#[derive(Debug)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index_map: HashMap<TaskId, TaskIndex>,
    /// index -> tasks that depend on it
    forward_edges: Vec<Vec<TaskIndex>>,
    /// index -> tasks it depends on
    reverse_edges: Vec<Vec<TaskIndex>>,
}

impl TaskGraph {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get_task(&self, index: TaskIndex) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn get_index(&self, id: TaskId) -> Option<TaskIndex> {
        self.index_map.get(&id).copied()
    }

    /// Tasks that depend on the given task.
    pub fn dependents(&self, index: TaskIndex) -> &[TaskIndex] {
        self.forward_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Tasks the given task depends on.
    pub fn dependencies(&self, index: TaskIndex) -> &[TaskIndex] {
        self.reverse_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Whether every dependency of a task is in the completed set.
    pub fn dependencies_satisfied(&self, index: TaskIndex, completed: &HashSet<TaskIndex>) -> bool {
        self.dependencies(index)
            .iter()
            .all(|dep| completed.contains(dep))
    }
}

/// Builder for validated task graphs.
pub struct GraphBuilder {
    tasks: Vec<Task>,
}

impl GraphBuilder {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Build the graph, rejecting duplicate ids, unknown dependency
    /// references, and cycles.
    pub fn build(self) -> Result<TaskGraph, GraphError> {
        let mut index_map = HashMap::new();
        for (i, task) in self.tasks.iter().enumerate() {
            if index_map.insert(task.id, i).is_some() {
                return Err(GraphError::DuplicateId(task.id));
            }
        }

        let mut forward_edges: Vec<Vec<TaskIndex>> = vec![Vec::new(); self.tasks.len()];
        let mut reverse_edges: Vec<Vec<TaskIndex>> = vec![Vec::new(); self.tasks.len()];

        for (to_idx, task) in self.tasks.iter().enumerate() {
            for &dep in &task.depends_on {
                let from_idx =
                    *index_map
                        .get(&dep)
                        .ok_or(GraphError::UnknownDependency {
                            task: task.id,
                            dependency: dep,
                        })?;
                forward_edges[from_idx].push(to_idx);
                reverse_edges[to_idx].push(from_idx);
            }
        }

        let graph = TaskGraph {
            tasks: self.tasks,
            index_map,
            forward_edges,
            reverse_edges,
        };

        Self::validate_no_cycles(&graph)?;

        Ok(graph)
    }

    /// Cycle check via Kahn's algorithm; the error names every task left
    /// with unresolved in-degree.
    fn validate_no_cycles(graph: &TaskGraph) -> Result<(), GraphError> {
        let mut in_degree: Vec<usize> = graph.reverse_edges.iter().map(Vec::len).collect();

        let mut queue: Vec<TaskIndex> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(i, _)| i)
            .collect();

        let mut processed = 0;
        while let Some(node) = queue.pop() {
            processed += 1;
            for &dependent in graph.dependents(node) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push(dependent);
                }
            }
        }

        if processed != graph.len() {
            let mut tasks: Vec<TaskId> = in_degree
                .iter()
                .enumerate()
                .filter(|&(_, deg)| *deg > 0)
                .filter_map(|(i, _)| graph.get_task(i).map(|t| t.id))
                .collect();
            tasks.sort_unstable();
            return Err(GraphError::CyclicDependency { tasks });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;

    fn task(id: TaskId, deps: Vec<TaskId>) -> Task {
        Task::new(
            id,
            &format!("Task {id}"),
            "",
            &format!("file{id}.html"),
            deps,
            Priority::Medium,
        )
    }

    #[test]
    fn test_build_simple_graph() {
        let graph = GraphBuilder::new(vec![
            task(1, vec![]),
            task(2, vec![1]),
            task(3, vec![1]),
            task(4, vec![2, 3]),
        ])
        .build()
        .unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.dependencies(graph.get_index(4).unwrap()).len(), 2);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = GraphBuilder::new(vec![task(1, vec![]), task(1, vec![])]).build();
        assert!(matches!(result, Err(GraphError::DuplicateId(1))));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let result = GraphBuilder::new(vec![task(1, vec![99])]).build();
        match result {
            Err(GraphError::UnknownDependency { task, dependency }) => {
                assert_eq!(task, 1);
                assert_eq!(dependency, 99);
            }
            other => panic!("Expected UnknownDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_rejected_with_involved_tasks() {
        let result =
            GraphBuilder::new(vec![task(1, vec![3]), task(2, vec![1]), task(3, vec![2])]).build();
        match result {
            Err(GraphError::CyclicDependency { tasks }) => {
                assert_eq!(tasks, vec![1, 2, 3]);
            }
            other => panic!("Expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let result = GraphBuilder::new(vec![task(1, vec![1])]).build();
        assert!(matches!(result, Err(GraphError::CyclicDependency { .. })));
    }

    #[test]
    fn test_empty_graph_builds() {
        let graph = GraphBuilder::new(vec![]).build().unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_dependencies_satisfied() {
        let graph = GraphBuilder::new(vec![task(1, vec![]), task(2, vec![1])])
            .build()
            .unwrap();

        let mut completed = HashSet::new();
        let idx2 = graph.get_index(2).unwrap();
        assert!(!graph.dependencies_satisfied(idx2, &completed));
        completed.insert(graph.get_index(1).unwrap());
        assert!(graph.dependencies_satisfied(idx2, &completed));
    }
}
