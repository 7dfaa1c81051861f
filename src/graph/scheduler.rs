//! Task scheduler: owns the per-task state machine and selects the next
//! ready task deterministically.
//!
//! Workers never mutate task state; they report outcomes and the engine
//! drives the transitions below.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::graph::builder::{TaskGraph, TaskIndex};
use crate::task::{Task, TaskId};

/// Lifecycle state of one task. Owned exclusively by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting; dependencies not yet examined or not yet satisfied
    #[default]
    Pending,
    /// Dependencies satisfied, eligible for dispatch
    Ready,
    /// Currently being driven through the worker loop
    Running,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully; never retried automatically
    Failed,
    /// Re-queued after being selected with unmet dependencies
    Deferred,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the task may still be selected by `next_ready`.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, Self::Pending | Self::Ready | Self::Deferred)
    }
}

/// Scheduler over a validated task graph.
pub struct Scheduler {
    graph: TaskGraph,
    states: Vec<TaskState>,
    completed: HashSet<TaskIndex>,
    defer_counts: Vec<u32>,
}

impl Scheduler {
    pub fn new(graph: TaskGraph) -> Self {
        let n = graph.len();
        Self {
            graph,
            states: vec![TaskState::Pending; n],
            completed: HashSet::new(),
            defer_counts: vec![0; n],
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn state_of(&self, id: TaskId) -> Option<TaskState> {
        self.graph.get_index(id).map(|i| self.states[i])
    }

    /// Pre-populate completion from a persisted record so a resumed run
    /// never re-dispatches finished work. Unknown ids (plan drift) are
    /// ignored.
    pub fn restore_completed(&mut self, ids: &[TaskId]) {
        for &id in ids {
            if let Some(idx) = self.graph.get_index(id) {
                self.states[idx] = TaskState::Completed;
                self.completed.insert(idx);
            }
        }
    }

    /// Promote satisfied `Pending` tasks to `Ready`. Purely informational
    /// for status output; `next_ready` considers both states.
    pub fn refresh_ready(&mut self) {
        for idx in 0..self.states.len() {
            if self.states[idx] == TaskState::Pending
                && self.graph.dependencies_satisfied(idx, &self.completed)
            {
                self.states[idx] = TaskState::Ready;
            }
        }
    }

    /// The next task to dispatch: schedulable, dependencies completed,
    /// highest priority first, ascending id as the tie-break. Two calls
    /// with identical state return the same task.
    pub fn next_ready(&self) -> Option<&Task> {
        self.graph
            .tasks()
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                self.states[*idx].is_schedulable()
                    && self.graph.dependencies_satisfied(*idx, &self.completed)
            })
            .min_by_key(|(_, task)| (task.priority.rank(), task.id))
            .map(|(_, task)| task)
    }

    pub fn mark_running(&mut self, id: TaskId) {
        self.set_state(id, TaskState::Running);
    }

    pub fn mark_completed(&mut self, id: TaskId) {
        if let Some(idx) = self.graph.get_index(id) {
            self.states[idx] = TaskState::Completed;
            self.completed.insert(idx);
        }
    }

    pub fn mark_failed(&mut self, id: TaskId) {
        self.set_state(id, TaskState::Failed);
    }

    /// Re-queue a task selected before its dependencies completed. The
    /// revisit counter feeds the engine's global iteration ceiling; the
    /// scheduler itself never loops.
    pub fn mark_deferred(&mut self, id: TaskId) {
        if let Some(idx) = self.graph.get_index(id) {
            self.states[idx] = TaskState::Deferred;
            self.defer_counts[idx] += 1;
        }
    }

    pub fn defer_count(&self, id: TaskId) -> u32 {
        self.graph
            .get_index(id)
            .map(|i| self.defer_counts[i])
            .unwrap_or(0)
    }

    fn set_state(&mut self, id: TaskId, state: TaskState) {
        if let Some(idx) = self.graph.get_index(id) {
            self.states[idx] = state;
        }
    }

    /// Whether every task reached a terminal state.
    pub fn all_resolved(&self) -> bool {
        self.states.iter().all(TaskState::is_terminal)
    }

    /// Completed task ids (unordered; the run context keeps completion
    /// order).
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn failed_ids(&self) -> Vec<TaskId> {
        self.ids_in_state(TaskState::Failed)
    }

    /// Tasks that can never run because a dependency failed, directly or
    /// transitively. Not cascaded to `Failed`: they stay distinct for
    /// inspection at run end.
    pub fn blocked_ids(&self) -> Vec<TaskId> {
        let mut doomed: HashSet<TaskIndex> = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == TaskState::Failed)
            .map(|(i, _)| i)
            .collect();

        // Propagate to a fixpoint: anything depending on a doomed task is
        // itself doomed.
        loop {
            let next: Vec<TaskIndex> = (0..self.states.len())
                .filter(|idx| {
                    !doomed.contains(idx)
                        && !self.states[*idx].is_terminal()
                        && self.graph.dependencies(*idx).iter().any(|d| doomed.contains(d))
                })
                .collect();
            if next.is_empty() {
                break;
            }
            doomed.extend(next);
        }

        let mut ids: Vec<TaskId> = doomed
            .into_iter()
            .filter(|idx| !self.states[*idx].is_terminal())
            .filter_map(|idx| self.graph.get_task(idx).map(|t| t.id))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Non-terminal tasks that are not blocked: never attempted, still
    /// satisfiable (for example when the iteration ceiling ended the run).
    pub fn never_attempted_ids(&self) -> Vec<TaskId> {
        let blocked: HashSet<TaskId> = self.blocked_ids().into_iter().collect();
        let mut ids: Vec<TaskId> = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_terminal())
            .filter_map(|(i, _)| self.graph.get_task(i).map(|t| t.id))
            .filter(|id| !blocked.contains(id))
            .collect();
        ids.sort_unstable();
        ids
    }

    fn ids_in_state(&self, state: TaskState) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == state)
            .filter_map(|(i, _)| self.graph.get_task(i).map(|t| t.id))
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::task::Priority;

    fn task(id: TaskId, deps: Vec<TaskId>, priority: Priority) -> Task {
        Task::new(id, &format!("Task {id}"), "", "", deps, priority)
    }

    fn scheduler(tasks: Vec<Task>) -> Scheduler {
        Scheduler::new(GraphBuilder::new(tasks).build().unwrap())
    }

    #[test]
    fn test_priority_then_id_tie_break() {
        // Scenario A: 1 high/no deps, 2 high/deps[1], 3 medium/deps[1]
        let mut sched = scheduler(vec![
            task(1, vec![], Priority::High),
            task(2, vec![1], Priority::High),
            task(3, vec![1], Priority::Medium),
        ]);

        assert_eq!(sched.next_ready().unwrap().id, 1);
        sched.mark_completed(1);
        assert_eq!(sched.next_ready().unwrap().id, 2);
        sched.mark_completed(2);
        assert_eq!(sched.next_ready().unwrap().id, 3);
        sched.mark_completed(3);
        assert!(sched.next_ready().is_none());
        assert!(sched.all_resolved());
    }

    #[test]
    fn test_next_ready_is_deterministic() {
        let sched = scheduler(vec![
            task(5, vec![], Priority::Medium),
            task(2, vec![], Priority::Medium),
            task(9, vec![], Priority::High),
        ]);
        let first = sched.next_ready().unwrap().id;
        let second = sched.next_ready().unwrap().id;
        assert_eq!(first, 9);
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_task_scheduled_exactly_once_in_dependency_order() {
        let mut sched = scheduler(vec![
            task(1, vec![], Priority::Low),
            task(2, vec![1], Priority::High),
            task(3, vec![1], Priority::Low),
            task(4, vec![2, 3], Priority::High),
        ]);

        let mut order = Vec::new();
        while let Some(t) = sched.next_ready().map(|t| t.id) {
            sched.mark_running(t);
            sched.mark_completed(t);
            order.push(t);
        }

        assert_eq!(order.len(), 4);
        let pos = |id: TaskId| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(1) < pos(2));
        assert!(pos(1) < pos(3));
        assert!(pos(2) < pos(4));
        assert!(pos(3) < pos(4));
    }

    #[test]
    fn test_failed_dependency_blocks_without_cascading_failure() {
        let mut sched = scheduler(vec![
            task(1, vec![], Priority::High),
            task(2, vec![1], Priority::High),
            task(3, vec![], Priority::Low),
        ]);

        sched.mark_running(1);
        sched.mark_failed(1);

        // Task 2 is blocked, not failed; task 3 is still schedulable.
        assert_eq!(sched.next_ready().unwrap().id, 3);
        assert_eq!(sched.blocked_ids(), vec![2]);
        assert_eq!(sched.failed_ids(), vec![1]);
        assert_eq!(sched.state_of(2), Some(TaskState::Pending));
    }

    #[test]
    fn test_blocked_propagates_transitively() {
        let mut sched = scheduler(vec![
            task(1, vec![], Priority::High),
            task(2, vec![1], Priority::High),
            task(3, vec![2], Priority::High),
        ]);
        sched.mark_failed(1);
        assert_eq!(sched.blocked_ids(), vec![2, 3]);
        assert!(sched.never_attempted_ids().is_empty());
    }

    #[test]
    fn test_never_attempted_distinct_from_blocked() {
        let mut sched = scheduler(vec![
            task(1, vec![], Priority::High),
            task(2, vec![1], Priority::High),
            task(3, vec![], Priority::Low),
        ]);
        sched.mark_completed(1);
        // Run ends here (e.g. iteration ceiling): 2 and 3 never attempted.
        assert!(sched.blocked_ids().is_empty());
        assert_eq!(sched.never_attempted_ids(), vec![2, 3]);
    }

    #[test]
    fn test_restore_completed_skips_finished_work() {
        // Scenario D: resume with two tasks already completed.
        let mut sched = scheduler(vec![
            task(1, vec![], Priority::High),
            task(2, vec![1], Priority::High),
            task(3, vec![2], Priority::Medium),
        ]);
        sched.restore_completed(&[1, 2]);

        assert_eq!(sched.next_ready().unwrap().id, 3);
        assert_eq!(sched.completed_count(), 2);
        assert_eq!(sched.state_of(1), Some(TaskState::Completed));
    }

    #[test]
    fn test_restore_completed_ignores_unknown_ids() {
        let mut sched = scheduler(vec![task(1, vec![], Priority::High)]);
        sched.restore_completed(&[1, 42]);
        assert_eq!(sched.completed_count(), 1);
    }

    #[test]
    fn test_deferred_task_remains_schedulable() {
        let mut sched = scheduler(vec![task(1, vec![], Priority::High)]);
        sched.mark_deferred(1);
        assert_eq!(sched.defer_count(1), 1);
        assert_eq!(sched.state_of(1), Some(TaskState::Deferred));
        assert_eq!(sched.next_ready().unwrap().id, 1);
    }

    #[test]
    fn test_refresh_ready_promotes_satisfied_tasks() {
        let mut sched = scheduler(vec![
            task(1, vec![], Priority::High),
            task(2, vec![1], Priority::High),
        ]);
        sched.refresh_ready();
        assert_eq!(sched.state_of(1), Some(TaskState::Ready));
        assert_eq!(sched.state_of(2), Some(TaskState::Pending));
    }
}
