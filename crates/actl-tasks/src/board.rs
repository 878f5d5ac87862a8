//! The immutable task board and its stable priority ordering.

use actl_core::Task;

/// An immutable snapshot of all tasks. Every mutator in this crate consumes
/// a board by value and returns a new one; there is no shared mutable
/// state to synchronize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBoard {
    tasks: Vec<Task>,
}

impl TaskBoard {
    /// An empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from existing tasks (e.g. loaded from storage),
    /// preserving their relative order.
    #[must_use]
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// All tasks, in board (insertion) order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks ordered by priority (`P0 < P1 < P2`, absent priority as `P2`),
    /// stable on ties so insertion order is preserved within a priority.
    #[must_use]
    pub fn sorted_by_priority(&self) -> Vec<&Task> {
        let mut refs: Vec<&Task> = self.tasks.iter().collect();
        refs.sort_by_key(|t| t.priority_rank());
        refs
    }

    pub(crate) fn push(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub(crate) fn replace(mut self, id: &str, updated: Task) -> Self {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == id) {
            *slot = updated;
        }
        self
    }

    pub(crate) fn without(mut self, id: &str) -> Self {
        self.tasks.retain(|t| t.id != id);
        self
    }
}
