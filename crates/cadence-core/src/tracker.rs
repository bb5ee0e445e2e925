use crate::error::{CadenceError, Result};
use crate::task::Task;
use crate::types::TaskStatus;
use crate::{io, paths};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub blocked: usize,
}

impl Statistics {
    /// Counts over the live (non-deprecated) task set.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut stats = Statistics::default();
        for task in tasks.iter().filter(|t| !t.deprecated) {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Blocked => stats.blocked += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed + self.blocked
    }
}

/// Derived, denormalized view of a plan's tasks, persisted as
/// `TASK-TRACKER.json`. Invariant: `active_task` is non-null iff exactly one
/// task is in progress. Re-established after every mutation and verified on
/// every load; a violation means a prior bug and is surfaced, never repaired.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTracker {
    pub plan_id: String,
    #[serde(default)]
    pub active_task: Option<String>,
    pub statistics: Statistics,
    pub task_files: Vec<String>,
}

impl TaskTracker {
    pub fn new(plan_id: impl Into<String>, tasks: &[Task]) -> Self {
        let mut tracker = Self {
            plan_id: plan_id.into(),
            active_task: None,
            statistics: Statistics::default(),
            task_files: Vec::new(),
        };
        tracker.recompute(tasks);
        tracker
    }

    /// Re-derive the active task, statistics, and file list from the task
    /// set. Must be called after every mutation before persisting.
    pub fn recompute(&mut self, tasks: &[Task]) {
        self.statistics = Statistics::from_tasks(tasks);
        self.active_task = tasks
            .iter()
            .find(|t| !t.deprecated && t.status == TaskStatus::InProgress)
            .map(|t| t.id.clone());
        self.task_files = tasks.iter().map(|t| format!("{}.json", t.id)).collect();
    }

    /// Detect the tracker and the task files disagreeing about what is in
    /// progress.
    pub fn verify(&self, tasks: &[Task]) -> Result<()> {
        let in_progress: Vec<&str> = tasks
            .iter()
            .filter(|t| !t.deprecated && t.status == TaskStatus::InProgress)
            .map(|t| t.id.as_str())
            .collect();

        match (&self.active_task, in_progress.as_slice()) {
            (None, []) => Ok(()),
            (Some(active), [only]) if active == only => Ok(()),
            (_, multiple) if multiple.len() > 1 => Err(CadenceError::TrackerCorrupted(format!(
                "multiple tasks in progress: [{}]",
                multiple.join(", ")
            ))),
            (Some(active), []) => Err(CadenceError::TrackerCorrupted(format!(
                "activeTask is '{active}' but no task is in progress"
            ))),
            (Some(active), [only]) => Err(CadenceError::TrackerCorrupted(format!(
                "activeTask is '{active}' but '{only}' is in progress"
            ))),
            (None, [only]) => Err(CadenceError::TrackerCorrupted(format!(
                "task '{only}' is in progress but activeTask is null"
            ))),
            _ => unreachable!(),
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path, plan_id: &str) -> Result<Self> {
        let path = paths::tracker_path(root, plan_id);
        if !path.exists() {
            return Err(CadenceError::TrackerMissing(plan_id.to_string()));
        }
        io::read_json(&path)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        io::write_json(&paths::tracker_path(root, &self.plan_id), self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskPhase;

    fn task(id: &str, status: TaskStatus) -> Task {
        let mut t = Task::new(id, id, TaskPhase::Implementation);
        t.status = status;
        t
    }

    #[test]
    fn recompute_tracks_active_and_counts() {
        let tasks = vec![
            task("TASK-001", TaskStatus::Completed),
            task("TASK-002", TaskStatus::InProgress),
            task("TASK-003", TaskStatus::Pending),
            task("TASK-004", TaskStatus::Blocked),
        ];
        let tracker = TaskTracker::new("plan-001-x", &tasks);
        assert_eq!(tracker.active_task.as_deref(), Some("TASK-002"));
        assert_eq!(tracker.statistics.completed, 1);
        assert_eq!(tracker.statistics.pending, 1);
        assert_eq!(tracker.statistics.blocked, 1);
        assert_eq!(tracker.statistics.total(), 4);
        assert_eq!(tracker.task_files.len(), 4);
        tracker.verify(&tasks).unwrap();
    }

    #[test]
    fn deprecated_tasks_excluded() {
        let mut dead = task("TASK-001", TaskStatus::Pending);
        dead.deprecated = true;
        let tasks = vec![dead, task("TASK-002", TaskStatus::Pending)];
        let tracker = TaskTracker::new("plan-001-x", &tasks);
        assert_eq!(tracker.statistics.total(), 1);
        // File list keeps deprecated ids resolvable.
        assert_eq!(tracker.task_files.len(), 2);
    }

    #[test]
    fn verify_detects_double_active() {
        let tasks = vec![
            task("TASK-001", TaskStatus::InProgress),
            task("TASK-002", TaskStatus::InProgress),
        ];
        let mut tracker = TaskTracker::new("plan-001-x", &[]);
        tracker.active_task = Some("TASK-001".to_string());
        assert!(matches!(
            tracker.verify(&tasks),
            Err(CadenceError::TrackerCorrupted(_))
        ));
    }

    #[test]
    fn verify_detects_stale_active_pointer() {
        let tasks = vec![task("TASK-001", TaskStatus::Pending)];
        let mut tracker = TaskTracker::new("plan-001-x", &tasks);
        tracker.active_task = Some("TASK-001".to_string());
        assert!(tracker.verify(&tasks).is_err());
    }

    #[test]
    fn verify_detects_missing_active_pointer() {
        let tasks = vec![task("TASK-001", TaskStatus::InProgress)];
        let mut tracker = TaskTracker::new("plan-001-x", &tasks);
        tracker.active_task = None;
        assert!(tracker.verify(&tasks).is_err());
    }

    #[test]
    fn tracker_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let tasks = vec![task("TASK-001", TaskStatus::Pending)];
        let tracker = TaskTracker::new("plan-001-x", &tasks);
        tracker.save(dir.path()).unwrap();

        let loaded = TaskTracker::load(dir.path(), "plan-001-x").unwrap();
        assert_eq!(loaded.plan_id, "plan-001-x");
        assert_eq!(loaded.statistics, tracker.statistics);
    }

    #[test]
    fn missing_tracker_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            TaskTracker::load(dir.path(), "plan-001-x"),
            Err(CadenceError::TrackerMissing(_))
        ));
    }
}
