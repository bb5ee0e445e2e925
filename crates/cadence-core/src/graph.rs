//! Pure validation over the task dependency graph. No I/O, no mutation:
//! callers reject the lock or amendment when validation fails.

use crate::error::{CadenceError, Result};
use crate::task::Task;
use crate::types::TaskStatus;
use std::collections::{HashMap, HashSet};

/// Validate the dependency relation: every referenced id must exist and the
/// graph must be acyclic. Duplicate ids are rejected first since both checks
/// assume ids are unique.
pub fn validate(tasks: &[Task]) -> Result<()> {
    let mut ids: HashSet<&str> = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !ids.insert(task.id.as_str()) {
            return Err(CadenceError::DuplicateTaskId(task.id.clone()));
        }
    }

    // Unknown references before traversal; the DFS assumes edges resolve.
    for task in tasks {
        for dep in &task.dependencies {
            if !ids.contains(dep.as_str()) {
                return Err(CadenceError::UnknownDependency {
                    task: task.id.clone(),
                    missing: dep.clone(),
                });
            }
        }
    }

    detect_cycle(tasks)
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Depth-first traversal; a back-edge to a node still on the current stack
/// signals a cycle, reported with the full cycle path for diagnostics.
fn detect_cycle(tasks: &[Task]) -> Result<()> {
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();
    let mut marks = vec![Mark::Unvisited; tasks.len()];
    let mut stack: Vec<usize> = Vec::new();

    for start in 0..tasks.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        if let Some(path) = visit(tasks, &index, &mut marks, &mut stack, start) {
            return Err(CadenceError::CycleDetected(path));
        }
    }
    Ok(())
}

fn visit(
    tasks: &[Task],
    index: &HashMap<&str, usize>,
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    node: usize,
) -> Option<Vec<String>> {
    marks[node] = Mark::OnStack;
    stack.push(node);

    for dep in &tasks[node].dependencies {
        let next = index[dep.as_str()];
        match marks[next] {
            Mark::OnStack => {
                // Cycle path: from the first occurrence of `next` on the
                // stack through `node`, closed by repeating the entry point.
                let pos = stack.iter().position(|&i| i == next).unwrap_or(0);
                let mut path: Vec<String> =
                    stack[pos..].iter().map(|&i| tasks[i].id.clone()).collect();
                path.push(tasks[next].id.clone());
                return Some(path);
            }
            Mark::Unvisited => {
                if let Some(path) = visit(tasks, index, marks, stack, next) {
                    return Some(path);
                }
            }
            Mark::Done => {}
        }
    }

    stack.pop();
    marks[node] = Mark::Done;
    None
}

/// Pending tasks whose every dependency is completed, in declaration order.
/// Ties are never broken by id sort: the flattened plan order preserves
/// author intent. Deprecated tasks are skipped, and a dependency on a
/// deprecated task counts as satisfied.
pub fn ready_tasks(tasks: &[Task]) -> Vec<&Task> {
    let satisfied: HashSet<&str> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed || t.deprecated)
        .map(|t| t.id.as_str())
        .collect();

    tasks
        .iter()
        .filter(|t| {
            !t.deprecated
                && t.status == TaskStatus::Pending
                && t.dependencies.iter().all(|d| satisfied.contains(d.as_str()))
        })
        .collect()
}

/// Dependencies of `task` that are not yet completed (and not deprecated),
/// in declaration order. Empty means the task is ready to start.
pub fn unmet_dependencies<'a>(tasks: &'a [Task], task: &'a Task) -> Vec<&'a str> {
    task.dependencies
        .iter()
        .filter(|dep| {
            tasks
                .iter()
                .find(|t| &t.id == *dep)
                .map(|t| t.status != TaskStatus::Completed && !t.deprecated)
                .unwrap_or(true)
        })
        .map(|d| d.as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskPhase;

    fn task(id: &str, deps: &[&str]) -> Task {
        let mut t = Task::new(id, id, TaskPhase::Implementation);
        t.dependencies = deps.iter().map(|d| d.to_string()).collect();
        t
    }

    #[test]
    fn accepts_dag() {
        let tasks = vec![
            task("TASK-001", &[]),
            task("TASK-002", &["TASK-001"]),
            task("TASK-003", &["TASK-001", "TASK-002"]),
        ];
        validate(&tasks).unwrap();
    }

    #[test]
    fn rejects_two_node_cycle_with_path() {
        let tasks = vec![task("TASK-001", &["TASK-002"]), task("TASK-002", &["TASK-001"])];
        match validate(&tasks) {
            Err(CadenceError::CycleDetected(path)) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 3);
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn rejects_self_cycle() {
        let tasks = vec![task("TASK-001", &["TASK-001"])];
        match validate(&tasks) {
            Err(CadenceError::CycleDetected(path)) => {
                assert_eq!(path, vec!["TASK-001", "TASK-001"]);
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn closing_edge_flips_result() {
        // DAG accepted; adding the edge that closes a cycle flips to rejected.
        let mut tasks = vec![
            task("TASK-001", &[]),
            task("TASK-002", &["TASK-001"]),
            task("TASK-003", &["TASK-002"]),
        ];
        validate(&tasks).unwrap();
        tasks[0].dependencies.push("TASK-003".to_string());
        assert!(matches!(
            validate(&tasks),
            Err(CadenceError::CycleDetected(_))
        ));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let tasks = vec![task("TASK-001", &["TASK-099"])];
        assert!(matches!(
            validate(&tasks),
            Err(CadenceError::UnknownDependency { task, missing })
                if task == "TASK-001" && missing == "TASK-099"
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let tasks = vec![task("TASK-001", &[]), task("TASK-001", &[])];
        assert!(matches!(
            validate(&tasks),
            Err(CadenceError::DuplicateTaskId(_))
        ));
    }

    #[test]
    fn ready_tasks_declaration_order() {
        // Declared out of id order on purpose: ready order must follow
        // declaration, not id sort.
        let mut t3 = task("TASK-003", &[]);
        t3.status = TaskStatus::Pending;
        let t1 = task("TASK-001", &[]);
        let mut t2 = task("TASK-002", &["TASK-001"]);
        t2.status = TaskStatus::Pending;
        let tasks = vec![t3, t1, t2];

        let ready: Vec<&str> = ready_tasks(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ready, vec!["TASK-003", "TASK-001"]);
    }

    #[test]
    fn ready_tasks_unlock_after_completion() {
        let t1 = {
            let mut t = task("TASK-001", &[]);
            t.status = TaskStatus::Completed;
            t
        };
        let t2 = task("TASK-002", &["TASK-001"]);
        let tasks = [t1, t2];
        let ready: Vec<&str> = ready_tasks(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ready, vec!["TASK-002"]);
    }

    #[test]
    fn deprecated_dependency_counts_as_satisfied() {
        let mut t1 = task("TASK-001", &[]);
        t1.deprecated = true;
        let t2 = task("TASK-002", &["TASK-001"]);
        let tasks = vec![t1, t2];
        let ready: Vec<&str> = ready_tasks(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ready, vec!["TASK-002"]);
        assert!(unmet_dependencies(&tasks, &tasks[1]).is_empty());
    }

    #[test]
    fn unmet_dependencies_lists_incomplete() {
        let t1 = task("TASK-001", &[]);
        let mut t2 = task("TASK-002", &[]);
        t2.status = TaskStatus::Completed;
        let t3 = task("TASK-003", &["TASK-001", "TASK-002"]);
        let tasks = vec![t1, t2, t3];
        assert_eq!(unmet_dependencies(&tasks, &tasks[2]), vec!["TASK-001"]);
    }
}
