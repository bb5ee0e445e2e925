use crate::error::{CadenceError, Result};
use crate::types::{TaskPhase, TaskStatus};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// The unit of work. Persisted one file per task under
/// `.claude/plans/<planId>/tasks/<id>.json` once the plan is locked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub phase: TaskPhase,
    pub estimated_hours: f64,
    pub status: TaskStatus,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub completion_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_issue: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, phase: TaskPhase) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            phase,
            estimated_hours: 0.0,
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            completion_criteria: Vec::new(),
            started_at: None,
            completed_at: None,
            external_issue: None,
            deprecated: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Task id format
// ---------------------------------------------------------------------------

static TASK_ID_RE: OnceLock<Regex> = OnceLock::new();

fn task_id_re() -> &'static Regex {
    TASK_ID_RE.get_or_init(|| Regex::new(r"^TASK-\d{3,}$").unwrap())
}

pub fn validate_task_id(id: &str) -> Result<()> {
    if !task_id_re().is_match(id) {
        return Err(CadenceError::InvalidTaskId(id.to_string()));
    }
    Ok(())
}

/// Format the `n`th task id: `TASK-001`, `TASK-002`, ...
pub fn format_task_id(n: u32) -> String {
    format!("TASK-{n:03}")
}

/// Parse the numeric component of a task id, for computing the next free id.
pub fn task_id_number(id: &str) -> Option<u32> {
    id.strip_prefix("TASK-")?.parse().ok()
}

// ---------------------------------------------------------------------------
// Lookup helpers
// ---------------------------------------------------------------------------

pub fn find<'a>(tasks: &'a [Task], id: &str) -> Result<&'a Task> {
    tasks
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| CadenceError::TaskNotFound(id.to_string()))
}

pub fn find_mut<'a>(tasks: &'a mut [Task], id: &str) -> Result<&'a mut Task> {
    tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| CadenceError::TaskNotFound(id.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_format() {
        validate_task_id("TASK-001").unwrap();
        validate_task_id("TASK-1234").unwrap();
        for bad in ["task-001", "TASK-1", "TASK-", "T1", ""] {
            assert!(validate_task_id(bad).is_err(), "expected invalid: {bad}");
        }
    }

    #[test]
    fn task_id_numbering() {
        assert_eq!(format_task_id(7), "TASK-007");
        assert_eq!(task_id_number("TASK-042"), Some(42));
        assert_eq!(task_id_number("bogus"), None);
    }

    #[test]
    fn task_serializes_camel_case() {
        let task = Task::new("TASK-001", "Write parser", TaskPhase::Implementation);
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"estimatedHours\""));
        assert!(json.contains("\"completionCriteria\""));
        // Unset optionals and the deprecated flag stay off the wire.
        assert!(!json.contains("startedAt"));
        assert!(!json.contains("deprecated"));
    }

    #[test]
    fn find_reports_missing_id() {
        let tasks = vec![Task::new("TASK-001", "A", TaskPhase::Design)];
        assert!(find(&tasks, "TASK-001").is_ok());
        assert!(matches!(
            find(&tasks, "TASK-099"),
            Err(CadenceError::TaskNotFound(id)) if id == "TASK-099"
        ));
    }
}
