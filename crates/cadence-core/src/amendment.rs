//! The only legal post-lock mutation path. Every applied change appends a
//! reasoned, timestamped entry to `AMENDMENTS.json`; the log is append-only
//! and replaying it against the locked plan reproduces the current task set.

use crate::error::{CadenceError, Result};
use crate::task::{self, Task};
use crate::types::{TaskPhase, TaskStatus};
use crate::{graph, io, paths};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

// ---------------------------------------------------------------------------
// AmendmentEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendmentEntry {
    pub timestamp: DateTime<Utc>,
    pub task_id: String,
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub reason: String,
    pub amended_by: String,
}

// ---------------------------------------------------------------------------
// AmendmentChange
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum AmendmentChange {
    SetTitle { task_id: String, title: String },
    SetDescription { task_id: String, description: String },
    SetHours { task_id: String, hours: f64 },
    SetPhase { task_id: String, phase: TaskPhase },
    SetDependencies { task_id: String, dependencies: Vec<String> },
    AddTask { task: Task },
    Deprecate { task_id: String },
    Block { task_id: String },
    Unblock { task_id: String },
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Apply `change` to the live task set, returning the log entry describing
/// it. Rejections leave `tasks` untouched.
pub fn apply(
    tasks: &mut Vec<Task>,
    change: AmendmentChange,
    reason: &str,
    amended_by: &str,
) -> Result<AmendmentEntry> {
    if reason.trim().is_empty() {
        return Err(CadenceError::AmendmentRejected(
            "a non-empty reason is required".to_string(),
        ));
    }

    let entry = match change {
        AmendmentChange::SetTitle { task_id, title } => {
            let t = task::find_mut(tasks, &task_id)?;
            let old = std::mem::replace(&mut t.title, title.clone());
            entry(&task_id, "title", old.into(), title.into(), reason, amended_by)
        }
        AmendmentChange::SetDescription { task_id, description } => {
            let t = task::find_mut(tasks, &task_id)?;
            let old = t.description.replace(description.clone());
            entry(
                &task_id,
                "description",
                old.map(Value::from).unwrap_or(Value::Null),
                description.into(),
                reason,
                amended_by,
            )
        }
        AmendmentChange::SetHours { task_id, hours } => {
            if !hours.is_finite() || hours < 0.0 {
                return Err(CadenceError::AmendmentRejected(format!(
                    "estimatedHours must be a non-negative number, got {hours}"
                )));
            }
            let t = task::find_mut(tasks, &task_id)?;
            let old = std::mem::replace(&mut t.estimated_hours, hours);
            entry(&task_id, "estimatedHours", old.into(), hours.into(), reason, amended_by)
        }
        AmendmentChange::SetPhase { task_id, phase } => {
            let t = task::find_mut(tasks, &task_id)?;
            let old = std::mem::replace(&mut t.phase, phase);
            entry(
                &task_id,
                "phase",
                old.as_str().into(),
                phase.as_str().into(),
                reason,
                amended_by,
            )
        }
        AmendmentChange::SetDependencies { task_id, dependencies } => {
            set_dependencies(tasks, &task_id, dependencies, reason, amended_by)?
        }
        AmendmentChange::AddTask { task } => add_task(tasks, task, reason, amended_by)?,
        AmendmentChange::Deprecate { task_id } => {
            let t = task::find_mut(tasks, &task_id)?;
            if t.deprecated {
                return Err(CadenceError::AmendmentRejected(format!(
                    "task '{task_id}' is already deprecated"
                )));
            }
            if t.status == TaskStatus::InProgress {
                return Err(CadenceError::AmendmentRejected(format!(
                    "task '{task_id}' is in progress; complete or reset it first"
                )));
            }
            t.deprecated = true;
            entry(&task_id, "deprecated", false.into(), true.into(), reason, amended_by)
        }
        AmendmentChange::Block { task_id } => {
            let t = task::find_mut(tasks, &task_id)?;
            if t.status != TaskStatus::Pending {
                return Err(CadenceError::AmendmentRejected(format!(
                    "only a pending task can be blocked; '{}' is {}",
                    task_id, t.status
                )));
            }
            t.status = TaskStatus::Blocked;
            entry(&task_id, "status", "pending".into(), "blocked".into(), reason, amended_by)
        }
        AmendmentChange::Unblock { task_id } => {
            let t = task::find_mut(tasks, &task_id)?;
            if t.status != TaskStatus::Blocked {
                return Err(CadenceError::AmendmentRejected(format!(
                    "task '{}' is not blocked (status: {})",
                    task_id, t.status
                )));
            }
            t.status = TaskStatus::Pending;
            entry(&task_id, "status", "blocked".into(), "pending".into(), reason, amended_by)
        }
    };

    Ok(entry)
}

fn set_dependencies(
    tasks: &mut [Task],
    task_id: &str,
    dependencies: Vec<String>,
    reason: &str,
    amended_by: &str,
) -> Result<AmendmentEntry> {
    let target = task::find(tasks, task_id)?;
    let old = target.dependencies.clone();
    let target_completed = target.status == TaskStatus::Completed;

    // A completed task must not acquire a dependency on unfinished work:
    // that would retroactively invalidate its completion.
    if target_completed {
        for dep in &dependencies {
            let dep_task = task::find(tasks, dep)?;
            if dep_task.status != TaskStatus::Completed && !dep_task.deprecated {
                return Err(CadenceError::AmendmentRejected(format!(
                    "'{task_id}' is completed; adding a dependency on incomplete '{dep}' \
                     would invalidate it"
                )));
            }
        }
    }

    // Trial-apply, validate, then commit.
    let mut trial: Vec<Task> = tasks.to_vec();
    task::find_mut(&mut trial, task_id)?.dependencies = dependencies.clone();
    graph::validate(&trial)?;

    task::find_mut(tasks, task_id)?.dependencies = dependencies.clone();
    Ok(entry(
        task_id,
        "dependencies",
        serde_json::to_value(old).unwrap_or(Value::Null),
        serde_json::to_value(dependencies).unwrap_or(Value::Null),
        reason,
        amended_by,
    ))
}

fn add_task(
    tasks: &mut Vec<Task>,
    mut new_task: Task,
    reason: &str,
    amended_by: &str,
) -> Result<AmendmentEntry> {
    if new_task.id.is_empty() {
        let max = tasks.iter().filter_map(|t| task::task_id_number(&t.id)).max();
        new_task.id = task::format_task_id(max.unwrap_or(0) + 1);
    } else {
        task::validate_task_id(&new_task.id)?;
        if tasks.iter().any(|t| t.id == new_task.id) {
            return Err(CadenceError::DuplicateTaskId(new_task.id));
        }
    }
    new_task.status = TaskStatus::Pending;
    new_task.started_at = None;
    new_task.completed_at = None;

    let mut trial = tasks.clone();
    trial.push(new_task.clone());
    graph::validate(&trial)?;

    let id = new_task.id.clone();
    let value = serde_json::to_value(&new_task)?;
    tasks.push(new_task);
    Ok(entry(&id, "task", Value::Null, value, reason, amended_by))
}

fn entry(
    task_id: &str,
    field: &str,
    old_value: Value,
    new_value: Value,
    reason: &str,
    amended_by: &str,
) -> AmendmentEntry {
    AmendmentEntry {
        timestamp: Utc::now(),
        task_id: task_id.to_string(),
        field: field.to_string(),
        old_value,
        new_value,
        reason: reason.to_string(),
        amended_by: amended_by.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Mechanically re-apply logged entries to the locked plan's task set.
/// Used by audit tooling to confirm the log reproduces current state.
pub fn replay(base: &[Task], entries: &[AmendmentEntry]) -> Result<Vec<Task>> {
    let mut tasks: Vec<Task> = base.to_vec();
    for e in entries {
        match e.field.as_str() {
            "task" => {
                let new_task: Task = serde_json::from_value(e.new_value.clone())?;
                tasks.push(new_task);
            }
            field => {
                let t = task::find_mut(&mut tasks, &e.task_id)?;
                match field {
                    "title" => t.title = as_str(&e.new_value),
                    "description" => t.description = Some(as_str(&e.new_value)),
                    "estimatedHours" => t.estimated_hours = e.new_value.as_f64().unwrap_or(0.0),
                    "phase" => t.phase = as_str(&e.new_value).parse()?,
                    "dependencies" => {
                        t.dependencies = serde_json::from_value(e.new_value.clone())?;
                    }
                    "deprecated" => t.deprecated = e.new_value.as_bool().unwrap_or(false),
                    "status" => {
                        t.status = match as_str(&e.new_value).as_str() {
                            "blocked" => TaskStatus::Blocked,
                            _ => TaskStatus::Pending,
                        };
                    }
                    other => {
                        return Err(CadenceError::TrackerCorrupted(format!(
                            "amendment log contains unknown field '{other}'"
                        )));
                    }
                }
            }
        }
    }
    Ok(tasks)
}

fn as_str(v: &Value) -> String {
    v.as_str().unwrap_or_default().to_string()
}

// ---------------------------------------------------------------------------
// Log persistence
// ---------------------------------------------------------------------------

/// Materialize an empty log at lock time so the file always exists for a
/// locked plan.
pub fn init_log(root: &Path, plan_id: &str) -> Result<()> {
    let log: Vec<AmendmentEntry> = Vec::new();
    io::write_json(&paths::amendments_path(root, plan_id), &log)
}

pub fn load_log(root: &Path, plan_id: &str) -> Result<Vec<AmendmentEntry>> {
    let path = paths::amendments_path(root, plan_id);
    if !path.exists() {
        return Ok(Vec::new());
    }
    io::read_json(&path)
}

/// Append `entry` to the log. Entries are never edited or removed.
pub fn append_log(root: &Path, plan_id: &str, entry: &AmendmentEntry) -> Result<()> {
    let mut log = load_log(root, plan_id)?;
    log.push(entry.clone());
    io::write_json(&paths::amendments_path(root, plan_id), &log)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
