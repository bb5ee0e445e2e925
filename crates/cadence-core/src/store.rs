//! The persistent store: a directory tree of JSON documents under
//! `.claude/` that is the single source of truth. There is no long-lived
//! process, so every operation loads, validates, mutates, and persists
//! within one run.

use crate::config::TrackerConfig;
use crate::error::{CadenceError, Result};
use crate::task::Task;
use crate::tracker::TaskTracker;
use crate::{io, paths};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ProjectContext
// ---------------------------------------------------------------------------

/// Explicit root-and-plan handle passed into every engine call. Nothing in
/// the core depends on the process working directory.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub plan_id: String,
}

impl ProjectContext {
    pub fn new(root: impl Into<PathBuf>, plan_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            plan_id: plan_id.into(),
        }
    }

    /// Resolve the active plan for `root`.
    pub fn discover(root: &Path) -> Result<Self> {
        if !paths::claude_dir(root).is_dir() {
            return Err(CadenceError::NotInitialized);
        }
        match active_plan(root)? {
            Some(plan_id) => Ok(Self::new(root, plan_id)),
            None => Err(CadenceError::NoActivePlan),
        }
    }
}

// ---------------------------------------------------------------------------
// Store scaffolding
// ---------------------------------------------------------------------------

/// Create the `.claude/` tree and a default tracker config. Idempotent.
pub fn init(root: &Path) -> Result<()> {
    io::ensure_dir(&paths::plans_dir(root))?;
    io::write_if_missing(&paths::active_plan_path(root), b"")?;
    if !paths::tracker_config_path(root).exists() {
        TrackerConfig::default().save(root)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Active plan pointer
// ---------------------------------------------------------------------------

pub fn active_plan(root: &Path) -> Result<Option<String>> {
    let path = paths::active_plan_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    let id = content.trim();
    if id.is_empty() {
        Ok(None)
    } else {
        Ok(Some(id.to_string()))
    }
}

pub fn set_active_plan(root: &Path, plan_id: &str) -> Result<()> {
    if !paths::plan_dir(root, plan_id).is_dir() {
        return Err(CadenceError::PlanNotFound(plan_id.to_string()));
    }
    io::atomic_write(&paths::active_plan_path(root), format!("{plan_id}\n").as_bytes())
}

pub fn clear_active_plan(root: &Path) -> Result<()> {
    io::atomic_write(&paths::active_plan_path(root), b"")
}

// ---------------------------------------------------------------------------
// Lock and archive markers
// ---------------------------------------------------------------------------

pub fn is_locked(root: &Path, plan_id: &str) -> bool {
    paths::lock_marker_path(root, plan_id).exists()
}

pub fn write_lock_marker(root: &Path, plan_id: &str, at: DateTime<Utc>) -> Result<()> {
    io::atomic_write(
        &paths::lock_marker_path(root, plan_id),
        format!("{}\n", at.to_rfc3339()).as_bytes(),
    )
}

pub fn is_archived(root: &Path, plan_id: &str) -> bool {
    paths::archived_marker_path(root, plan_id).exists()
}

/// Archive, never delete: tag the plan directory and drop the active
/// pointer if it still points here.
pub fn archive_plan(root: &Path, plan_id: &str) -> Result<()> {
    if !paths::plan_dir(root, plan_id).is_dir() {
        return Err(CadenceError::PlanNotFound(plan_id.to_string()));
    }
    io::atomic_write(
        &paths::archived_marker_path(root, plan_id),
        format!("{}\n", Utc::now().to_rfc3339()).as_bytes(),
    )?;
    if active_plan(root)?.as_deref() == Some(plan_id) {
        clear_active_plan(root)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Task files
// ---------------------------------------------------------------------------

/// Load the live task set in tracker order. The tracker's file list is the
/// declaration order fixed at lock time (plus amendment appends), so it is
/// the authority on ordering.
pub fn load_tasks(ctx: &ProjectContext, tracker: &TaskTracker) -> Result<Vec<Task>> {
    let mut tasks = Vec::with_capacity(tracker.task_files.len());
    for file in &tracker.task_files {
        let path = paths::tasks_dir(&ctx.root, &ctx.plan_id).join(file);
        if !path.exists() {
            return Err(CadenceError::TrackerCorrupted(format!(
                "tracker lists '{file}' but the task file is missing"
            )));
        }
        tasks.push(io::read_json(&path)?);
    }
    Ok(tasks)
}

pub fn save_task(ctx: &ProjectContext, task: &Task) -> Result<()> {
    io::write_json(
        &paths::task_file_path(&ctx.root, &ctx.plan_id, &task.id),
        task,
    )
}

pub fn save_tasks(ctx: &ProjectContext, tasks: &[Task]) -> Result<()> {
    for task in tasks {
        save_task(ctx, task)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
