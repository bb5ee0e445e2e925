//! The lifecycle engine: every exposed operation shares the same shape —
//! acquire the advisory store lock, load and verify state, apply the
//! transition, persist, then mirror externally best-effort. Local-state
//! failures abort before any write; mirror failures downgrade to warnings
//! because local state is authoritative.

use crate::amendment::{self, AmendmentChange, AmendmentEntry};
use crate::config::TrackerConfig;
use crate::error::{CadenceError, Result};
use crate::flock::StoreGuard;
use crate::plan::Plan;
use crate::platform::{IssueTracker, Platform, PlatformBinding};
use crate::shell::SystemShell;
use crate::store::{self, ProjectContext};
use crate::task::{self, Task};
use crate::tracker::{Statistics, TaskTracker};
use crate::types::TaskStatus;
use crate::{graph, paths};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to the external mirror for one operation. Never a failure
/// of the operation itself.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MirrorOutcome {
    /// No backend configured, mirroring disabled, or nothing to push.
    Skipped,
    Synced {
        #[serde(skip_serializing_if = "Option::is_none")]
        external_id: Option<String>,
    },
    Failed { message: String },
}

impl MirrorOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, MirrorOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorReport {
    pub task_id: String,
    #[serde(flatten)]
    pub outcome: MirrorOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockReport {
    pub plan_id: String,
    pub already_locked: bool,
    pub statistics: Statistics,
    pub mirrors: Vec<MirrorReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionReport {
    pub task: Task,
    pub mirror: MirrorOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendReport {
    pub entry: AmendmentEntry,
    pub mirror: MirrorOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub plan_id: String,
    pub title: String,
    pub locked: bool,
    pub platform: Platform,
    pub statistics: Statistics,
    pub active_task: Option<String>,
    pub ready_tasks: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub mirrors: Vec<MirrorReport>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    ctx: ProjectContext,
    config: TrackerConfig,
    binding: PlatformBinding,
}

impl Engine {
    pub fn new(ctx: ProjectContext, config: TrackerConfig, binding: PlatformBinding) -> Self {
        Self {
            ctx,
            config,
            binding,
        }
    }

    /// Resolve the active plan at `root` and bind the detected platform.
    pub fn open(root: &Path) -> Result<Self> {
        let ctx = ProjectContext::discover(root)?;
        let config = TrackerConfig::load(root)?;
        let binding = PlatformBinding::resolve(root, &config, Arc::new(SystemShell));
        Ok(Self::new(ctx, config, binding))
    }

    pub fn context(&self) -> &ProjectContext {
        &self.ctx
    }

    pub fn platform(&self) -> Platform {
        self.binding.platform
    }

    // ---------------------------------------------------------------------------
    // Lock
    // ---------------------------------------------------------------------------

    /// Freeze the plan: validate, flatten, assign ids, materialize task
    /// files and the tracker, write the immutability marker. Idempotent on
    /// an already-locked plan — re-invocation reports current status.
    pub fn lock_plan(&self) -> Result<LockReport> {
        let _guard = StoreGuard::acquire(&paths::store_lock_path(&self.ctx.root))?;

        let mut plan = Plan::load(&self.ctx.root, &self.ctx.plan_id)?;
        if store::is_locked(&self.ctx.root, &self.ctx.plan_id) {
            let tracker = TaskTracker::load(&self.ctx.root, &self.ctx.plan_id)?;
            return Ok(LockReport {
                plan_id: self.ctx.plan_id.clone(),
                already_locked: true,
                statistics: tracker.statistics,
                mirrors: Vec::new(),
            });
        }

        plan.validate_schema()?;
        assign_ids(&mut plan)?;
        let mut tasks = plan.flatten();
        graph::validate(&tasks)?;

        // Freeze the plan document: it becomes the amendment replay baseline.
        let now = Utc::now();
        plan.locked_at = Some(now);
        plan.save(&self.ctx.root)?;

        store::save_tasks(&self.ctx, &tasks)?;
        let tracker = TaskTracker::new(&self.ctx.plan_id, &tasks);
        tracker.save(&self.ctx.root)?;
        amendment::init_log(&self.ctx.root, &self.ctx.plan_id)?;
        store::write_lock_marker(&self.ctx.root, &self.ctx.plan_id, now)?;

        // Local state is committed; mirror each task best-effort and record
        // the external ids as they come back. A crash here leaves at worst
        // unmirrored tasks, which `sync` repairs.
        let mut mirrors = Vec::new();
        if self.config.auto_create {
            for task in &mut tasks {
                let outcome = self.mirror(|t| t.create_item(task).map(Some));
                if let MirrorOutcome::Synced {
                    external_id: Some(id),
                } = &outcome
                {
                    task.external_issue = Some(id.clone());
                    store::save_task(&self.ctx, task)?;
                }
                mirrors.push(MirrorReport {
                    task_id: task.id.clone(),
                    outcome,
                });
            }
        }

        Ok(LockReport {
            plan_id: self.ctx.plan_id.clone(),
            already_locked: false,
            statistics: tracker.statistics,
            mirrors,
        })
    }

    // ---------------------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------------------

    /// pending -> in_progress. Guards: no other task active, every
    /// dependency completed. Rejections leave state untouched.
    pub fn start_task(&self, id: &str) -> Result<TransitionReport> {
        let _guard = StoreGuard::acquire(&paths::store_lock_path(&self.ctx.root))?;
        let (mut tracker, mut tasks) = self.load_snapshot()?;

        {
            let target = task::find(&tasks, id)?;
            if target.deprecated {
                return Err(CadenceError::TaskDeprecated(id.to_string()));
            }
            if let Some(active) = &tracker.active_task {
                return Err(CadenceError::TaskAlreadyActive {
                    starting: id.to_string(),
                    active: active.clone(),
                });
            }
            match target.status {
                TaskStatus::Completed => {
                    return Err(CadenceError::TaskAlreadyCompleted(id.to_string()))
                }
                TaskStatus::Blocked => return Err(CadenceError::TaskBlocked(id.to_string())),
                TaskStatus::Pending | TaskStatus::InProgress => {}
            }
            let unmet = graph::unmet_dependencies(&tasks, target);
            if !unmet.is_empty() {
                return Err(CadenceError::UnmetDependencies {
                    task: id.to_string(),
                    unmet: unmet.iter().map(|s| s.to_string()).collect(),
                });
            }
        }

        let target = task::find_mut(&mut tasks, id)?;
        target.status = TaskStatus::InProgress;
        target.started_at = Some(Utc::now());
        let snapshot = target.clone();

        tracker.recompute(&tasks);
        store::save_task(&self.ctx, &snapshot)?;
        tracker.save(&self.ctx.root)?;

        let mirror = self.mirror_update(&snapshot);
        Ok(TransitionReport {
            task: snapshot,
            mirror,
        })
    }

    /// in_progress -> completed for the single active task.
    pub fn complete_active_task(&self) -> Result<TransitionReport> {
        let _guard = StoreGuard::acquire(&paths::store_lock_path(&self.ctx.root))?;
        let (mut tracker, mut tasks) = self.load_snapshot()?;

        let active = tracker
            .active_task
            .clone()
            .ok_or(CadenceError::NoActiveTask)?;
        let target = task::find_mut(&mut tasks, &active)?;
        target.status = TaskStatus::Completed;
        target.completed_at = Some(Utc::now());
        let snapshot = target.clone();

        tracker.recompute(&tasks);
        store::save_task(&self.ctx, &snapshot)?;
        tracker.save(&self.ctx.root)?;

        let mirror = if self.config.auto_close {
            match &snapshot.external_issue {
                Some(ext) => {
                    let comment = format!("Completed: {}", snapshot.title);
                    self.mirror(|t| t.close_item(ext, &comment).map(|()| None))
                }
                None => MirrorOutcome::Skipped,
            }
        } else {
            MirrorOutcome::Skipped
        };

        Ok(TransitionReport {
            task: snapshot,
            mirror,
        })
    }

    /// Explicit escape hatch back to pending. Resetting anything other than
    /// the in-progress task requires `force`; a blocked task is never reset
    /// here — unblocking is an amendment.
    pub fn reset_task(&self, id: &str, force: bool) -> Result<TransitionReport> {
        let _guard = StoreGuard::acquire(&paths::store_lock_path(&self.ctx.root))?;
        let (mut tracker, mut tasks) = self.load_snapshot()?;

        {
            let target = task::find(&tasks, id)?;
            if target.deprecated {
                return Err(CadenceError::TaskDeprecated(id.to_string()));
            }
            match target.status {
                TaskStatus::InProgress => {}
                TaskStatus::Blocked => return Err(CadenceError::TaskBlocked(id.to_string())),
                TaskStatus::Completed | TaskStatus::Pending if !force => {
                    return Err(CadenceError::ResetRequiresForce {
                        id: id.to_string(),
                        status: target.status.to_string(),
                    });
                }
                _ => {}
            }
        }

        let target = task::find_mut(&mut tasks, id)?;
        target.status = TaskStatus::Pending;
        target.started_at = None;
        target.completed_at = None;
        let snapshot = target.clone();

        tracker.recompute(&tasks);
        store::save_task(&self.ctx, &snapshot)?;
        tracker.save(&self.ctx.root)?;

        let mirror = self.mirror_update(&snapshot);
        Ok(TransitionReport {
            task: snapshot,
            mirror,
        })
    }

    // ---------------------------------------------------------------------------
    // Amendments
    // ---------------------------------------------------------------------------

    /// The only post-lock mutation path: apply, log, persist, mirror.
    pub fn amend_plan(
        &self,
        change: AmendmentChange,
        reason: &str,
        amended_by: &str,
    ) -> Result<AmendReport> {
        let _guard = StoreGuard::acquire(&paths::store_lock_path(&self.ctx.root))?;
        if !store::is_locked(&self.ctx.root, &self.ctx.plan_id) {
            return Err(CadenceError::PlanNotLocked(self.ctx.plan_id.clone()));
        }
        let (mut tracker, mut tasks) = self.load_snapshot()?;

        let entry = amendment::apply(&mut tasks, change, reason, amended_by)?;

        store::save_tasks(&self.ctx, &tasks)?;
        tracker.recompute(&tasks);
        tracker.save(&self.ctx.root)?;
        amendment::append_log(&self.ctx.root, &self.ctx.plan_id, &entry)?;

        // Keep the mirrored item in step with the amended task.
        let amended = task::find(&tasks, &entry.task_id).ok().cloned();
        let mirror = match amended {
            Some(amended) => match &amended.external_issue {
                Some(_) => self.mirror_update(&amended),
                None if self.config.auto_create && !amended.deprecated => {
                    let outcome = self.mirror(|t| t.create_item(&amended).map(Some));
                    if let MirrorOutcome::Synced {
                        external_id: Some(ext),
                    } = &outcome
                    {
                        let target = task::find_mut(&mut tasks, &entry.task_id)?;
                        target.external_issue = Some(ext.clone());
                        store::save_task(&self.ctx, target)?;
                    }
                    outcome
                }
                None => MirrorOutcome::Skipped,
            },
            None => MirrorOutcome::Skipped,
        };

        Ok(AmendReport { entry, mirror })
    }

    // ---------------------------------------------------------------------------
    // Queries and sync
    // ---------------------------------------------------------------------------

    pub fn status(&self) -> Result<StatusReport> {
        let plan = Plan::load(&self.ctx.root, &self.ctx.plan_id)?;
        if !store::is_locked(&self.ctx.root, &self.ctx.plan_id) {
            let tasks = plan.flatten();
            return Ok(StatusReport {
                plan_id: plan.plan_id.clone(),
                title: plan.title.clone(),
                locked: false,
                platform: self.binding.platform,
                statistics: Statistics::from_tasks(&tasks),
                active_task: None,
                ready_tasks: Vec::new(),
            });
        }

        let (tracker, tasks) = self.load_snapshot()?;
        let ready = graph::ready_tasks(&tasks)
            .iter()
            .map(|t| t.id.clone())
            .collect();
        Ok(StatusReport {
            plan_id: plan.plan_id,
            title: plan.title,
            locked: true,
            platform: self.binding.platform,
            statistics: tracker.statistics,
            active_task: tracker.active_task,
            ready_tasks: ready,
        })
    }

    /// The live task set in declaration order, for listings.
    pub fn tasks(&self) -> Result<Vec<Task>> {
        let (_, tasks) = self.load_snapshot()?;
        Ok(tasks)
    }

    /// Re-mirror every live task: create items that were never mirrored,
    /// push current status to the rest. Repairs partial mirrors left by
    /// earlier network failures.
    pub fn sync(&self) -> Result<SyncReport> {
        let _guard = StoreGuard::acquire(&paths::store_lock_path(&self.ctx.root))?;
        let (_, mut tasks) = self.load_snapshot()?;

        let mut mirrors = Vec::new();
        for i in 0..tasks.len() {
            if tasks[i].deprecated {
                continue;
            }
            let outcome = match tasks[i].external_issue.clone() {
                Some(ext) => {
                    let task_ref = &tasks[i];
                    self.mirror(|t| t.update_item(task_ref, &ext).map(|()| None))
                }
                None => {
                    let task_ref = &tasks[i];
                    let outcome = self.mirror(|t| t.create_item(task_ref).map(Some));
                    if let MirrorOutcome::Synced {
                        external_id: Some(ext),
                    } = &outcome
                    {
                        tasks[i].external_issue = Some(ext.clone());
                        store::save_task(&self.ctx, &tasks[i])?;
                    }
                    outcome
                }
            };
            mirrors.push(MirrorReport {
                task_id: tasks[i].id.clone(),
                outcome,
            });
        }
        Ok(SyncReport { mirrors })
    }

    /// Post a comment on a task's mirrored item. Without a mirrored item
    /// there is nothing to comment on and the call is skipped.
    pub fn comment_task(&self, id: &str, text: &str) -> Result<MirrorReport> {
        let _guard = StoreGuard::acquire(&paths::store_lock_path(&self.ctx.root))?;
        let (_, tasks) = self.load_snapshot()?;
        let task = task::find(&tasks, id)?;
        let outcome = match &task.external_issue {
            Some(ext) => self.mirror(|t| t.add_comment(ext, text).map(|()| None)),
            None => MirrorOutcome::Skipped,
        };
        Ok(MirrorReport {
            task_id: task.id.clone(),
            outcome,
        })
    }

    // ---------------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------------

    fn load_snapshot(&self) -> Result<(TaskTracker, Vec<Task>)> {
        if !store::is_locked(&self.ctx.root, &self.ctx.plan_id) {
            return Err(CadenceError::PlanNotLocked(self.ctx.plan_id.clone()));
        }
        let tracker = TaskTracker::load(&self.ctx.root, &self.ctx.plan_id)?;
        let tasks = store::load_tasks(&self.ctx, &tracker)?;
        tracker.verify(&tasks)?;
        Ok((tracker, tasks))
    }

    /// Route one call to the bound tracker, downgrading failure to a
    /// warning. Local state is already committed when this runs.
    fn mirror<F>(&self, op: F) -> MirrorOutcome
    where
        F: FnOnce(&dyn IssueTracker) -> Result<Option<String>>,
    {
        let Some(tracker) = &self.binding.tracker else {
            return MirrorOutcome::Skipped;
        };
        match op(tracker.as_ref()) {
            Ok(external_id) => MirrorOutcome::Synced { external_id },
            Err(e) => {
                tracing::warn!("external mirror failed: {e}");
                MirrorOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    fn mirror_update(&self, task: &Task) -> MirrorOutcome {
        if !self.config.auto_update {
            return MirrorOutcome::Skipped;
        }
        match &task.external_issue {
            Some(ext) => self.mirror(|t| t.update_item(task, ext).map(|()| None)),
            None => MirrorOutcome::Skipped,
        }
    }
}

/// Confirm existing ids and assign the missing ones sequentially, in
/// declaration order, continuing after the highest confirmed number so ids
/// are never reused.
fn assign_ids(plan: &mut Plan) -> Result<()> {
    let mut next = plan
        .flatten()
        .iter()
        .filter_map(|t| task::task_id_number(&t.id))
        .max()
        .unwrap_or(0)
        + 1;
    for t in plan.tasks_mut() {
        if t.id.is_empty() {
            t.id = task::format_task_id(next);
            next += 1;
        } else {
            task::validate_task_id(&t.id)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
