use crate::error::{CadenceError, Result};
use crate::task::{self, Task};
use crate::types::{PlanStructure, TaskPhase};
use crate::{io, paths};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub subprojects: Vec<Subproject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subproject {
    pub name: String,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// The top-level container, persisted as `PROJECT-PLAN.json`. A flat plan
/// carries its tasks directly; a hierarchical plan nests them under
/// Project -> Subproject -> Milestone. Once locked the document is frozen:
/// it becomes the replay baseline for the amendment log, and live task state
/// moves to the per-task files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub plan_id: String,
    pub title: String,
    pub structure: PlanStructure,
    pub estimated_hours: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub locked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Plan {
    pub fn new(plan_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            title: title.into(),
            structure: PlanStructure::Flat,
            estimated_hours: 0.0,
            created_at: Utc::now(),
            locked_at: None,
            tasks: Vec::new(),
            projects: Vec::new(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked_at.is_some()
    }

    /// Flatten the task tree into a linear list in declaration order. For a
    /// flat plan this is the task list itself; for a hierarchical plan the
    /// traversal is project, then subproject, then milestone order.
    pub fn flatten(&self) -> Vec<Task> {
        match self.structure {
            PlanStructure::Flat => self.tasks.clone(),
            PlanStructure::Hierarchical => {
                let mut out = Vec::new();
                for project in &self.projects {
                    for subproject in &project.subprojects {
                        for milestone in &subproject.milestones {
                            out.extend(milestone.tasks.iter().cloned());
                        }
                    }
                }
                out
            }
        }
    }

    /// Mutable references to every task in declaration order, used when the
    /// lock step assigns ids in place.
    pub fn tasks_mut(&mut self) -> Vec<&mut Task> {
        match self.structure {
            PlanStructure::Flat => self.tasks.iter_mut().collect(),
            PlanStructure::Hierarchical => {
                let mut out = Vec::new();
                for project in &mut self.projects {
                    for subproject in &mut project.subprojects {
                        for milestone in &mut subproject.milestones {
                            out.extend(milestone.tasks.iter_mut());
                        }
                    }
                }
                out
            }
        }
    }

    /// The next unused `TASK-NNN` id across the whole plan.
    pub fn next_task_id(&self) -> String {
        let max = self
            .flatten()
            .iter()
            .filter_map(|t| task::task_id_number(&t.id))
            .max()
            .unwrap_or(0);
        task::format_task_id(max + 1)
    }

    /// Schema validation run before locking: field-level checks the serde
    /// decode cannot express. Collects every problem instead of stopping at
    /// the first so the user fixes the plan in one pass.
    pub fn validate_schema(&self) -> Result<()> {
        let mut errors = Vec::new();

        if let Err(e) = paths::validate_plan_id(&self.plan_id) {
            errors.push(e.to_string());
        }
        if self.title.trim().is_empty() {
            errors.push("plan title must not be empty".to_string());
        }
        if !self.estimated_hours.is_finite() || self.estimated_hours < 0.0 {
            errors.push(format!(
                "plan estimatedHours must be a non-negative number, got {}",
                self.estimated_hours
            ));
        }
        match self.structure {
            PlanStructure::Flat if !self.projects.is_empty() => {
                errors.push("flat plan must not carry a project hierarchy".to_string());
            }
            PlanStructure::Hierarchical if !self.tasks.is_empty() => {
                errors.push("hierarchical plan must nest tasks under milestones".to_string());
            }
            _ => {}
        }

        for task in self.flatten() {
            if !task.id.is_empty() {
                if let Err(e) = task::validate_task_id(&task.id) {
                    errors.push(e.to_string());
                }
            }
            if task.title.trim().is_empty() {
                errors.push(format!("task '{}' has an empty title", task.id));
            }
            if !task.estimated_hours.is_finite() || task.estimated_hours < 0.0 {
                errors.push(format!(
                    "task '{}' estimatedHours must be a non-negative number",
                    task.id
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CadenceError::SchemaInvalid(errors))
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path, plan_id: &str) -> Result<Self> {
        let path = paths::plan_doc_path(root, plan_id);
        if !path.exists() {
            return Err(CadenceError::PlanNotFound(plan_id.to_string()));
        }
        io::read_json(&path)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        io::write_json(&paths::plan_doc_path(root, &self.plan_id), self)
    }

    /// Every plan directory under `.claude/plans`, sorted by creation time.
    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let plans_dir = paths::plans_dir(root);
        if !plans_dir.exists() {
            return Ok(Vec::new());
        }

        let mut plans = Vec::new();
        for entry in std::fs::read_dir(&plans_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let plan_id = entry.file_name().to_string_lossy().into_owned();
                match Self::load(root, &plan_id) {
                    Ok(p) => plans.push(p),
                    Err(CadenceError::PlanNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        plans.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(plans)
    }

    /// Add a draft task with the next free id. Rejected once locked.
    pub fn add_draft_task(&mut self, mut task: Task) -> Result<String> {
        if self.is_locked() {
            return Err(CadenceError::PlanLocked(self.plan_id.clone()));
        }
        if task.id.is_empty() {
            task.id = self.next_task_id();
        } else {
            task::validate_task_id(&task.id)?;
        }
        let id = task.id.clone();
        match self.structure {
            PlanStructure::Flat => self.tasks.push(task),
            PlanStructure::Hierarchical => {
                return Err(CadenceError::SchemaInvalid(vec![
                    "add-task on a hierarchical plan requires editing PROJECT-PLAN.json directly"
                        .to_string(),
                ]));
            }
        }
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft_task(title: &str) -> Task {
        let mut t = Task::new("", title, TaskPhase::Implementation);
        t.estimated_hours = 1.0;
        t
    }

    #[test]
    fn flat_plan_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut plan = Plan::new("plan-001-auth", "Auth work");
        plan.add_draft_task(draft_task("First")).unwrap();
        plan.save(dir.path()).unwrap();

        let loaded = Plan::load(dir.path(), "plan-001-auth").unwrap();
        assert_eq!(loaded.title, "Auth work");
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].id, "TASK-001");
        assert!(!loaded.is_locked());
    }

    #[test]
    fn draft_ids_are_sequential() {
        let mut plan = Plan::new("plan-001-auth", "Auth");
        assert_eq!(plan.add_draft_task(draft_task("A")).unwrap(), "TASK-001");
        assert_eq!(plan.add_draft_task(draft_task("B")).unwrap(), "TASK-002");
    }

    #[test]
    fn add_task_rejected_after_lock() {
        let mut plan = Plan::new("plan-001-auth", "Auth");
        plan.locked_at = Some(Utc::now());
        assert!(matches!(
            plan.add_draft_task(draft_task("A")),
            Err(CadenceError::PlanLocked(_))
        ));
    }

    #[test]
    fn hierarchical_flatten_declaration_order() {
        let mut plan = Plan::new("plan-002-platform", "Platform");
        plan.structure = PlanStructure::Hierarchical;
        plan.projects = vec![Project {
            name: "backend".to_string(),
            subprojects: vec![Subproject {
                name: "api".to_string(),
                milestones: vec![
                    Milestone {
                        name: "m1".to_string(),
                        tasks: vec![Task::new("TASK-001", "A", TaskPhase::Design)],
                    },
                    Milestone {
                        name: "m2".to_string(),
                        tasks: vec![
                            Task::new("TASK-002", "B", TaskPhase::Implementation),
                            Task::new("TASK-003", "C", TaskPhase::Testing),
                        ],
                    },
                ],
            }],
        }];

        let ids: Vec<String> = plan.flatten().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["TASK-001", "TASK-002", "TASK-003"]);
    }

    #[test]
    fn schema_validation_collects_errors() {
        let mut plan = Plan::new("not-a-plan-id", "");
        plan.estimated_hours = -2.0;
        match plan.validate_schema() {
            Err(CadenceError::SchemaInvalid(errors)) => {
                assert_eq!(errors.len(), 3);
            }
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
    }

    #[test]
    fn schema_rejects_mixed_structure() {
        let mut plan = Plan::new("plan-001-x", "X");
        plan.structure = PlanStructure::Hierarchical;
        plan.tasks.push(Task::new("TASK-001", "A", TaskPhase::Design));
        assert!(plan.validate_schema().is_err());
    }

    #[test]
    fn list_sorted_by_creation() {
        let dir = TempDir::new().unwrap();
        let mut p1 = Plan::new("plan-001-a", "A");
        p1.created_at = Utc::now() - chrono::Duration::hours(1);
        p1.save(dir.path()).unwrap();
        let p2 = Plan::new("plan-002-b", "B");
        p2.save(dir.path()).unwrap();

        let plans = Plan::list(dir.path()).unwrap();
        let ids: Vec<&str> = plans.iter().map(|p| p.plan_id.as_str()).collect();
        assert_eq!(ids, vec!["plan-001-a", "plan-002-b"]);
    }
}
