use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Design,
    Implementation,
    Testing,
    Deployment,
}

impl TaskPhase {
    pub fn all() -> &'static [TaskPhase] {
        &[
            TaskPhase::Design,
            TaskPhase::Implementation,
            TaskPhase::Testing,
            TaskPhase::Deployment,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPhase::Design => "design",
            TaskPhase::Implementation => "implementation",
            TaskPhase::Testing => "testing",
            TaskPhase::Deployment => "deployment",
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskPhase {
    type Err = crate::error::CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "design" => Ok(TaskPhase::Design),
            "implementation" => Ok(TaskPhase::Implementation),
            "testing" => Ok(TaskPhase::Testing),
            "deployment" => Ok(TaskPhase::Deployment),
            _ => Err(crate::error::CadenceError::SchemaInvalid(vec![format!(
                "invalid phase '{s}': expected one of design, implementation, testing, deployment"
            )])),
        }
    }
}

// ---------------------------------------------------------------------------
// PlanStructure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStructure {
    Flat,
    Hierarchical,
}

impl fmt::Display for PlanStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanStructure::Flat => "flat",
            PlanStructure::Hierarchical => "hierarchical",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
