use thiserror::Error;

#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("not initialized: run 'cadence init'")]
    NotInitialized,

    #[error("no active plan: run 'cadence plan new' or 'cadence plan activate'")]
    NoActivePlan,

    #[error("plan not found: {0}")]
    PlanNotFound(String),

    #[error("plan '{0}' is not locked: run 'cadence plan lock' first")]
    PlanNotLocked(String),

    #[error("plan '{0}' already exists")]
    PlanExists(String),

    #[error("plan '{0}' is locked: structural changes require 'cadence amend'")]
    PlanLocked(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task tracker missing for plan '{0}'")]
    TrackerMissing(String),

    #[error("cannot start '{starting}': task '{active}' is already in progress")]
    TaskAlreadyActive { starting: String, active: String },

    #[error("cannot start '{task}': unmet dependencies [{}]", unmet.join(", "))]
    UnmetDependencies { task: String, unmet: Vec<String> },

    #[error("task '{0}' is already completed")]
    TaskAlreadyCompleted(String),

    #[error("no task is in progress")]
    NoActiveTask,

    #[error("resetting '{id}' from status '{status}' requires --force")]
    ResetRequiresForce { id: String, status: String },

    #[error("task '{0}' is deprecated")]
    TaskDeprecated(String),

    #[error("task '{0}' is blocked: unblock it via 'cadence amend unblock'")]
    TaskBlocked(String),

    #[error("dependency cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    #[error("task '{task}' depends on unknown task '{missing}'")]
    UnknownDependency { task: String, missing: String },

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("invalid task id '{0}': expected TASK-NNN")]
    InvalidTaskId(String),

    #[error("invalid plan id '{0}': expected plan-NNN-<slug>")]
    InvalidPlanId(String),

    #[error("plan schema invalid:\n{}", .0.join("\n"))]
    SchemaInvalid(Vec<String>),

    #[error("amendment rejected: {0}")]
    AmendmentRejected(String),

    #[error("task tracker corrupted: {0}")]
    TrackerCorrupted(String),

    #[error("another cadence process holds the store lock: {0}")]
    ConcurrentModification(String),

    #[error("external mirror failed: {0}")]
    ExternalMirror(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CadenceError {
    /// True for failures caused by user input or state conflicts, as opposed
    /// to unexpected I/O or corruption. The CLI maps these to exit code 1.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            CadenceError::TrackerCorrupted(_) | CadenceError::Io(_) | CadenceError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CadenceError>;
