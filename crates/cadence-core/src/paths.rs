use crate::error::{CadenceError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CLAUDE_DIR: &str = ".claude";
pub const PLANS_DIR: &str = ".claude/plans";
pub const ACTIVE_PLAN_FILE: &str = ".claude/ACTIVE-PLAN";
pub const TRACKER_CONFIG_FILE: &str = ".claude/tracker.json";
pub const STORE_LOCK_FILE: &str = ".claude/.lock";

pub const PLAN_DOC_FILE: &str = "PROJECT-PLAN.json";
pub const TRACKER_FILE: &str = "TASK-TRACKER.json";
pub const AMENDMENTS_FILE: &str = "AMENDMENTS.json";
pub const LOCK_MARKER_FILE: &str = ".plan-locked";
pub const ARCHIVED_MARKER_FILE: &str = ".archived";
pub const TASKS_DIR: &str = "tasks";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn claude_dir(root: &Path) -> PathBuf {
    root.join(CLAUDE_DIR)
}

pub fn plans_dir(root: &Path) -> PathBuf {
    root.join(PLANS_DIR)
}

pub fn active_plan_path(root: &Path) -> PathBuf {
    root.join(ACTIVE_PLAN_FILE)
}

pub fn tracker_config_path(root: &Path) -> PathBuf {
    root.join(TRACKER_CONFIG_FILE)
}

pub fn store_lock_path(root: &Path) -> PathBuf {
    root.join(STORE_LOCK_FILE)
}

pub fn plan_dir(root: &Path, plan_id: &str) -> PathBuf {
    plans_dir(root).join(plan_id)
}

pub fn plan_doc_path(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(PLAN_DOC_FILE)
}

pub fn tracker_path(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(TRACKER_FILE)
}

pub fn amendments_path(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(AMENDMENTS_FILE)
}

pub fn lock_marker_path(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(LOCK_MARKER_FILE)
}

pub fn archived_marker_path(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(ARCHIVED_MARKER_FILE)
}

pub fn tasks_dir(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(TASKS_DIR)
}

pub fn task_file_path(root: &Path, plan_id: &str, task_id: &str) -> PathBuf {
    tasks_dir(root, plan_id).join(format!("{task_id}.json"))
}

// ---------------------------------------------------------------------------
// Plan id validation
// ---------------------------------------------------------------------------

static PLAN_ID_RE: OnceLock<Regex> = OnceLock::new();

fn plan_id_re() -> &'static Regex {
    PLAN_ID_RE.get_or_init(|| Regex::new(r"^plan-\d{3,}-[a-z0-9][a-z0-9\-]*$").unwrap())
}

pub fn validate_plan_id(id: &str) -> Result<()> {
    if !plan_id_re().is_match(id) {
        return Err(CadenceError::InvalidPlanId(id.to_string()));
    }
    Ok(())
}

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(CadenceError::InvalidPlanId(slug.to_string()));
    }
    Ok(())
}

pub fn format_plan_id(n: u32, slug: &str) -> String {
    format!("plan-{n:03}-{slug}")
}

/// Numeric component of a plan id, for computing the next free sequence.
pub fn plan_id_number(id: &str) -> Option<u32> {
    id.strip_prefix("plan-")?.split('-').next()?.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
