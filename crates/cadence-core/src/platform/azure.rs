use crate::config::TrackerConfig;
use crate::error::{CadenceError, Result};
use crate::platform::router::{item_body, IssueTracker};
use crate::platform::Platform;
use crate::shell::Shell;
use crate::task::Task;
use crate::types::TaskStatus;
use std::sync::Arc;

/// Mirrors tasks onto Azure DevOps Work Items via the `az boards` CLI. The
/// work-item state field carries status; `blocked` has no native state and
/// maps to `New` plus a `blocked` tag.
pub struct AzureTracker {
    shell: Arc<dyn Shell>,
    organization: Option<String>,
    project: Option<String>,
}

/// Total status mapping onto work-item states.
fn work_item_state(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "New",
        TaskStatus::InProgress => "Active",
        TaskStatus::Completed => "Closed",
        TaskStatus::Blocked => "New",
    }
}

impl AzureTracker {
    pub fn new(shell: Arc<dyn Shell>, config: &TrackerConfig) -> Self {
        Self {
            shell,
            organization: config
                .owner
                .as_ref()
                .map(|org| format!("https://dev.azure.com/{org}")),
            project: config.project.clone(),
        }
    }

    fn ensure_cli(&self) -> Result<()> {
        if self.shell.has_program("az") {
            Ok(())
        } else {
            Err(CadenceError::ExternalMirror(
                "az CLI not found on PATH".to_string(),
            ))
        }
    }

    fn az(&self, args: &[&str]) -> Result<String> {
        self.ensure_cli()?;
        let mut full: Vec<&str> = vec!["boards", "work-item"];
        full.extend_from_slice(args);
        if let Some(org) = &self.organization {
            full.push("--organization");
            full.push(org);
        }
        full.push("--output");
        full.push("json");
        let out = self.shell.run("az", &full)?;
        if !out.success() {
            return Err(CadenceError::ExternalMirror(format!(
                "az boards work-item {} failed: {}",
                args.first().copied().unwrap_or(""),
                out.stderr.trim()
            )));
        }
        Ok(out.stdout)
    }
}

impl IssueTracker for AzureTracker {
    fn platform(&self) -> Platform {
        Platform::Azure
    }

    fn create_item(&self, task: &Task) -> Result<String> {
        let body = item_body(task);
        let title = format!("[{}] {}", task.id, task.title);
        let mut args = vec![
            "create",
            "--type",
            "Task",
            "--title",
            &title,
            "--description",
            &body,
        ];
        if let Some(project) = &self.project {
            args.push("--project");
            args.push(project);
        }
        if task.status == TaskStatus::Blocked {
            args.push("--fields");
            args.push("System.Tags=blocked");
        }
        let stdout = self.az(&args)?;

        let value: serde_json::Value = serde_json::from_str(&stdout).map_err(|_| {
            CadenceError::ExternalMirror(format!(
                "could not parse az output as JSON: {}",
                stdout.trim()
            ))
        })?;
        value["id"]
            .as_u64()
            .map(|id| id.to_string())
            .ok_or_else(|| {
                CadenceError::ExternalMirror("az output missing work item id".to_string())
            })
    }

    fn update_item(&self, task: &Task, external_id: &str) -> Result<()> {
        let state = work_item_state(task.status);
        // The tag always rides along: set when blocked, cleared otherwise,
        // so an unblocked item does not keep showing as blocked.
        let tags = if task.status == TaskStatus::Blocked {
            "System.Tags=blocked"
        } else {
            "System.Tags="
        };
        self.az(&["update", "--id", external_id, "--state", state, "--fields", tags])?;
        Ok(())
    }

    fn close_item(&self, external_id: &str, comment: &str) -> Result<()> {
        self.az(&[
            "update",
            "--id",
            external_id,
            "--state",
            "Closed",
            "--discussion",
            comment,
        ])?;
        Ok(())
    }

    fn add_comment(&self, external_id: &str, comment: &str) -> Result<()> {
        self.az(&["update", "--id", external_id, "--discussion", comment])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::testing::FakeShell;
    use crate::types::TaskPhase;

    fn tracker_with(shell: FakeShell) -> AzureTracker {
        let config = TrackerConfig {
            owner: Some("orchard9".to_string()),
            project: Some("cadence".to_string()),
            ..TrackerConfig::default()
        };
        AzureTracker::new(Arc::new(shell), &config)
    }

    #[test]
    fn state_mapping_is_total() {
        assert_eq!(work_item_state(TaskStatus::Pending), "New");
        assert_eq!(work_item_state(TaskStatus::InProgress), "Active");
        assert_eq!(work_item_state(TaskStatus::Completed), "Closed");
        // blocked has no native state: New plus a tag.
        assert_eq!(work_item_state(TaskStatus::Blocked), "New");
    }

    #[test]
    fn create_parses_work_item_id() {
        let shell = FakeShell::new();
        shell.push_ok(r#"{ "id": 731, "fields": {} }"#);
        let tracker = tracker_with(shell);
        let task = Task::new("TASK-001", "Provision infra", TaskPhase::Deployment);
        assert_eq!(tracker.create_item(&task).unwrap(), "731");
    }

    #[test]
    fn failed_az_call_is_mirror_error() {
        let shell = FakeShell::new();
        shell.push_failure("ERROR: TF401019 not authorized");
        let tracker = tracker_with(shell);
        let task = Task::new("TASK-001", "Provision infra", TaskPhase::Deployment);
        assert!(matches!(
            tracker.create_item(&task),
            Err(CadenceError::ExternalMirror(_))
        ));
    }

    #[test]
    fn missing_cli_is_mirror_error_without_shelling_out() {
        let shell = FakeShell::new();
        shell.mark_missing("az");
        let tracker = tracker_with(shell);
        let task = Task::new("TASK-001", "Provision infra", TaskPhase::Deployment);
        match tracker.create_item(&task) {
            Err(CadenceError::ExternalMirror(msg)) => assert!(msg.contains("az CLI")),
            other => panic!("expected ExternalMirror, got {other:?}"),
        }
    }

    #[test]
    fn update_sets_and_clears_blocked_tag() {
        let shell = Arc::new(FakeShell::new());
        shell.push_ok("{}");
        shell.push_ok("{}");
        let config = TrackerConfig {
            owner: Some("orchard9".to_string()),
            project: Some("cadence".to_string()),
            ..TrackerConfig::default()
        };
        let tracker = AzureTracker::new(Arc::clone(&shell) as Arc<dyn Shell>, &config);

        let mut task = Task::new("TASK-001", "Provision infra", TaskPhase::Deployment);
        task.status = TaskStatus::Blocked;
        tracker.update_item(&task, "731").unwrap();
        task.status = TaskStatus::Pending;
        tracker.update_item(&task, "731").unwrap();

        let calls = shell.calls.borrow();
        assert!(calls[0].contains(&"System.Tags=blocked".to_string()));
        assert!(calls[1].contains(&"System.Tags=".to_string()));
    }
}
