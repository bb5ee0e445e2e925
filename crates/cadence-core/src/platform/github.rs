use crate::config::TrackerConfig;
use crate::error::{CadenceError, Result};
use crate::platform::router::{item_body, IssueTracker};
use crate::platform::Platform;
use crate::shell::Shell;
use crate::task::Task;
use crate::types::TaskStatus;
use std::sync::Arc;

/// Mirrors tasks onto GitHub Issues via the `gh` CLI. Open/closed state
/// carries completion; `status:*` labels carry the rest, since issues have
/// no native pending/blocked states.
pub struct GithubTracker {
    shell: Arc<dyn Shell>,
    repo: Option<String>,
}

const STATUS_LABELS: [&str; 3] = ["status:todo", "status:in-progress", "status:blocked"];

/// Total status mapping. `completed` maps to the closed state rather than a
/// label, so it yields no label here.
fn status_label(status: TaskStatus) -> Option<&'static str> {
    match status {
        TaskStatus::Pending => Some("status:todo"),
        TaskStatus::InProgress => Some("status:in-progress"),
        TaskStatus::Blocked => Some("status:blocked"),
        TaskStatus::Completed => None,
    }
}

impl GithubTracker {
    pub fn new(shell: Arc<dyn Shell>, config: &TrackerConfig) -> Self {
        let repo = match (&config.owner, &config.project) {
            (Some(owner), Some(project)) => Some(format!("{owner}/{project}")),
            _ => None,
        };
        Self { shell, repo }
    }

    fn ensure_cli(&self) -> Result<()> {
        if self.shell.has_program("gh") {
            Ok(())
        } else {
            Err(CadenceError::ExternalMirror(
                "gh CLI not found on PATH".to_string(),
            ))
        }
    }

    fn gh(&self, args: &[&str]) -> Result<String> {
        self.ensure_cli()?;
        let mut full: Vec<&str> = args.to_vec();
        if let Some(repo) = &self.repo {
            full.push("--repo");
            full.push(repo);
        }
        let out = self.shell.run("gh", &full)?;
        if !out.success() {
            return Err(CadenceError::ExternalMirror(format!(
                "gh {} failed: {}",
                args.first().copied().unwrap_or(""),
                out.stderr.trim()
            )));
        }
        Ok(out.stdout)
    }

    fn set_status_labels(&self, external_id: &str, status: TaskStatus) -> Result<()> {
        let mut args = vec!["issue", "edit", external_id];
        let keep = status_label(status);
        if let Some(label) = keep {
            args.push("--add-label");
            args.push(label);
        }
        for label in STATUS_LABELS {
            if Some(label) != keep {
                args.push("--remove-label");
                args.push(label);
            }
        }
        self.gh(&args)?;
        Ok(())
    }
}

impl IssueTracker for GithubTracker {
    fn platform(&self) -> Platform {
        Platform::Github
    }

    fn create_item(&self, task: &Task) -> Result<String> {
        let body = item_body(task);
        let label = status_label(task.status).unwrap_or("status:todo");
        let title = format!("[{}] {}", task.id, task.title);
        let stdout = self.gh(&[
            "issue", "create", "--title", &title, "--body", &body, "--label", label,
        ])?;

        // `gh issue create` prints the issue URL; the item id is its final
        // path segment.
        stdout
            .trim()
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
            .ok_or_else(|| {
                CadenceError::ExternalMirror(format!(
                    "could not parse issue number from gh output: {}",
                    stdout.trim()
                ))
            })
    }

    fn update_item(&self, task: &Task, external_id: &str) -> Result<()> {
        if task.status == TaskStatus::Completed {
            self.gh(&["issue", "close", external_id])?;
            return Ok(());
        }
        // A reset task may have been closed by an earlier completion; gh
        // rejects reopening an open issue, so that failure is not an error.
        let _ = self.gh(&["issue", "reopen", external_id]);
        self.set_status_labels(external_id, task.status)
    }

    fn close_item(&self, external_id: &str, comment: &str) -> Result<()> {
        self.gh(&["issue", "close", external_id, "--comment", comment])?;
        Ok(())
    }

    fn add_comment(&self, external_id: &str, comment: &str) -> Result<()> {
        self.gh(&["issue", "comment", external_id, "--body", comment])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::testing::FakeShell;
    use crate::types::TaskPhase;

    fn tracker_with(shell: FakeShell) -> GithubTracker {
        let config = TrackerConfig {
            owner: Some("orchard9".to_string()),
            project: Some("cadence".to_string()),
            ..TrackerConfig::default()
        };
        GithubTracker::new(Arc::new(shell), &config)
    }

    #[test]
    fn status_mapping_is_total() {
        // completed is the closed state; everything else carries a label.
        assert_eq!(status_label(TaskStatus::Pending), Some("status:todo"));
        assert_eq!(status_label(TaskStatus::InProgress), Some("status:in-progress"));
        assert_eq!(status_label(TaskStatus::Blocked), Some("status:blocked"));
        assert_eq!(status_label(TaskStatus::Completed), None);
    }

    #[test]
    fn create_parses_issue_number_from_url() {
        let shell = FakeShell::new();
        shell.push_ok("https://github.com/orchard9/cadence/issues/42\n");
        let tracker = tracker_with(shell);
        let task = Task::new("TASK-001", "Build codec", TaskPhase::Implementation);
        assert_eq!(tracker.create_item(&task).unwrap(), "42");
    }

    #[test]
    fn unparseable_output_is_mirror_error() {
        let shell = FakeShell::new();
        shell.push_ok("something unexpected");
        let tracker = tracker_with(shell);
        let task = Task::new("TASK-001", "Build codec", TaskPhase::Implementation);
        assert!(matches!(
            tracker.create_item(&task),
            Err(CadenceError::ExternalMirror(_))
        ));
    }

    #[test]
    fn missing_cli_is_mirror_error_without_shelling_out() {
        let shell = FakeShell::new();
        shell.mark_missing("gh");
        let tracker = tracker_with(shell);
        let task = Task::new("TASK-001", "Build codec", TaskPhase::Implementation);
        match tracker.create_item(&task) {
            Err(CadenceError::ExternalMirror(msg)) => assert!(msg.contains("gh CLI")),
            other => panic!("expected ExternalMirror, got {other:?}"),
        }
    }
}
