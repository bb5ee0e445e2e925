use crate::error::Result;
use crate::platform::Platform;
use crate::task::Task;

/// The four lifecycle operations every backend must support identically.
/// Adapters map them onto their own primitives (GitHub: issues + labels +
/// comments; Azure: work items + state field + tags) and keep the status
/// mapping total: every local status has a defined backend state.
///
/// Failures are `ExternalMirror` errors; the engine downgrades them to
/// warnings because local state is authoritative (local-first policy).
pub trait IssueTracker {
    fn platform(&self) -> Platform;

    /// Mirror a new task, returning the backend-assigned id.
    fn create_item(&self, task: &Task) -> Result<String>;

    /// Push the task's current status (and metadata) to an existing item.
    fn update_item(&self, task: &Task, external_id: &str) -> Result<()>;

    /// Close the item with a completion comment.
    fn close_item(&self, external_id: &str, comment: &str) -> Result<()>;

    fn add_comment(&self, external_id: &str, comment: &str) -> Result<()>;
}

/// Shared body text for a mirrored item: description plus the completion
/// criteria as a checklist.
pub fn item_body(task: &Task) -> String {
    let mut body = task.description.clone().unwrap_or_default();
    if !task.completion_criteria.is_empty() {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str("Completion criteria:\n");
        for criterion in &task.completion_criteria {
            body.push_str(&format!("- [ ] {criterion}\n"));
        }
    }
    body
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::error::CadenceError;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every routed call; optionally fails them all, for exercising
    /// the local-first policy. The call log is a shared handle so tests can
    /// keep inspecting it after the engine takes ownership of the tracker.
    pub struct RecordingTracker {
        pub calls: Rc<RefCell<Vec<String>>>,
        pub fail: bool,
    }

    impl RecordingTracker {
        pub fn new() -> Self {
            Self {
                calls: Rc::new(RefCell::new(Vec::new())),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                calls: Rc::new(RefCell::new(Vec::new())),
                fail: true,
            }
        }

        pub fn handle(&self) -> Rc<RefCell<Vec<String>>> {
            Rc::clone(&self.calls)
        }

        fn record(&self, call: String) -> Result<()> {
            self.calls.borrow_mut().push(call);
            if self.fail {
                Err(CadenceError::ExternalMirror("network unreachable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl IssueTracker for RecordingTracker {
        fn platform(&self) -> Platform {
            Platform::Github
        }

        fn create_item(&self, task: &Task) -> Result<String> {
            self.record(format!("create {}", task.id))?;
            Ok(format!("ext-{}", task.id))
        }

        fn update_item(&self, task: &Task, external_id: &str) -> Result<()> {
            self.record(format!("update {} {} {}", task.id, external_id, task.status))
        }

        fn close_item(&self, external_id: &str, _comment: &str) -> Result<()> {
            self.record(format!("close {external_id}"))
        }

        fn add_comment(&self, external_id: &str, comment: &str) -> Result<()> {
            self.record(format!("comment {external_id}: {comment}"))
        }
    }
}
