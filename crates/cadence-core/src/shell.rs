use crate::error::{CadenceError, Result};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Boundary for external process execution. The platform detector and the
/// tracker adapters are the only callers; tests inject fakes.
pub trait Shell {
    fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput>;

    /// Whether `program` resolves on the PATH, checked before shelling out
    /// so a missing CLI yields a clear error instead of a spawn failure.
    fn has_program(&self, program: &str) -> bool;
}

/// Runs commands synchronously via `std::process::Command`.
pub struct SystemShell;

impl Shell for SystemShell {
    fn has_program(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| CadenceError::ExternalMirror(format!("failed to run {program}: {e}")))?;
        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned outputs in order and records every invocation. Every
    /// program exists unless marked missing, so adapter tests run the same
    /// on machines without the real CLIs.
    pub struct FakeShell {
        pub calls: RefCell<Vec<Vec<String>>>,
        outputs: RefCell<VecDeque<Result<ShellOutput>>>,
        missing: RefCell<Vec<String>>,
    }

    impl FakeShell {
        pub fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                outputs: RefCell::new(VecDeque::new()),
                missing: RefCell::new(Vec::new()),
            }
        }

        pub fn mark_missing(&self, program: &str) {
            self.missing.borrow_mut().push(program.to_string());
        }

        pub fn push_ok(&self, stdout: &str) {
            self.outputs.borrow_mut().push_back(Ok(ShellOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: 0,
            }));
        }

        pub fn push_failure(&self, stderr: &str) {
            self.outputs.borrow_mut().push_back(Ok(ShellOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                exit_code: 1,
            }));
        }
    }

    impl Shell for FakeShell {
        fn has_program(&self, program: &str) -> bool {
            !self.missing.borrow().iter().any(|p| p == program)
        }

        fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string()));
            self.calls.borrow_mut().push(call);
            self.outputs.borrow_mut().pop_front().unwrap_or_else(|| {
                Ok(ShellOutput {
                    stdout: String::new(),
                    stderr: "no canned output".to_string(),
                    exit_code: 1,
                })
            })
        }
    }
}
