//! External tool execution with a timeout and captured output

use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::ScmError;

/// Default timeout for a single tool invocation
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

/// Captured result of a tool run
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl ToolOutput {
    /// Last non-empty line of stderr, falling back to stdout
    pub fn last_line(&self) -> String {
        last_non_empty(&self.stderr)
            .or_else(|| last_non_empty(&self.stdout))
            .unwrap_or_default()
            .to_string()
    }
}

fn last_non_empty(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rfind(|l| !l.is_empty())
}

/// Runs version control and build tools. Every call is bounded by the same timeout.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
    env: Vec<(String, String)>,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

impl ToolRunner {
    pub fn new(timeout: Duration) -> Self {
        // Tool output is parsed, so keep it in the C locale
        Self { timeout, env: vec![("LC_ALL".into(), "C".into())] }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program` in `cwd`. A non-zero exit is not an error here.
    pub async fn run(&self, cwd: &Path, program: &str, args: &[&str]) -> Result<ToolOutput, ScmError> {
        debug!(program, ?args, cwd = %cwd.display(), "running tool");
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd).kill_on_drop(true);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScmError::Timeout {
                    program: program.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }

    /// Run `program` and return its stdout, failing on a non-zero exit.
    pub async fn run_checked(&self, cwd: &Path, program: &str, args: &[&str]) -> Result<String, ScmError> {
        let output = self.run(cwd, program, args).await?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(ScmError::Tool { program: program.to_string(), message: output.last_line() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_line_skips_blank_lines() {
        let out = ToolOutput {
            stdout: "Cloning into 'master'...\n".into(),
            stderr: "fatal: repository not found\n\n".into(),
            success: false,
        };
        assert_eq!(out.last_line(), "fatal: repository not found");

        let out = ToolOutput { stdout: String::new(), stderr: "error: one\nerror: two\n".into(), success: false };
        assert_eq!(out.last_line(), "error: two");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_checked_reports_failure() {
        let runner = ToolRunner::default();
        let dir = std::env::temp_dir();
        let err = runner.run_checked(&dir, "sh", &["-c", "echo oops >&2; exit 3"]).await.unwrap_err();
        assert_eq!(err.branch_message(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let runner = ToolRunner::new(Duration::from_millis(100));
        let dir = std::env::temp_dir();
        let err = runner.run(&dir, "sleep", &["5"]).await.unwrap_err();
        assert!(matches!(err, ScmError::Timeout { .. }));
    }
}
