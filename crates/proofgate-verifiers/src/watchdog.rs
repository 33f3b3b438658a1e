//! No-output watchdog for long-running tool invocations
//!
//! Lean builds can hang without ever hitting the wall-clock timeout budget
//! (e.g. waiting on a lock). The watchdog adds a second, independent bound:
//! if the child produces no output for `idle_timeout`, it is terminated even
//! though total elapsed time is still within budget.

use crate::traits::VerifierError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::debug;

/// How a watchdog-supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// The child exited on its own.
    Completed,
    /// No output for the idle window; the child was terminated.
    IdleTimeout,
    /// Total wall-clock budget expired; the child was terminated.
    WallClockTimeout,
}

/// Captured output of a watchdog-supervised run.
#[derive(Debug)]
pub struct WatchdogOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when the child was killed.
    pub exit_code: Option<i32>,
    pub outcome: WatchdogOutcome,
}

impl WatchdogOutput {
    pub fn completed_ok(&self) -> bool {
        self.outcome == WatchdogOutcome::Completed && self.exit_code == Some(0)
    }
}

/// Run a command, terminating it if it stays silent for `idle_timeout` or
/// runs past `total_timeout` overall.
pub async fn run_with_watchdog(
    mut cmd: Command,
    idle_timeout: Duration,
    total_timeout: Duration,
) -> Result<WatchdogOutput, VerifierError> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| VerifierError::Spawn(format!("failed to spawn watched command: {}", e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| VerifierError::Spawn("child stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| VerifierError::Spawn("child stderr was not captured".to_string()))?;

    // Drain stderr concurrently so a full pipe can never stall the child.
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
        buf
    });

    let mut lines = BufReader::new(stdout).lines();
    let mut collected = String::new();
    let deadline = Instant::now() + total_timeout;

    let outcome = loop {
        let now = Instant::now();
        if now >= deadline {
            let _ = child.kill().await;
            break WatchdogOutcome::WallClockTimeout;
        }
        let remaining = deadline - now;
        let wait = remaining.min(idle_timeout);

        match tokio::time::timeout(wait, lines.next_line()).await {
            Err(_) => {
                let _ = child.kill().await;
                if wait < remaining {
                    debug!(idle_secs = idle_timeout.as_secs(), "watchdog idle timeout");
                    break WatchdogOutcome::IdleTimeout;
                }
                break WatchdogOutcome::WallClockTimeout;
            }
            Ok(Ok(Some(line))) => {
                collected.push_str(&line);
                collected.push('\n');
            }
            Ok(Ok(None)) => break WatchdogOutcome::Completed,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(VerifierError::Io(e));
            }
        }
    };

    // A killed child exits promptly; bound the wait regardless.
    let exit_code = match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
        Ok(Ok(status)) => status.code(),
        _ => None,
    };
    let stderr = stderr_task.await.unwrap_or_default();

    Ok(WatchdogOutput {
        stdout: collected,
        stderr,
        exit_code,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn fast_command_completes() {
        let output = run_with_watchdog(
            sh("echo hello; echo world >&2"),
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(output.outcome, WatchdogOutcome::Completed);
        assert_eq!(output.exit_code, Some(0));
        assert!(output.completed_ok());
        assert!(output.stdout.contains("hello"));
        assert!(output.stderr.contains("world"));
    }

    #[tokio::test]
    async fn silent_command_hits_idle_timeout() {
        let output = run_with_watchdog(
            sh("sleep 30"),
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert_eq!(output.outcome, WatchdogOutcome::IdleTimeout);
        assert!(!output.completed_ok());
    }

    #[tokio::test]
    async fn chatty_command_hits_wall_clock_timeout() {
        // Keeps printing within the idle window but never finishes in budget.
        let output = run_with_watchdog(
            sh("while true; do echo tick; sleep 0.1; done"),
            Duration::from_secs(5),
            Duration::from_millis(500),
        )
        .await
        .unwrap();

        assert_eq!(output.outcome, WatchdogOutcome::WallClockTimeout);
        assert!(output.stdout.contains("tick"));
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code() {
        let output = run_with_watchdog(
            sh("echo oops; exit 3"),
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(output.outcome, WatchdogOutcome::Completed);
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.completed_ok());
    }

    #[tokio::test]
    async fn missing_command_is_a_spawn_error() {
        let cmd = Command::new("/nonexistent/proofgate-watchdog-test");
        let err = run_with_watchdog(cmd, Duration::from_secs(1), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifierError::Spawn(_)));
    }
}
