//! Lean 4 verifier adapter
//!
//! Drives the Lean toolchain over three execution modes:
//!
//! - **repl**: pipe the fragment's lines into a REPL process
//!   (`lake exe repl` by default) and collect one structured output per
//!   command from its JSON stdout lines.
//! - **file**: write the fragment to a temporary `.lean` file and compile it
//!   (`lake env lean` by default); the exit code is the verdict.
//! - **auto**: try the REPL and fall back to file mode when the failure
//!   looks like a missing REPL executable.
//!
//! File mode optionally runs under the no-output watchdog, which is a
//! separate bound from the total wall-clock timeout.

use crate::traits::{
    FailureKind, HealthStatus, LeanRequest, ReplOutput, RunStatus, Verifier, VerifierError,
    VerifierId, VerifierReport, VerifyRequest,
};
use crate::util::split_command;
use crate::watchdog::{run_with_watchdog, WatchdogOutcome};
use async_trait::async_trait;
use proofgate_steps::ExecMode;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Default REPL launch command.
pub const DEFAULT_REPL_CMD: &str = "lake exe repl";
/// Default file-mode compile command.
pub const DEFAULT_FILE_CMD: &str = "lake env lean";

/// Stderr signatures that mean "this project has no REPL executable", which
/// is the only failure auto mode falls back from.
const MISSING_REPL_HINTS: [&str; 3] = ["unknown executable repl", "not found", "no such file"];

/// Configuration for the Lean adapter.
#[derive(Debug, Clone)]
pub struct LeanConfig {
    /// Default execution mode; per-request modes override this.
    pub mode: ExecMode,
    /// REPL launch command override.
    pub repl_cmd: Option<String>,
    /// File-mode compile command override.
    pub file_cmd: Option<String>,
    /// Explicit `lean` executable (used for file mode when set).
    pub lean_path: Option<PathBuf>,
    /// Explicit `lake` executable (used for both modes when set).
    pub lake_path: Option<PathBuf>,
    /// Working directory, normally a Lake project with Mathlib.
    pub cwd: Option<PathBuf>,
    /// Default timeout; per-request timeouts override this.
    pub timeout: Duration,
    /// Default no-output watchdog for file mode.
    pub watchdog_timeout: Option<Duration>,
}

impl Default for LeanConfig {
    fn default() -> Self {
        Self {
            mode: ExecMode::Repl,
            repl_cmd: None,
            file_cmd: None,
            lean_path: None,
            lake_path: None,
            cwd: None,
            timeout: Duration::from_secs(60),
            watchdog_timeout: None,
        }
    }
}

/// Lean 4 verification adapter.
pub struct LeanVerifier {
    config: LeanConfig,
}

impl LeanVerifier {
    /// Create a new Lean adapter with default configuration.
    pub fn new() -> Self {
        Self {
            config: LeanConfig::default(),
        }
    }

    /// Create a new Lean adapter with custom configuration.
    pub fn with_config(config: LeanConfig) -> Self {
        Self { config }
    }

    /// Resolve the REPL launch command; per-request overrides win over the
    /// adapter configuration.
    fn repl_command(&self, request: Option<&LeanRequest>) -> Result<(String, Vec<String>), VerifierError> {
        let cmd = request
            .and_then(|r| r.repl_cmd.as_deref())
            .or(self.config.repl_cmd.as_deref());
        if let Some(cmd) = cmd {
            return split_command(cmd)
                .ok_or_else(|| VerifierError::Unavailable("empty REPL command".to_string()));
        }
        let lake = request
            .and_then(|r| r.lake_path.as_ref())
            .or(self.config.lake_path.as_ref());
        if let Some(lake) = lake {
            return Ok((
                lake.display().to_string(),
                vec!["exe".to_string(), "repl".to_string()],
            ));
        }
        split_command(DEFAULT_REPL_CMD)
            .ok_or_else(|| VerifierError::Unavailable("empty REPL command".to_string()))
    }

    /// Resolve the file-mode compile command; per-request overrides win over
    /// the adapter configuration.
    fn file_command(&self, request: Option<&LeanRequest>) -> Result<(String, Vec<String>), VerifierError> {
        let cmd = request
            .and_then(|r| r.file_cmd.as_deref())
            .or(self.config.file_cmd.as_deref());
        if let Some(cmd) = cmd {
            return split_command(cmd)
                .ok_or_else(|| VerifierError::Unavailable("empty file command".to_string()));
        }
        let lean = request
            .and_then(|r| r.lean_path.as_ref())
            .or(self.config.lean_path.as_ref());
        if let Some(lean) = lean {
            return Ok((lean.display().to_string(), Vec::new()));
        }
        let lake = request
            .and_then(|r| r.lake_path.as_ref())
            .or(self.config.lake_path.as_ref());
        if let Some(lake) = lake {
            return Ok((
                lake.display().to_string(),
                vec!["env".to_string(), "lean".to_string()],
            ));
        }
        split_command(DEFAULT_FILE_CMD)
            .ok_or_else(|| VerifierError::Unavailable("empty file command".to_string()))
    }

    fn working_dir<'a>(&'a self, request: &'a LeanRequest) -> Option<&'a Path> {
        request.cwd.as_deref().or(self.config.cwd.as_deref())
    }

    /// Run the fragment through the REPL, one command per line.
    async fn run_repl(&self, request: &LeanRequest) -> Result<VerifierReport, VerifierError> {
        let (program, args) = self.repl_command(Some(request))?;
        let input = format!("{}\n", request.cmds.join("\n"));
        let start = Instant::now();

        let mut cmd = Command::new(&program);
        cmd.args(&args);
        if let Some(dir) = self.working_dir(request) {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(VerifierReport::failure(
                    VerifierId::Lean4,
                    FailureKind::NotFound,
                    format!("failed to launch REPL command `{}`: {}", program, e),
                    start.elapsed(),
                ));
            }
            Err(e) => return Err(VerifierError::Spawn(format!("failed to spawn REPL: {}", e))),
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await?;
        }

        let output = tokio::time::timeout(request.timeout, child.wait_with_output())
            .await
            .map_err(|_| VerifierError::Timeout(request.timeout))?
            .map_err(|e| VerifierError::Spawn(format!("failed to run REPL: {}", e)))?;

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let outputs = parse_repl_outputs(&stdout);

        debug!(outputs = outputs.len(), "lean repl finished");

        if !output.status.success() {
            let mut report = VerifierReport::failure(
                VerifierId::Lean4,
                FailureKind::Runtime,
                "lean REPL execution failed",
                duration,
            );
            report.outputs = outputs;
            report.stdout = stdout;
            report.stderr = stderr;
            return Ok(report);
        }

        let mut report = VerifierReport::success(VerifierId::Lean4, duration);
        report.outputs = outputs;
        report.stdout = stdout;
        report.stderr = stderr;
        Ok(report)
    }

    /// Write the fragment to a temp file and compile it.
    async fn run_file(&self, request: &LeanRequest) -> Result<VerifierReport, VerifierError> {
        let temp_dir = TempDir::new()?;
        let file_path = temp_dir.path().join("Fragment.lean");
        let content = format!("{}\n", request.cmds.join("\n\n").trim());
        tokio::fs::write(&file_path, &content).await?;

        let cwd = self.working_dir(request).map(Path::to_path_buf);
        self.exec_file_command(
            &file_path,
            cwd.as_deref(),
            request.timeout,
            request.watchdog_timeout.or(self.config.watchdog_timeout),
            Some(request),
        )
        .await
    }

    /// Compile an existing `.lean` file; used directly by the reverse gate.
    pub async fn compile_file(
        &self,
        file: &Path,
        project_dir: &Path,
        timeout: Duration,
        watchdog_timeout: Option<Duration>,
    ) -> Result<VerifierReport, VerifierError> {
        self.exec_file_command(file, Some(project_dir), timeout, watchdog_timeout, None)
            .await
    }

    async fn exec_file_command(
        &self,
        file: &Path,
        cwd: Option<&Path>,
        timeout: Duration,
        watchdog_timeout: Option<Duration>,
        request: Option<&LeanRequest>,
    ) -> Result<VerifierReport, VerifierError> {
        let (program, args) = self.file_command(request)?;
        let start = Instant::now();

        let mut cmd = Command::new(&program);
        cmd.args(&args);
        cmd.arg(file);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        if let Some(idle) = watchdog_timeout {
            let watched = run_with_watchdog(cmd, idle, timeout).await?;
            let duration = start.elapsed();
            return Ok(match watched.outcome {
                WatchdogOutcome::WallClockTimeout => {
                    return Err(VerifierError::Timeout(timeout));
                }
                WatchdogOutcome::IdleTimeout => {
                    let mut report = VerifierReport::failure(
                        VerifierId::Lean4,
                        FailureKind::NoOutputTimeout,
                        format!("no output for {}s; terminated", idle.as_secs()),
                        duration,
                    );
                    report.stdout = watched.stdout;
                    report.stderr = watched.stderr;
                    report
                }
                WatchdogOutcome::Completed if watched.exit_code == Some(0) => {
                    let mut report = VerifierReport::success(VerifierId::Lean4, duration);
                    report.stdout = watched.stdout;
                    report.stderr = watched.stderr;
                    report
                }
                WatchdogOutcome::Completed => {
                    let mut report = VerifierReport::failure(
                        VerifierId::Lean4,
                        FailureKind::Runtime,
                        "lean file compilation failed",
                        duration,
                    );
                    report.stdout = watched.stdout;
                    report.stderr = watched.stderr;
                    report
                }
            });
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Err(_) => return Err(VerifierError::Timeout(timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(VerifierReport::failure(
                    VerifierId::Lean4,
                    FailureKind::NotFound,
                    format!("failed to launch compile command `{}`: {}", program, e),
                    start.elapsed(),
                ));
            }
            Ok(Err(e)) => {
                return Err(VerifierError::Spawn(format!(
                    "failed to run compile command: {}",
                    e
                )))
            }
            Ok(Ok(output)) => output,
        };

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!("lean file-mode stdout:\n{}", stdout);
        if !stderr.is_empty() {
            debug!("lean file-mode stderr:\n{}", stderr);
        }

        if output.status.success() {
            let mut report = VerifierReport::success(VerifierId::Lean4, duration);
            report.stdout = stdout;
            report.stderr = stderr;
            Ok(report)
        } else {
            let mut report = VerifierReport::failure(
                VerifierId::Lean4,
                FailureKind::Runtime,
                "lean file compilation failed",
                duration,
            );
            report.stdout = stdout;
            report.stderr = stderr;
            Ok(report)
        }
    }

    /// REPL attempt, falling back to file mode when the project has no REPL.
    async fn run_auto(&self, request: &LeanRequest) -> Result<VerifierReport, VerifierError> {
        let repl = self.run_repl(request).await?;
        if repl.status == RunStatus::Success {
            return Ok(repl);
        }
        if missing_repl(&repl) {
            debug!("REPL unavailable; falling back to file mode");
            return self.run_file(request).await;
        }
        Ok(repl)
    }
}

impl Default for LeanVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Verifier for LeanVerifier {
    fn id(&self) -> VerifierId {
        VerifierId::Lean4
    }

    async fn verify(&self, request: &VerifyRequest) -> Result<VerifierReport, VerifierError> {
        let request = match request {
            VerifyRequest::Lean(req) => req,
            VerifyRequest::Sympy(_) => {
                return Err(VerifierError::UnsupportedRequest(VerifierId::Lean4))
            }
        };
        match request.mode {
            ExecMode::Repl => self.run_repl(request).await,
            ExecMode::File => self.run_file(request).await,
            ExecMode::Auto => self.run_auto(request).await,
        }
    }

    async fn health_check(&self) -> HealthStatus {
        let (program, _) = match self.file_command(None) {
            Ok(cmd) => cmd,
            Err(e) => {
                return HealthStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        };
        let path = Path::new(&program);
        let available = path.is_absolute() && path.exists() || which::which(&program).is_ok();
        if available {
            info!("lean toolchain available: {}", program);
            HealthStatus::Healthy
        } else {
            let reason = format!("`{}` not found in PATH", program);
            warn!("lean toolchain not available: {}", reason);
            HealthStatus::Unavailable { reason }
        }
    }
}

/// Parse each stdout line that is valid JSON into a structured output.
fn parse_repl_outputs(stdout: &str) -> Vec<ReplOutput> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// Does this failed REPL attempt look like "no REPL built for this project"?
fn missing_repl(report: &VerifierReport) -> bool {
    if report.error_kind == Some(FailureKind::NotFound) {
        return true;
    }
    let haystack = format!(
        "{} {}",
        report.stderr,
        report.message.as_deref().unwrap_or("")
    )
    .to_lowercase();
    MISSING_REPL_HINTS.iter().any(|hint| haystack.contains(hint))
}
