//! Core verifier trait and result types

use async_trait::async_trait;
use proofgate_steps::ExecMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Identifies a verifier adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierId {
    Sympy,
    Lean4,
}

impl fmt::Display for VerifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sympy => write!(f, "sympy"),
            Self::Lean4 => write!(f, "lean4"),
        }
    }
}

/// Process-level failures: the tool could not be run at all, or the run was
/// cut off. Tool-reported failures (non-zero exit, unparseable output) are
/// carried inside [`VerifierReport`] instead so their stdout/stderr survive
/// into the audit detail.
#[derive(Error, Debug)]
pub enum VerifierError {
    /// Tool missing or misconfigured; retrying cannot help.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),

    /// Wall-clock timeout expired; the subprocess was terminated.
    #[error("verifier timed out after {0:?}")]
    Timeout(Duration),

    /// The subprocess could not be spawned or driven.
    #[error("failed to run verifier: {0}")]
    Spawn(String),

    /// This adapter was handed a request for a different engine.
    #[error("request is not supported by the {0} verifier")]
    UnsupportedRequest(VerifierId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Verifier availability, reported without running any proof work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unavailable { reason: String },
}

/// Where a SymPy snippet comes from.
#[derive(Debug, Clone)]
pub enum SympySource {
    Inline(String),
    File(PathBuf),
}

/// One SymPy verification request.
#[derive(Debug, Clone)]
pub struct SympyRequest {
    pub source: SympySource,
    pub timeout: Duration,
    /// Per-step interpreter override; falls back to the adapter's
    /// configured interpreter, then PATH discovery.
    pub python_path: Option<PathBuf>,
}

impl SympyRequest {
    pub fn inline(code: impl Into<String>, timeout: Duration) -> Self {
        Self {
            source: SympySource::Inline(code.into()),
            timeout,
            python_path: None,
        }
    }
}

/// One Lean verification request.
///
/// The executable overrides mirror the per-step checker fields: a step may
/// pin its own toolchain without reconfiguring the adapter.
#[derive(Debug, Clone)]
pub struct LeanRequest {
    /// Fragment source lines, in order.
    pub cmds: Vec<String>,
    pub mode: ExecMode,
    /// Working directory override (a Lake project); falls back to the
    /// adapter's configured directory.
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    /// No-output watchdog for file mode, independent of `timeout`.
    pub watchdog_timeout: Option<Duration>,
    /// Per-step `lean` executable override.
    pub lean_path: Option<PathBuf>,
    /// Per-step `lake` executable override.
    pub lake_path: Option<PathBuf>,
    /// Per-step REPL launch command override.
    pub repl_cmd: Option<String>,
    /// Per-step file-mode compile command override.
    pub file_cmd: Option<String>,
}

impl LeanRequest {
    pub fn new(cmds: Vec<String>, mode: ExecMode, timeout: Duration) -> Self {
        Self {
            cmds,
            mode,
            cwd: None,
            timeout,
            watchdog_timeout: None,
            lean_path: None,
            lake_path: None,
            repl_cmd: None,
            file_cmd: None,
        }
    }
}

/// A request dispatched through the [`Verifier`] seam.
#[derive(Debug, Clone)]
pub enum VerifyRequest {
    Sympy(SympyRequest),
    Lean(LeanRequest),
}

/// Normalized run status of a verifier invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// Classifies a tool-reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The tool was not found when launching the command.
    NotFound,
    /// Non-zero exit or runtime failure reported by the tool.
    Runtime,
    /// Output could not be parsed into the expected structure.
    OutputParse,
    /// The no-output watchdog terminated the process.
    NoOutputTimeout,
}

/// One structured per-command output from the Lean REPL.
///
/// `goals` and `sorries` are the fields the pass heuristic inspects; any
/// other keys the REPL emits are preserved in `extra` for diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorries: Option<Vec<serde_json::Value>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Normalized result of a single verifier invocation.
#[derive(Debug, Clone, Serialize)]
pub struct VerifierReport {
    pub verifier: VerifierId,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Parsed structured output (SymPy's trailing JSON line).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Per-command structured outputs (Lean REPL mode).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ReplOutput>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl VerifierReport {
    /// A success report with empty payloads; callers fill in what they have.
    pub fn success(verifier: VerifierId, duration: Duration) -> Self {
        Self {
            verifier,
            status: RunStatus::Success,
            error_kind: None,
            message: None,
            output: None,
            outputs: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// A tool-reported failure.
    pub fn failure(
        verifier: VerifierId,
        kind: FailureKind,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            verifier,
            status: RunStatus::Error,
            error_kind: Some(kind),
            message: Some(message.into()),
            output: None,
            outputs: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Judge whether this invocation counts as a passed attempt.
    ///
    /// With structured per-command outputs present, the last command must
    /// report an empty remaining-goals list and an empty or absent sorries
    /// list; the last line of the fragment is expected to fully close the
    /// goal. Without structured outputs (file mode, SymPy), the tool's own
    /// success signal decides.
    pub fn passed(&self) -> bool {
        if self.status != RunStatus::Success {
            return false;
        }
        match self.outputs.last() {
            Some(last) => {
                let goals_closed = last.goals.as_ref().is_some_and(|g| g.is_empty());
                let no_sorries = last.sorries.as_ref().map_or(true, |s| s.is_empty());
                goals_closed && no_sorries
            }
            None => true,
        }
    }

    /// Serialize for embedding as an audit detail record.
    pub fn to_detail(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// The external verifier boundary.
///
/// Implementations launch exactly one subprocess per `verify` call and block
/// until completion, failure, or timeout; the auditor owns retries and
/// sequencing.
#[async_trait]
pub trait Verifier: Send + Sync {
    fn id(&self) -> VerifierId;

    async fn verify(&self, request: &VerifyRequest) -> Result<VerifierReport, VerifierError>;

    /// Check tool availability without doing any proof work.
    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
