//! SymPy verifier adapter
//!
//! Executes a Python/SymPy snippet by piping it into an interpreter. The
//! snippet (or the assertion-helper template prepended to it) is expected to
//! print a JSON verdict as its last output line; a snippet that raises (e.g.
//! a failed `assert`) exits non-zero and the attempt is recorded as failed
//! with its output preserved.

use crate::traits::{
    FailureKind, HealthStatus, SympyRequest, SympySource, Verifier, VerifierError, VerifierId,
    VerifierReport, VerifyRequest,
};
use crate::util::extract_trailing_json;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Configuration for the SymPy adapter.
#[derive(Debug, Clone)]
pub struct SympyConfig {
    /// Python interpreter (if not `python3`/`python` from PATH).
    pub python_path: Option<PathBuf>,
    /// Assertion-helper template prepended to every snippet.
    pub template_path: Option<PathBuf>,
    /// Default timeout; per-request timeouts override this.
    pub timeout: Duration,
}

impl Default for SympyConfig {
    fn default() -> Self {
        Self {
            python_path: None,
            template_path: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// SymPy verification adapter.
pub struct SympyVerifier {
    config: SympyConfig,
}

#[derive(Debug, Clone)]
enum PythonDetection {
    Available { python_path: PathBuf },
    NotFound(String),
}

impl SympyVerifier {
    /// Create a new SymPy adapter with default configuration.
    pub fn new() -> Self {
        Self {
            config: SympyConfig::default(),
        }
    }

    /// Create a new SymPy adapter with custom configuration.
    pub fn with_config(config: SympyConfig) -> Self {
        Self { config }
    }

    /// Detect a usable Python interpreter; a per-request override wins over
    /// the configured one, which wins over PATH discovery.
    async fn detect_python(&self, override_path: Option<&PathBuf>) -> PythonDetection {
        if let Some(path) = override_path.or(self.config.python_path.as_ref()) {
            if path.exists() {
                return PythonDetection::Available {
                    python_path: path.clone(),
                };
            }
            return PythonDetection::NotFound(format!(
                "configured python path does not exist: {}",
                path.display()
            ));
        }

        for candidate in ["python3", "python"] {
            if let Ok(path) = which::which(candidate) {
                debug!("found python interpreter: {}", path.display());
                return PythonDetection::Available { python_path: path };
            }
        }

        PythonDetection::NotFound(
            "no python interpreter found in PATH (tried python3, python)".to_string(),
        )
    }

    /// Assemble the full snippet: optional template, blank line, step code.
    async fn assemble_code(&self, source: &SympySource) -> Result<String, VerifierError> {
        let code = match source {
            SympySource::Inline(code) => code.clone(),
            SympySource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                VerifierError::Unavailable(format!(
                    "sympy code file not readable: {}: {}",
                    path.display(),
                    e
                ))
            })?,
        };

        let template = match &self.config.template_path {
            Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                VerifierError::Unavailable(format!(
                    "sympy template not readable: {}: {}",
                    path.display(),
                    e
                ))
            })?,
            None => String::new(),
        };

        let full = if template.trim().is_empty() {
            code
        } else {
            format!("{}\n\n{}", template, code)
        };
        Ok(format!("{}\n", full.trim()))
    }

    async fn run_snippet(&self, request: &SympyRequest) -> Result<VerifierReport, VerifierError> {
        let python_path = match self.detect_python(request.python_path.as_ref()).await {
            PythonDetection::Available { python_path } => python_path,
            PythonDetection::NotFound(reason) => return Err(VerifierError::Unavailable(reason)),
        };

        let code = self.assemble_code(&request.source).await?;
        let start = Instant::now();

        let mut cmd = Command::new(&python_path);
        cmd.arg("-");
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| VerifierError::Spawn(format!("failed to spawn python: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(code.as_bytes()).await?;
        }

        let output = tokio::time::timeout(request.timeout, child.wait_with_output())
            .await
            .map_err(|_| VerifierError::Timeout(request.timeout))?
            .map_err(|e| VerifierError::Spawn(format!("failed to run python: {}", e)))?;

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!("sympy stdout:\n{}", stdout);
        if !stderr.is_empty() {
            debug!("sympy stderr:\n{}", stderr);
        }

        if !output.status.success() {
            let mut report = VerifierReport::failure(
                VerifierId::Sympy,
                FailureKind::Runtime,
                "sympy execution failed",
                duration,
            );
            report.stdout = stdout;
            report.stderr = stderr;
            return Ok(report);
        }

        let parsed = extract_trailing_json(&stdout);
        let mut report = VerifierReport::success(VerifierId::Sympy, duration);
        report.output = Some(
            parsed.unwrap_or_else(|| serde_json::json!({ "raw": stdout.trim() })),
        );
        report.stdout = stdout;
        report.stderr = stderr;
        Ok(report)
    }
}

impl Default for SympyVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Verifier for SympyVerifier {
    fn id(&self) -> VerifierId {
        VerifierId::Sympy
    }

    async fn verify(&self, request: &VerifyRequest) -> Result<VerifierReport, VerifierError> {
        match request {
            VerifyRequest::Sympy(req) => self.run_snippet(req).await,
            VerifyRequest::Lean(_) => Err(VerifierError::UnsupportedRequest(VerifierId::Sympy)),
        }
    }

    async fn health_check(&self) -> HealthStatus {
        match self.detect_python(None).await {
            PythonDetection::Available { python_path } => {
                info!("python available: {}", python_path.display());
                HealthStatus::Healthy
            }
            PythonDetection::NotFound(reason) => {
                warn!("python not available: {}", reason);
                HealthStatus::Unavailable { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(code: &str, timeout: Duration) -> VerifyRequest {
        VerifyRequest::Sympy(SympyRequest::inline(code, timeout))
    }

    async fn python_available() -> bool {
        matches!(
            SympyVerifier::new().health_check().await,
            HealthStatus::Healthy
        )
    }

    #[test]
    fn config_defaults() {
        let config = SympyConfig::default();
        assert!(config.python_path.is_none());
        assert!(config.template_path.is_none());
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn rejects_lean_requests() {
        let verifier = SympyVerifier::new();
        let request = VerifyRequest::Lean(crate::traits::LeanRequest::new(
            vec!["theorem S1 : True := trivial".to_string()],
            proofgate_steps::ExecMode::File,
            Duration::from_secs(1),
        ));
        let err = verifier.verify(&request).await.unwrap_err();
        assert!(matches!(err, VerifierError::UnsupportedRequest(VerifierId::Sympy)));
    }

    #[tokio::test]
    async fn configured_missing_interpreter_is_unavailable() {
        let verifier = SympyVerifier::with_config(SympyConfig {
            python_path: Some(PathBuf::from("/nonexistent/python-proofgate")),
            ..SympyConfig::default()
        });
        let err = verifier
            .verify(&inline("print(1)", Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifierError::Unavailable(_)));
    }

    #[tokio::test]
    async fn true_assertion_passes() {
        if !python_available().await {
            eprintln!("skipping: no python interpreter");
            return;
        }
        let verifier = SympyVerifier::new();
        let report = verifier
            .verify(&inline(
                "assert (2 + 2) == 4\nprint('{\"status\": \"ok\"}')",
                Duration::from_secs(20),
            ))
            .await
            .unwrap();
        assert!(report.passed());
        assert_eq!(report.output.as_ref().unwrap()["status"], "ok");
    }

    #[tokio::test]
    async fn false_assertion_fails_with_output_preserved() {
        if !python_available().await {
            eprintln!("skipping: no python interpreter");
            return;
        }
        let verifier = SympyVerifier::new();
        let report = verifier
            .verify(&inline("assert 1 == 2", Duration::from_secs(20)))
            .await
            .unwrap();
        assert!(!report.passed());
        assert_eq!(report.error_kind, Some(FailureKind::Runtime));
        assert!(report.stderr.contains("AssertionError"));
    }

    #[tokio::test]
    async fn hanging_snippet_times_out() {
        if !python_available().await {
            eprintln!("skipping: no python interpreter");
            return;
        }
        let verifier = SympyVerifier::new();
        let err = verifier
            .verify(&inline(
                "import time\ntime.sleep(30)",
                Duration::from_millis(300),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifierError::Timeout(_)));
    }

    #[tokio::test]
    async fn raw_stdout_is_wrapped_when_not_json() {
        if !python_available().await {
            eprintln!("skipping: no python interpreter");
            return;
        }
        let verifier = SympyVerifier::new();
        let report = verifier
            .verify(&inline("print('hello')", Duration::from_secs(20)))
            .await
            .unwrap();
        assert!(report.passed());
        assert_eq!(report.output.as_ref().unwrap()["raw"], "hello");
    }
}
