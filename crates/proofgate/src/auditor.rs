//! Step auditor: sequential per-step verification with bounded retries
//!
//! Steps are audited strictly in list order, one external invocation at a
//! time — later steps may depend on earlier artifacts, and the external
//! tools are resource-heavy. A step failure never aborts the remaining
//! steps: one run always reports the full failure set.

use crate::report::AuditResult;
use proofgate_lint::fragment_gate;
use proofgate_steps::{CheckerKind, ExecMode, Step, StepDocument};
use proofgate_verifiers::{LeanRequest, SympyRequest, SympySource, Verifier, VerifyRequest};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Auditor defaults; per-step checker fields override these.
#[derive(Debug, Clone)]
pub struct AuditorConfig {
    /// Default SymPy timeout.
    pub default_timeout: Duration,
    /// Default Lean timeout.
    pub lean_timeout: Duration,
    /// Default Lean execution mode when a checker does not pick one.
    pub lean_mode: Option<ExecMode>,
    /// Default Lean working directory (a Lake project).
    pub lean_cwd: Option<PathBuf>,
    /// Default no-output watchdog for Lean file mode.
    pub lean_watchdog_timeout: Option<Duration>,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(15),
            lean_timeout: Duration::from_secs(60),
            lean_mode: None,
            lean_cwd: None,
            lean_watchdog_timeout: None,
        }
    }
}

/// Audits a step list against the verifier adapters.
pub struct StepAuditor {
    config: AuditorConfig,
    sympy: Arc<dyn Verifier>,
    lean: Arc<dyn Verifier>,
}

impl StepAuditor {
    pub fn new(config: AuditorConfig, sympy: Arc<dyn Verifier>, lean: Arc<dyn Verifier>) -> Self {
        Self {
            config,
            sympy,
            lean,
        }
    }

    /// Audit every step in order. Returns the global pass flag and one
    /// result per step.
    pub async fn audit(&self, doc: &StepDocument) -> (bool, Vec<AuditResult>) {
        let mut all_passed = true;
        let mut report = Vec::with_capacity(doc.steps.len());
        for step in &doc.steps {
            let result = self.audit_step(step).await;
            if !result.is_passed() {
                all_passed = false;
            }
            report.push(result);
        }
        (all_passed, report)
    }

    async fn audit_step(&self, step: &Step) -> AuditResult {
        match step.checker_kind() {
            CheckerKind::Sympy => self.audit_sympy(step).await,
            CheckerKind::Lean4 => self.audit_lean(step).await,
            CheckerKind::Other(kind) => {
                warn!(id = %step.id, kind = %kind, "unsupported checker type");
                AuditResult::failed(
                    &step.id,
                    json!({ "error": format!("unsupported checker type: {}", kind) }),
                    1,
                )
            }
        }
    }

    async fn audit_sympy(&self, step: &Step) -> AuditResult {
        let checker = step.checker.clone().unwrap_or_default();
        let source = if let Some(code) = checker.code.clone() {
            SympySource::Inline(code)
        } else if let Some(path) = checker.code_file.clone() {
            SympySource::File(path)
        } else {
            return AuditResult::failed(
                &step.id,
                json!({ "error": "sympy checker is missing code or code_file" }),
                1,
            );
        };

        let timeout = checker
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(self.config.default_timeout);
        let request = VerifyRequest::Sympy(SympyRequest {
            source,
            timeout,
            python_path: checker.python.clone(),
        });

        let retries = checker.retries.unwrap_or(0);
        let (ok, detail, attempts) = self
            .attempt_loop(&self.sympy, &request, retries, &step.id, "sympy")
            .await;
        if ok {
            AuditResult::passed(&step.id, detail, attempts)
        } else {
            AuditResult::failed(&step.id, detail, attempts)
        }
    }

    async fn audit_lean(&self, step: &Step) -> AuditResult {
        let checker = step.checker.clone().unwrap_or_default();
        let Some(cmds) = checker.lean_lines() else {
            return AuditResult::failed(
                &step.id,
                json!({ "error": "lean checker is missing cmds, cmd or code" }),
                1,
            );
        };

        // Static gate first: forbidden constructs and a traceability
        // mismatch are structural defects, so no compiler attempt is spent
        // and no retry can help.
        let issues = fragment_gate(&step.id).check_text(&cmds.join("\n"));
        if !issues.is_empty() {
            warn!(id = %step.id, issues = issues.len(), "static lint gate rejected step");
            return AuditResult::failed(&step.id, json!({ "static_lint": issues }), 1);
        }

        let timeout = checker
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(self.config.lean_timeout);
        let mode = checker
            .mode
            .or(self.config.lean_mode)
            .unwrap_or(ExecMode::Repl);
        let mut request = LeanRequest::new(cmds, mode, timeout);
        request.cwd = checker.cwd.clone().or_else(|| self.config.lean_cwd.clone());
        request.watchdog_timeout = checker
            .watchdog_timeout
            .map(Duration::from_secs)
            .or(self.config.lean_watchdog_timeout);
        request.lean_path = checker.lean_path.clone();
        request.lake_path = checker.lake_path.clone();
        request.repl_cmd = checker.repl_cmd.clone();
        request.file_cmd = checker.file_cmd.clone();

        let retries = checker.retries.unwrap_or(0);
        let (ok, detail, attempts) = self
            .attempt_loop(
                &self.lean,
                &VerifyRequest::Lean(request),
                retries,
                &step.id,
                "lean4",
            )
            .await;
        if ok {
            AuditResult::passed(&step.id, detail, attempts)
        } else {
            AuditResult::failed(&step.id, detail, attempts)
        }
    }

    /// Up to `retries + 1` attempts, stopping at the first pass. Retries are
    /// immediate; each attempt is logged with its outcome and the last
    /// attempt's detail is kept.
    async fn attempt_loop(
        &self,
        verifier: &Arc<dyn Verifier>,
        request: &VerifyRequest,
        retries: u32,
        step_id: &str,
        engine: &str,
    ) -> (bool, serde_json::Value, u32) {
        let mut attempts = 0;
        let mut detail = serde_json::Value::Null;
        while attempts <= retries {
            attempts += 1;
            let (passed, attempt_detail) = match verifier.verify(request).await {
                Ok(report) => (report.passed(), report.to_detail()),
                Err(e) => (false, json!({ "error": e.to_string() })),
            };
            info!(
                id = %step_id,
                engine,
                attempt = attempts,
                status = if passed { "passed" } else { "failed" },
                "step audit attempt"
            );
            detail = attempt_detail;
            if passed {
                return (true, detail, attempts);
            }
        }
        (false, detail, attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proofgate_verifiers::{VerifierError, VerifierId, VerifierReport};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Stub adapter: fails the first `fail_first` calls, then succeeds.
    struct StubVerifier {
        id: VerifierId,
        fail_first: u32,
        calls: AtomicU32,
    }

    impl StubVerifier {
        fn passing(id: VerifierId) -> Self {
            Self {
                id,
                fail_first: 0,
                calls: AtomicU32::new(0),
            }
        }

        fn failing(id: VerifierId) -> Self {
            Self {
                id,
                fail_first: u32::MAX,
                calls: AtomicU32::new(0),
            }
        }

        fn flaky(id: VerifierId, fail_first: u32) -> Self {
            Self {
                id,
                fail_first,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Verifier for StubVerifier {
        fn id(&self) -> VerifierId {
            self.id
        }

        async fn verify(
            &self,
            _request: &VerifyRequest,
        ) -> Result<VerifierReport, VerifierError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Ok(VerifierReport::failure(
                    self.id,
                    proofgate_verifiers::FailureKind::Runtime,
                    "stub failure",
                    Duration::from_millis(1),
                ))
            } else {
                Ok(VerifierReport::success(self.id, Duration::from_millis(1)))
            }
        }
    }

    fn doc(json: serde_json::Value) -> StepDocument {
        serde_json::from_value(json).unwrap()
    }

    fn auditor(sympy: Arc<StubVerifier>, lean: Arc<StubVerifier>) -> StepAuditor {
        StepAuditor::new(AuditorConfig::default(), sympy, lean)
    }

    #[tokio::test]
    async fn passing_sympy_step_passes_on_first_attempt() {
        let sympy = Arc::new(StubVerifier::passing(VerifierId::Sympy));
        let lean = Arc::new(StubVerifier::passing(VerifierId::Lean4));
        let a = auditor(sympy.clone(), lean);

        let (all_passed, report) = a
            .audit(&doc(serde_json::json!({"steps": [
                {"id": "S1", "checker": {"type": "sympy", "code": "assert True"}}
            ]})))
            .await;

        assert!(all_passed);
        assert_eq!(report.len(), 1);
        assert!(report[0].is_passed());
        assert_eq!(report[0].attempts, 1);
        assert_eq!(sympy.calls(), 1);
    }

    #[tokio::test]
    async fn flaky_step_passes_within_retry_budget() {
        let sympy = Arc::new(StubVerifier::flaky(VerifierId::Sympy, 2));
        let lean = Arc::new(StubVerifier::passing(VerifierId::Lean4));
        let a = auditor(sympy.clone(), lean);

        let (all_passed, report) = a
            .audit(&doc(serde_json::json!({"steps": [
                {"id": "S1", "checker": {"type": "sympy", "code": "assert True", "retries": 2}}
            ]})))
            .await;

        assert!(all_passed);
        assert_eq!(report[0].attempts, 3);
        assert_eq!(sympy.calls(), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let sympy = Arc::new(StubVerifier::failing(VerifierId::Sympy));
        let lean = Arc::new(StubVerifier::passing(VerifierId::Lean4));
        let a = auditor(sympy.clone(), lean);

        let (all_passed, report) = a
            .audit(&doc(serde_json::json!({"steps": [
                {"id": "S1", "checker": {"type": "sympy", "code": "assert True", "retries": 1}}
            ]})))
            .await;

        assert!(!all_passed);
        assert_eq!(report[0].attempts, 2);
        assert_eq!(sympy.calls(), 2);
    }

    #[tokio::test]
    async fn lint_rejection_spends_no_verifier_attempt() {
        // The adapter always reports success; the step must still fail, and
        // the adapter must never be called.
        let sympy = Arc::new(StubVerifier::passing(VerifierId::Sympy));
        let lean = Arc::new(StubVerifier::passing(VerifierId::Lean4));
        let a = auditor(sympy, lean.clone());

        let (all_passed, report) = a
            .audit(&doc(serde_json::json!({"steps": [
                {"id": "S1", "checker": {"type": "lean4",
                    "cmds": ["axiom Bad : False", "theorem S1 : True := by trivial"]}}
            ]})))
            .await;

        assert!(!all_passed);
        assert!(!report[0].is_passed());
        assert_eq!(lean.calls(), 0);
        let detail = report[0].detail.to_string();
        assert!(detail.contains("FORBIDDEN_DECL"));
    }

    #[tokio::test]
    async fn mismatched_declaration_name_fails_lint() {
        let lean = Arc::new(StubVerifier::passing(VerifierId::Lean4));
        let a = auditor(Arc::new(StubVerifier::passing(VerifierId::Sympy)), lean.clone());

        let (_, report) = a
            .audit(&doc(serde_json::json!({"steps": [
                {"id": "S1", "checker": {"type": "lean4",
                    "cmds": ["theorem S1_helper : True := trivial"]}}
            ]})))
            .await;

        assert!(!report[0].is_passed());
        assert_eq!(lean.calls(), 0);
        assert!(report[0].detail.to_string().contains("MISSING_STEP_DECL"));
    }

    #[tokio::test]
    async fn clean_lean_step_reaches_the_verifier() {
        let lean = Arc::new(StubVerifier::passing(VerifierId::Lean4));
        let a = auditor(Arc::new(StubVerifier::passing(VerifierId::Sympy)), lean.clone());

        let (all_passed, report) = a
            .audit(&doc(serde_json::json!({"steps": [
                {"id": "S1", "checker": {"type": "lean4",
                    "cmds": ["theorem S1 : True := by trivial"]}}
            ]})))
            .await;

        assert!(all_passed);
        assert!(report[0].is_passed());
        assert_eq!(lean.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_checker_kind_fails_without_aborting_later_steps() {
        let sympy = Arc::new(StubVerifier::passing(VerifierId::Sympy));
        let lean = Arc::new(StubVerifier::passing(VerifierId::Lean4));
        let a = auditor(sympy, lean);

        let (all_passed, report) = a
            .audit(&doc(serde_json::json!({"steps": [
                {"id": "S1", "checker": {"type": "coq", "code": "Qed."}},
                {"id": "S2", "checker": {"type": "sympy", "code": "assert True"}}
            ]})))
            .await;

        assert!(!all_passed);
        assert_eq!(report.len(), 2);
        assert!(!report[0].is_passed());
        assert!(report[0]
            .detail
            .to_string()
            .contains("unsupported checker type: coq"));
        assert!(report[1].is_passed());
    }

    #[tokio::test]
    async fn missing_sympy_source_is_a_structural_failure() {
        let sympy = Arc::new(StubVerifier::passing(VerifierId::Sympy));
        let a = auditor(sympy.clone(), Arc::new(StubVerifier::passing(VerifierId::Lean4)));

        let (_, report) = a
            .audit(&doc(serde_json::json!({"steps": [
                {"id": "S1", "checker": {"type": "sympy"}}
            ]})))
            .await;

        assert!(!report[0].is_passed());
        assert_eq!(sympy.calls(), 0);
    }
}
