//! The audit pipeline facade
//!
//! One [`ProofGate`] value owns the configuration, the run context and the
//! verifier adapters for a single audit invocation: audit every step, run
//! the reverse gate when requested, and write the solution document only
//! when everything passed. The renderer itself has no gating logic; this is
//! the enforcement point.

use crate::auditor::{AuditorConfig, StepAuditor};
use crate::context::RunContext;
use crate::gate::{run_reverse_gate, ReverseGateConfig};
use crate::render::render_solution;
use crate::report::{
    AuditReport, AuditStatus, GateStatus, GenerateOutcome, ReverseGateResult,
};
use crate::synthesize::{write_gate_file, SynthesizerConfig};
use proofgate_steps::{StepDocument, StepError};
use proofgate_verifiers::{
    LeanConfig, LeanVerifier, SympyConfig, SympyVerifier, Verifier,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Pipeline-level failures. Step and gate failures are not errors — they
/// are reported in the [`AuditReport`]; this enum is for defects that stop
/// the pipeline from running at all.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Steps(#[from] StepError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub auditor: AuditorConfig,
    pub sympy: SympyConfig,
    pub lean: LeanConfig,
    /// `None` disables reverse gating entirely.
    pub reverse_gate: Option<ReverseGateConfig>,
    pub synthesizer: SynthesizerConfig,
    /// Solution template; the built-in layout is used when absent.
    pub solution_template: Option<PathBuf>,
    /// Solution output; defaults to the run context's solution path.
    pub solution_path: Option<PathBuf>,
}

/// The audit pipeline.
pub struct ProofGate {
    config: PipelineConfig,
    context: RunContext,
    sympy: Arc<dyn Verifier>,
    lean: Arc<dyn Verifier>,
    /// Concrete Lean adapter for the reverse-gate compile.
    gate_lean: LeanVerifier,
}

impl ProofGate {
    /// Build the pipeline with real verifier adapters.
    pub fn new(config: PipelineConfig, context: RunContext) -> Self {
        let sympy = Arc::new(SympyVerifier::with_config(config.sympy.clone()));
        let lean = Arc::new(LeanVerifier::with_config(config.lean.clone()));
        let gate_lean = LeanVerifier::with_config(config.lean.clone());
        Self {
            config,
            context,
            sympy,
            lean,
            gate_lean,
        }
    }

    /// Build the pipeline with injected step verifiers (the reverse-gate
    /// compile still uses a real Lean adapter built from the config).
    pub fn with_verifiers(
        config: PipelineConfig,
        context: RunContext,
        sympy: Arc<dyn Verifier>,
        lean: Arc<dyn Verifier>,
    ) -> Self {
        let gate_lean = LeanVerifier::with_config(config.lean.clone());
        Self {
            config,
            context,
            sympy,
            lean,
            gate_lean,
        }
    }

    /// Where the solution document will be written on a clean audit.
    pub fn solution_path(&self) -> PathBuf {
        self.config
            .solution_path
            .clone()
            .unwrap_or_else(|| self.context.solution_path())
    }

    /// Run the full audit. The report always lists every step's outcome;
    /// the solution document exists afterwards iff the report passed.
    pub async fn run(&self, doc: &StepDocument) -> Result<AuditReport, PipelineError> {
        doc.validate()?;
        self.validate_config()?;

        let auditor = StepAuditor::new(
            self.config.auditor.clone(),
            Arc::clone(&self.sympy),
            Arc::clone(&self.lean),
        );
        let (mut all_passed, results) = auditor.audit(doc).await;

        let reverse_gate = match &self.config.reverse_gate {
            None => ReverseGateResult::disabled(),
            Some(gate_cfg) => {
                if doc.has_lean_steps() {
                    let outcome = self.run_gate(doc, gate_cfg).await;
                    if outcome.status != GateStatus::Passed {
                        all_passed = false;
                    }
                    outcome
                } else {
                    info!("no lean steps in document; reverse gate skipped");
                    ReverseGateResult::skipped(
                        "no lean4 checker among steps; reverse gate skipped",
                    )
                }
            }
        };

        let status = if all_passed {
            AuditStatus::Passed
        } else {
            AuditStatus::Failed
        };
        let report = AuditReport {
            status,
            report: results,
            reverse_gate,
        };

        if report.passed() {
            self.write_solution(doc, &report)?;
        }
        Ok(report)
    }

    /// Synthesize the gate file, then lint and compile it.
    async fn run_gate(
        &self,
        doc: &StepDocument,
        gate_cfg: &ReverseGateConfig,
    ) -> ReverseGateResult {
        let gate_path = gate_cfg
            .output_path
            .clone()
            .unwrap_or_else(|| self.context.gate_path());

        match write_gate_file(
            &doc.steps,
            &gate_cfg.template_path,
            &gate_path,
            &self.config.synthesizer,
        ) {
            Err(e) => ReverseGateResult {
                enabled: true,
                status: GateStatus::Failed,
                generate: Some(GenerateOutcome {
                    ok: false,
                    message: e.to_string(),
                    path: Some(gate_path),
                }),
                detail: None,
            },
            Ok(message) => {
                let (ok, detail) = run_reverse_gate(
                    gate_cfg,
                    &gate_path,
                    &self.gate_lean,
                    self.config.auditor.lean_timeout,
                    self.config.auditor.default_timeout,
                )
                .await;
                info!(
                    status = if ok { "passed" } else { "failed" },
                    path = %gate_path.display(),
                    "reverse gate finished"
                );
                ReverseGateResult {
                    enabled: true,
                    status: if ok { GateStatus::Passed } else { GateStatus::Failed },
                    generate: Some(GenerateOutcome {
                        ok: true,
                        message,
                        path: Some(gate_path),
                    }),
                    detail: Some(detail),
                }
            }
        }
    }

    /// Configuration defects are reported before any step is attempted.
    fn validate_config(&self) -> Result<(), PipelineError> {
        if let Some(gate) = &self.config.reverse_gate {
            let Some(project_dir) = &gate.project_dir else {
                return Err(PipelineError::Config(
                    "reverse gate requires an explicit Lean project directory".to_string(),
                ));
            };
            if !project_dir.is_dir() {
                return Err(PipelineError::Config(format!(
                    "lean project directory does not exist: {}",
                    project_dir.display()
                )));
            }
            if !gate.template_path.exists() {
                return Err(PipelineError::Config(format!(
                    "reverse gate template not found: {}",
                    gate.template_path.display()
                )));
            }
        }
        Ok(())
    }

    fn write_solution(&self, doc: &StepDocument, report: &AuditReport) -> Result<(), PipelineError> {
        let template = match &self.config.solution_template {
            Some(path) if path.exists() => Some(std::fs::read_to_string(path)?),
            _ => None,
        };
        let status = match report.status {
            AuditStatus::Passed => "passed",
            AuditStatus::Failed => "failed",
        };
        let text = render_solution(
            doc.problem.as_deref(),
            &doc.steps,
            &report.report,
            status,
            &report.summary(),
            template.as_deref(),
        );
        let path = self.solution_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, text)?;
        info!(path = %path.display(), "solution document written");
        Ok(())
    }
}
