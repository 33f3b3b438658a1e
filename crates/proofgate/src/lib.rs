//! ProofGate: proof audit and reverse-gate pipeline
//!
//! Audits a planner-produced step list against external checkers (SymPy,
//! Lean 4), optionally recombines the Lean fragments into one compilable
//! reverse-gate file as a check against gaming the per-step audit, and
//! emits the solution document only when every step and the gate pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use proofgate::{PipelineConfig, ProofGate, RunContext};
//! use proofgate_steps::StepDocument;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = StepDocument::from_json_str(r#"{
//!     "problem": "expand identity",
//!     "steps": [{"id": "S1", "goal": "expand (a+b)^2",
//!                "checker": {"type": "sympy", "code": "assert True"}}]
//! }"#)?;
//!
//! let context = RunContext::create("runs/current")?;
//! let pipeline = ProofGate::new(PipelineConfig::default(), context);
//! let report = pipeline.run(&doc).await?;
//! println!("audit: {}", report.summary());
//! # Ok(())
//! # }
//! ```

#![allow(clippy::must_use_candidate)] // API methods don't need must_use
#![allow(clippy::missing_errors_doc)] // Error docs are implementation details
#![allow(clippy::uninlined_format_args)] // Named args in format strings are clearer

pub mod auditor;
pub mod context;
pub mod gate;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod synthesize;

// Re-export sub-crates for direct access when needed
pub use proofgate_lint as lint;
pub use proofgate_steps as steps;
pub use proofgate_verifiers as verifiers;

// Re-export key types at crate root for convenience
pub use auditor::{AuditorConfig, StepAuditor};
pub use context::{EphemeralWorkspace, RunContext};
pub use gate::{run_reverse_gate, ReverseGateConfig, GATE_TIMEOUT_FLOOR};
pub use pipeline::{PipelineConfig, PipelineError, ProofGate};
pub use render::{render_solution, render_steps_section};
pub use report::{
    AuditReport, AuditResult, AuditStatus, GateStatus, GenerateOutcome, ReverseGateResult,
    StepStatus,
};
pub use synthesize::{synthesize, write_gate_file, SynthesisError, SynthesizerConfig};
