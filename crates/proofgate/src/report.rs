//! Audit report types
//!
//! Everything here serializes to the report payload printed by the CLI:
//! `{status, report, reverse_gate}`. Per-step details are opaque JSON so the
//! verifier adapters and lint gates can attach whatever diagnostics they
//! have without this crate knowing their shapes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of a single step's audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
}

/// Global audit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Passed,
    Failed,
}

/// Per-step audit record; created fresh per run and only ever aggregated
/// into the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub id: String,
    pub status: StepStatus,
    /// Opaque diagnostic record from the verifier or the lint gate.
    pub detail: serde_json::Value,
    /// Verifier attempts spent; lint rejections and configuration defects
    /// count as the single attempt that found them.
    pub attempts: u32,
}

impl AuditResult {
    pub fn passed(id: impl Into<String>, detail: serde_json::Value, attempts: u32) -> Self {
        Self {
            id: id.into(),
            status: StepStatus::Passed,
            detail,
            attempts,
        }
    }

    pub fn failed(id: impl Into<String>, detail: serde_json::Value, attempts: u32) -> Self {
        Self {
            id: id.into(),
            status: StepStatus::Failed,
            detail,
            attempts,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == StepStatus::Passed
    }
}

/// Reverse-gate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Skipped,
    Passed,
    Failed,
}

/// Result of synthesizing the reverse-gate file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOutcome {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Reverse-gate section of the audit report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseGateResult {
    pub enabled: bool,
    pub status: GateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate: Option<GenerateOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ReverseGateResult {
    /// Reverse gating was not requested.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            status: GateStatus::Skipped,
            generate: None,
            detail: None,
        }
    }

    /// Requested but skipped (e.g. no Lean step in the document).
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            enabled: true,
            status: GateStatus::Skipped,
            generate: None,
            detail: Some(serde_json::json!({ "info": reason.into() })),
        }
    }
}

/// The aggregated audit output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub status: AuditStatus,
    pub report: Vec<AuditResult>,
    pub reverse_gate: ReverseGateResult,
}

impl AuditReport {
    pub fn passed(&self) -> bool {
        self.status == AuditStatus::Passed
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.report
            .iter()
            .filter(|r| !r.is_passed())
            .map(|r| r.id.as_str())
            .collect()
    }

    /// One-line summary rendered into the solution document.
    pub fn summary(&self) -> String {
        let failed = self.failed_ids();
        let mut parts = vec![format!(
            "steps: {}/{} passed",
            self.report.len() - failed.len(),
            self.report.len()
        )];
        if !failed.is_empty() {
            parts.push(format!("failed: {}", failed.join(", ")));
        }
        if self.reverse_gate.enabled {
            let status = match self.reverse_gate.status {
                GateStatus::Skipped => "skipped",
                GateStatus::Passed => "passed",
                GateStatus::Failed => "failed",
            };
            parts.push(format!("reverse_gate: {}", status));
        }
        parts.join("; ")
    }
}
