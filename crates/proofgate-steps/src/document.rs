//! Step document loading and validation

use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Errors loading or validating a step document.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("failed to read step document: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse step document: {0}")]
    Json(#[from] serde_json::Error),

    /// Duplicate ids make the step-to-theorem mapping ambiguous, so the
    /// document is rejected before any audit work starts.
    #[error("duplicate step id: {0}")]
    DuplicateStepId(String),
}

/// The audit pipeline's input: a problem statement plus its ordered steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl StepDocument {
    /// Parse a document from JSON text and validate it.
    pub fn from_json_str(text: &str) -> Result<Self, StepError> {
        let doc: Self = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Load and validate a document from a file.
    pub fn from_path(path: &Path) -> Result<Self, StepError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject documents with duplicate step ids.
    pub fn validate(&self) -> Result<(), StepError> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(StepError::DuplicateStepId(step.id.clone()));
            }
        }
        Ok(())
    }

    /// Whether any step is routed to the Lean toolchain.
    pub fn has_lean_steps(&self) -> bool {
        self.steps.iter().any(Step::is_lean)
    }
}
