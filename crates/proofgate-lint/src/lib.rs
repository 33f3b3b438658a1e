//! Static anti-cheat lint gates for Lean proof sources
//!
//! The gates reject inputs that would let an invalid proof "pass" the audit
//! by construction — axioms, `sorry` placeholders, theorems whose names do
//! not trace back to their step — before any compiler time is spent. They
//! are pure functions of text: no I/O, no toolchain.
//!
//! Two gates are composed from the same rule set:
//!
//! - the **fragment gate** runs per step, before the auditor's first Lean
//!   invocation;
//! - the **file gate** runs against the synthesized reverse-gate file and
//!   adds step coverage, step-map, strict-Mathlib and domain-vocabulary
//!   checks.
//!
//! Each check is an independent [`LintRule`]; a gate is an ordered list of
//! rules, so new anti-cheat heuristics are new rules rather than new
//! branches in one function.

#![allow(clippy::must_use_candidate)] // Constructors and getters don't need must_use
#![allow(clippy::missing_errors_doc)] // No fallible public API

pub mod gate;
pub mod rules;
pub mod source;

pub use gate::{file_gate, fragment_gate, FileLintOptions, LintGate};
pub use rules::{codes, LintIssue, LintRule};
pub use source::LeanSource;

/// Marker comment the reverse-gate template must carry; the synthesizer
/// writes the step map directly below it and the file gate requires it.
pub const STEP_MAP_MARKER: &str = "PROOFGATE_STEP_MAP";
