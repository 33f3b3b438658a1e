//! Step-list data model for the ProofGate audit pipeline
//!
//! A step document is the unit of work handed to the auditor: a problem
//! statement plus an ordered list of steps, each carrying a checker payload
//! that tells the pipeline how to verify it (SymPy snippet or Lean 4
//! fragment). The types here are deliberately permissive about optional
//! fields so documents written by different planners all load, and strict
//! only where the pipeline needs it (canonical `S<n>` ids, unique ids).

#![allow(clippy::must_use_candidate)] // Getters and small helpers don't need must_use
#![allow(clippy::missing_errors_doc)] // Error docs are implementation details

pub mod document;
pub mod step;

pub use document::{StepDocument, StepError};
pub use step::{
    step_number, Checker, CheckerKind, Difficulty, ExecMode, Route, Step, SymbolEntry,
};
