//! External verifier adapters for the ProofGate audit pipeline
//!
//! Each adapter implements the [`Verifier`] trait: it launches an external
//! tool as a subprocess with a hard wall-clock timeout and normalizes the
//! result into a [`VerifierReport`] the auditor can judge and embed into the
//! audit report verbatim.
//!
//! # Adapters
//!
//! - **SymPy**: pipes a Python snippet (optionally prefixed with an
//!   assertion-helper template) into an interpreter and reads the trailing
//!   JSON line as structured output.
//! - **Lean 4**: drives the Lean toolchain in REPL mode (`lake exe repl`),
//!   file mode (`lake env lean` against a temp file), or auto mode (REPL
//!   with file-mode fallback). File mode supports an optional no-output
//!   watchdog on top of the total timeout.

#![allow(clippy::must_use_candidate)] // Builder methods and getters don't need must_use
#![allow(clippy::missing_errors_doc)] // Error docs are implementation details
#![allow(clippy::uninlined_format_args)] // Named args in format strings are clearer

pub mod lean;
pub mod sympy;
pub mod traits;
pub mod util;
pub mod watchdog;

pub use lean::{LeanConfig, LeanVerifier};
pub use sympy::{SympyConfig, SympyVerifier};
pub use traits::{
    FailureKind, HealthStatus, LeanRequest, ReplOutput, RunStatus, SympyRequest, SympySource,
    Verifier, VerifierError, VerifierId, VerifierReport, VerifyRequest,
};
pub use watchdog::{run_with_watchdog, WatchdogOutcome, WatchdogOutput};
