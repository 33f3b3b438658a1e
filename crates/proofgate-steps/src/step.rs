//! A single auditable step and its checker payload

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Parse a canonical step id (`S1`, `S2`, ...) into its number.
///
/// Returns `None` for anything that is not exactly `S` followed by digits:
/// suffixed names like `S1_helper` or bare numbers do not count. The
/// reverse-gate synthesizer and the traceability lint both rely on this
/// exact-match rule to keep the step-to-theorem mapping unambiguous.
pub fn step_number(id: &str) -> Option<u32> {
    let re = Regex::new(r"^S(\d+)$").expect("valid step id regex");
    re.captures(id.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Step difficulty as labeled by the upstream planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        write!(f, "{}", s)
    }
}

/// Which engine family the planner routed this step to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Sympy,
    Lean4,
    Hybrid,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sympy => "sympy",
            Self::Lean4 => "lean4",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lean execution mode for a checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// Pipe commands into a running REPL (`lake exe repl`).
    Repl,
    /// Write the fragment to a temp file and compile it (`lake env lean`).
    File,
    /// Try the REPL first, fall back to file mode when no REPL is built.
    Auto,
}

/// A symbol legend entry.
///
/// Planners emit either `{name, meaning}` objects or bare strings; both are
/// accepted and rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymbolEntry {
    Named {
        #[serde(default)]
        name: String,
        #[serde(default)]
        meaning: String,
    },
    Bare(String),
}

/// Resolved checker kind for a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerKind {
    Sympy,
    Lean4,
    /// Anything else; the auditor records these as failed with an
    /// "unsupported checker type" detail instead of guessing.
    Other(String),
}

impl fmt::Display for CheckerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sympy => write!(f, "sympy"),
            Self::Lean4 => write!(f, "lean4"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Executable checker payload attached to a step.
///
/// This is a permissive field bag rather than a tagged union: step documents
/// in the wild omit `type` and rely on the step's `route`/`engine` hints, and
/// Lean fragments arrive as `cmds`, a single `cmd`, or a newline-joined
/// `code` blob depending on the planner. [`Step::checker_kind`] and
/// [`Checker::lean_lines`] normalize all of that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checker {
    /// Checker kind hint (`sympy` / `lean4`); may be absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Inline source (SymPy snippet, or a newline-joined Lean fragment).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Source file alternative to `code` (SymPy only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_file: Option<PathBuf>,
    /// Lean fragment as individual source lines (preferred form).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmds: Option<Vec<String>>,
    /// Single-line Lean fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// Lean execution mode override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecMode>,
    /// Working directory for the Lean toolchain (a Lake project).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Python interpreter override for SymPy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<PathBuf>,
    /// Explicit `lean` executable path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lean_path: Option<PathBuf>,
    /// Explicit `lake` executable path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lake_path: Option<PathBuf>,
    /// REPL launch command override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repl_cmd: Option<String>,
    /// File-mode compile command override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_cmd: Option<String>,
    /// Per-step timeout override, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Retry budget; the auditor makes `retries + 1` attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// No-output watchdog for Lean file mode, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchdog_timeout: Option<u64>,
}

impl Checker {
    /// Normalize the Lean fragment to a list of source lines.
    ///
    /// Preference order: `cmds`, then `cmd`, then `code` split on newlines
    /// with blank lines dropped. `None` means the checker carries no Lean
    /// source at all.
    pub fn lean_lines(&self) -> Option<Vec<String>> {
        if let Some(cmds) = &self.cmds {
            if !cmds.is_empty() {
                return Some(cmds.clone());
            }
        }
        if let Some(cmd) = &self.cmd {
            if !cmd.trim().is_empty() {
                return Some(vec![cmd.clone()]);
            }
        }
        if let Some(code) = &self.code {
            let lines: Vec<String> = code
                .lines()
                .filter(|ln| !ln.trim().is_empty())
                .map(str::to_string)
                .collect();
            if !lines.is_empty() {
                return Some(lines);
            }
        }
        None
    }
}

/// One atomic, independently-checkable claim in a proof plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step id; canonical form is `S<n>`.
    pub id: String,
    /// Natural-language goal of the step.
    #[serde(default)]
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
    /// Legacy engine hint; consulted only when `checker.type` and `route`
    /// are both absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checker: Option<Checker>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<SymbolEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assumptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lemmas: Vec<String>,
    #[serde(default)]
    pub explanation: String,
    /// Path to supporting evidence recorded by the planner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_path: Option<String>,
    /// Digest of supporting evidence when no path is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_digest: Option<String>,
}

impl Step {
    /// Resolve the checker kind: `checker.type`, then `route`, then the
    /// legacy `engine` hint.
    pub fn checker_kind(&self) -> CheckerKind {
        let hint = self
            .checker
            .as_ref()
            .and_then(|c| c.kind.clone())
            .or_else(|| self.route.map(|r| r.as_str().to_string()))
            .or_else(|| self.engine.clone());

        match hint.as_deref() {
            Some("sympy") => CheckerKind::Sympy,
            Some("lean4") | Some("lean") => CheckerKind::Lean4,
            Some(other) => CheckerKind::Other(other.to_string()),
            None => CheckerKind::Other("unknown".to_string()),
        }
    }

    /// Whether this step is checked by the Lean toolchain.
    pub fn is_lean(&self) -> bool {
        self.checker_kind() == CheckerKind::Lean4
    }

    /// Canonical step number, if the id has the `S<n>` form.
    pub fn number(&self) -> Option<u32> {
        step_number(&self.id)
    }
}

// ============================================================================
// Kani proofs
// ============================================================================

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Verify canonical ids parse to their number
    #[kani::proof]
    fn proof_step_number_canonical() {
        kani::assert(step_number("S1") == Some(1), "S1 should parse");
        kani::assert(step_number("S42") == Some(42), "S42 should parse");
    }

    /// Verify suffixed names are rejected
    #[kani::proof]
    fn proof_step_number_rejects_suffix() {
        kani::assert(step_number("S1_helper").is_none(), "Suffix should fail");
        kani::assert(step_number("S1'").is_none(), "Prime should fail");
    }

    /// Verify non-step strings are rejected
    #[kani::proof]
    fn proof_step_number_rejects_garbage() {
        kani::assert(step_number("").is_none(), "Empty should fail");
        kani::assert(step_number("T1").is_none(), "Wrong prefix should fail");
        kani::assert(step_number("S").is_none(), "Missing digits should fail");
    }
}
