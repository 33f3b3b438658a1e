//! Reverse-gate execution: file-scope lint, then a real compile
//!
//! The synthesized gate file is first run through the strict file gate and
//! then compiled with the Lean toolchain inside the configured Lake project
//! (optionally an ephemeral copy of it). Both halves must pass.

use crate::context::EphemeralWorkspace;
use proofgate_lint::{file_gate, FileLintOptions};
use proofgate_verifiers::LeanVerifier;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Safety floor added to the default timeout when computing the gate's
/// compile budget; compiling the merged file is always slower than any
/// single step.
pub const GATE_TIMEOUT_FLOOR: Duration = Duration::from_secs(10);

/// Reverse-gate configuration.
#[derive(Debug, Clone)]
pub struct ReverseGateConfig {
    /// The Lake project to compile in. Required: there is no implicit
    /// default, and a missing directory is a configuration error.
    pub project_dir: Option<PathBuf>,
    /// The gate template file.
    pub template_path: PathBuf,
    /// Where to write the synthesized file; defaults to the run context's
    /// gate path.
    pub output_path: Option<PathBuf>,
    /// Explicit gate timeout; the effective budget never goes below the
    /// Lean step timeout or the default-plus-floor.
    pub timeout: Option<Duration>,
    /// Compile inside an ephemeral copy of the project.
    pub ephemeral: bool,
    /// Strict mode: require Mathlib, forbid local core-type stubs.
    pub require_mathlib: bool,
    /// Hardening: require local domain definitions and step linkage.
    pub require_domain_defs: bool,
    /// Skip the file-scope lint (not recommended).
    pub skip_lint: bool,
    /// Minimum `S<n>` declarations the gate file must carry.
    pub min_steps: usize,
    /// Narrative document for step-coverage cross-checks.
    pub markdown_path: Option<PathBuf>,
    /// No-output watchdog for the compile.
    pub watchdog_timeout: Option<Duration>,
}

impl ReverseGateConfig {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: None,
            template_path: template_path.into(),
            output_path: None,
            timeout: None,
            ephemeral: false,
            require_mathlib: true,
            require_domain_defs: false,
            skip_lint: false,
            min_steps: 1,
            markdown_path: None,
            watchdog_timeout: None,
        }
    }

    /// Effective compile budget: max of the explicit gate timeout, the Lean
    /// step timeout, and the default timeout plus the safety floor.
    pub fn effective_timeout(&self, lean_timeout: Duration, default_timeout: Duration) -> Duration {
        self.timeout
            .unwrap_or(Duration::ZERO)
            .max(lean_timeout)
            .max(default_timeout + GATE_TIMEOUT_FLOOR)
    }
}

/// Lint and compile the gate file. Returns pass/fail plus an opaque detail
/// record; every failure mode folds into the detail so the caller always
/// gets a reportable outcome.
pub async fn run_reverse_gate(
    config: &ReverseGateConfig,
    gate_path: &Path,
    lean: &LeanVerifier,
    lean_timeout: Duration,
    default_timeout: Duration,
) -> (bool, serde_json::Value) {
    let Some(project_dir) = &config.project_dir else {
        return (
            false,
            json!({ "error": "reverse gate requires an explicit Lean project directory" }),
        );
    };

    let gate_text = match std::fs::read_to_string(gate_path) {
        Ok(text) => text,
        Err(e) => {
            return (
                false,
                json!({ "error": format!("failed to read gate file {}: {}", gate_path.display(), e) }),
            )
        }
    };

    if config.skip_lint {
        warn!("reverse gate lint skipped by configuration");
    } else {
        let markdown = match &config.markdown_path {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(text) => Some(text),
                Err(e) => {
                    return (
                        false,
                        json!({ "error": format!("failed to read narrative {}: {}", path.display(), e) }),
                    )
                }
            },
            None => None,
        };
        let options = FileLintOptions {
            min_steps: config.min_steps,
            require_step_map: true,
            require_mathlib: config.require_mathlib,
            require_domain_defs: config.require_domain_defs,
            markdown,
        };
        let issues = file_gate(&options).check_text(&gate_text);
        if !issues.is_empty() {
            warn!(issues = issues.len(), "reverse gate lint rejected the file");
            return (false, json!({ "lint_issues": issues }));
        }
    }

    let timeout = config.effective_timeout(lean_timeout, default_timeout);
    let compile = if config.ephemeral {
        // Scoped acquisition: the workspace is removed when `ws` drops, on
        // every exit path out of this block.
        let ws = match EphemeralWorkspace::clone_project(project_dir) {
            Ok(ws) => ws,
            Err(e) => {
                return (
                    false,
                    json!({ "error": format!("failed to create ephemeral workspace: {}", e) }),
                )
            }
        };
        let file_name = gate_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("reverse_gate.lean"));
        let temp_gate = ws.project_dir().join(file_name);
        if let Err(e) = std::fs::copy(gate_path, &temp_gate) {
            return (
                false,
                json!({ "error": format!("failed to copy gate file into workspace: {}", e) }),
            );
        }
        lean.compile_file(&temp_gate, ws.project_dir(), timeout, config.watchdog_timeout)
            .await
    } else {
        lean.compile_file(gate_path, project_dir, timeout, config.watchdog_timeout)
            .await
    };

    match compile {
        Ok(report) => {
            let ok = report.passed();
            info!(
                status = if ok { "passed" } else { "failed" },
                path = %gate_path.display(),
                "reverse gate compile finished"
            );
            (ok, report.to_detail())
        }
        Err(e) => (false, json!({ "error": e.to_string() })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofgate_verifiers::LeanConfig;
    use std::io::Write;
    use tempfile::TempDir;

    const CLEAN_GATE: &str = "import Mathlib\n\nnamespace ProofGate\n\n-- PROOFGATE_STEP_MAP\n-- S1: trivial fact\n\ntheorem S1 : True := trivial\n\nend ProofGate\n";

    fn fake_lean(dir: &TempDir, name: &str, script: &str) -> LeanVerifier {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{}", script).unwrap();
        LeanVerifier::with_config(LeanConfig {
            file_cmd: Some(format!("sh {}", path.display())),
            ..LeanConfig::default()
        })
    }

    fn write_gate(dir: &TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("reverse_gate.lean");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn config(project: &TempDir) -> ReverseGateConfig {
        let mut cfg = ReverseGateConfig::new("/unused/template.lean");
        cfg.project_dir = Some(project.path().to_path_buf());
        cfg
    }

    #[test]
    fn effective_timeout_takes_the_max() {
        let mut cfg = ReverseGateConfig::new("/t.lean");
        // No explicit timeout: default + floor vs lean timeout.
        assert_eq!(
            cfg.effective_timeout(Duration::from_secs(60), Duration::from_secs(15)),
            Duration::from_secs(60)
        );
        assert_eq!(
            cfg.effective_timeout(Duration::from_secs(5), Duration::from_secs(15)),
            Duration::from_secs(25)
        );
        cfg.timeout = Some(Duration::from_secs(300));
        assert_eq!(
            cfg.effective_timeout(Duration::from_secs(60), Duration::from_secs(15)),
            Duration::from_secs(300)
        );
    }

    #[tokio::test]
    async fn missing_project_dir_is_a_hard_error() {
        let tools = TempDir::new().unwrap();
        let gate = write_gate(&tools, CLEAN_GATE);
        let lean = fake_lean(&tools, "ok.sh", "exit 0");
        let cfg = ReverseGateConfig::new("/unused/template.lean");

        let (ok, detail) = run_reverse_gate(
            &cfg,
            &gate,
            &lean,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await;
        assert!(!ok);
        assert!(detail["error"]
            .as_str()
            .unwrap()
            .contains("project directory"));
    }

    #[tokio::test]
    async fn lint_rejection_happens_before_any_compile() {
        let tools = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        // Compiler would pass; the sorry must stop the gate first.
        let lean = fake_lean(&tools, "ok.sh", "exit 0");
        let gate = write_gate(
            &tools,
            "import Mathlib\n\n-- PROOFGATE_STEP_MAP\n-- S1: x\n\ntheorem S1 : True := sorry\n\nend ProofGate\n",
        );

        let (ok, detail) = run_reverse_gate(
            &config(&project),
            &gate,
            &lean,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await;
        assert!(!ok);
        let issues = detail["lint_issues"].as_array().unwrap();
        assert!(issues
            .iter()
            .any(|i| i["code"] == "FORBIDDEN_SORRY"));
    }

    #[tokio::test]
    async fn clean_gate_compiles_and_passes() {
        let tools = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let lean = fake_lean(&tools, "ok.sh", "exit 0");
        let gate = write_gate(&tools, CLEAN_GATE);

        let (ok, detail) = run_reverse_gate(
            &config(&project),
            &gate,
            &lean,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await;
        assert!(ok, "detail: {}", detail);
        assert_eq!(detail["status"], "success");
    }

    #[tokio::test]
    async fn compile_failure_fails_the_gate() {
        let tools = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let lean = fake_lean(&tools, "fail.sh", "echo 'error: unsolved goals' >&2; exit 1");
        let gate = write_gate(&tools, CLEAN_GATE);

        let (ok, detail) = run_reverse_gate(
            &config(&project),
            &gate,
            &lean,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await;
        assert!(!ok);
        assert_eq!(detail["status"], "error");
    }

    #[tokio::test]
    async fn ephemeral_mode_compiles_in_a_project_copy() {
        let tools = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::write(project.path().join("lakefile.lean"), "-- lakefile\n").unwrap();

        // Passes only when run inside a directory holding the copied
        // lakefile, proving the compile used the workspace.
        let lean = fake_lean(&tools, "check_cwd.sh", "[ -f lakefile.lean ] || exit 1");
        let gate = write_gate(&tools, CLEAN_GATE);

        let mut cfg = config(&project);
        cfg.ephemeral = true;
        let (ok, detail) = run_reverse_gate(
            &cfg,
            &gate,
            &lean,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await;
        assert!(ok, "detail: {}", detail);

        // The real project was never polluted with the gate file.
        assert!(!project.path().join("reverse_gate.lean").exists());
    }

    #[tokio::test]
    async fn skip_lint_lets_the_compiler_decide() {
        let tools = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let lean = fake_lean(&tools, "ok.sh", "exit 0");
        // Would fail lint (no Mathlib import, no step map).
        let gate = write_gate(&tools, "theorem S1 : True := trivial\n");

        let mut cfg = config(&project);
        cfg.skip_lint = true;
        let (ok, _) = run_reverse_gate(
            &cfg,
            &gate,
            &lean,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await;
        assert!(ok);
    }
}
