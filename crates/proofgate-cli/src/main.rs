//! ProofGate CLI
//!
//! Audits a step document against its checkers and, when everything passes,
//! writes the solution document. Prints the JSON audit report on stdout.
//!
//! Exit codes: `0` audited and passed; `1` failed audit, lint rejection or
//! reverse-gate failure; `2` configuration error (unreadable inputs,
//! missing project directory or template).

use clap::{Parser, ValueEnum};
use proofgate::{PipelineConfig, ProofGate, ReverseGateConfig, RunContext};
use proofgate_steps::{ExecMode, StepDocument};
use proofgate_verifiers::util::expand_home_dir;
use proofgate_verifiers::{LeanConfig, SympyConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LeanModeArg {
    Repl,
    File,
    Auto,
}

impl From<LeanModeArg> for ExecMode {
    fn from(mode: LeanModeArg) -> Self {
        match mode {
            LeanModeArg::Repl => ExecMode::Repl,
            LeanModeArg::File => ExecMode::File,
            LeanModeArg::Auto => ExecMode::Auto,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "proofgate")]
#[command(about = "Audit planner steps with external checkers and gate the solution document")]
#[command(version)]
struct Cli {
    /// Step document: JSON with `problem` and `steps`
    #[arg(long)]
    steps: PathBuf,

    /// Solution output path (default: <run-dir>/audit/Solution.md)
    #[arg(long)]
    solution: Option<PathBuf>,

    /// Solution template with {{STEPS_SECTION}}/{{PROBLEM}}/{{AUDIT_STATUS}}/{{AUDIT_REPORT}}
    #[arg(long)]
    solution_template: Option<PathBuf>,

    /// Default per-step timeout in seconds (SymPy; Lean uses --lean-timeout)
    #[arg(long, default_value_t = 15)]
    timeout: u64,

    /// Default Lean per-step timeout in seconds
    #[arg(long, default_value_t = 60)]
    lean_timeout: u64,

    /// Python interpreter for SymPy checkers
    #[arg(long)]
    python: Option<String>,

    /// SymPy assertion-helper template prepended to each snippet
    #[arg(long)]
    sympy_template: Option<PathBuf>,

    /// Default Lean execution mode
    #[arg(long, value_enum)]
    lean_mode: Option<LeanModeArg>,

    /// Lean working directory (a Lake project, recommended with Mathlib)
    #[arg(long)]
    lean_cwd: Option<String>,

    /// Explicit lean executable path
    #[arg(long)]
    lean_path: Option<String>,

    /// Explicit lake executable path
    #[arg(long)]
    lake_path: Option<String>,

    /// No-output watchdog for Lean file mode, in seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    lean_watchdog_timeout: u64,

    /// Run directory for artifacts (report, gate file, solution)
    #[arg(long, default_value = "runs/current")]
    run_dir: PathBuf,

    /// Enable the reverse gate (synthesize + lint + compile)
    #[arg(long)]
    lean_gate: bool,

    /// Reverse-gate output .lean file (default: <run-dir>/audit/reverse_gate.lean)
    #[arg(long)]
    lean_gate_out: Option<PathBuf>,

    /// Reverse-gate Lean template
    #[arg(long, default_value = "assets/reverse_gate_template.lean")]
    lean_gate_template: PathBuf,

    /// Reverse-gate timeout in seconds (0 = derived from step timeouts)
    #[arg(long, default_value_t = 0)]
    lean_gate_timeout: u64,

    /// Skip the reverse-gate lint (not recommended)
    #[arg(long)]
    lean_gate_skip_lint: bool,

    /// Do not require Mathlib in the reverse-gate lint (not recommended)
    #[arg(long)]
    lean_gate_no_mathlib: bool,

    /// Require local domain definitions in the reverse-gate lint
    #[arg(long)]
    lean_gate_domain_defs: bool,

    /// Compile the reverse gate inside an ephemeral copy of the project
    #[arg(long)]
    lean_ephemeral: bool,

    /// Narrative markdown for reverse-gate step-coverage checks
    #[arg(long)]
    markdown: Option<PathBuf>,
}

fn expand(path: &str) -> PathBuf {
    expand_home_dir(path).unwrap_or_else(|| PathBuf::from(path))
}

fn nonzero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn build_config(cli: &Cli, context: &RunContext) -> PipelineConfig {
    let lean_cwd = cli.lean_cwd.as_deref().map(expand);
    let watchdog = nonzero_secs(cli.lean_watchdog_timeout);

    let mut config = PipelineConfig::default();
    config.auditor.default_timeout = Duration::from_secs(cli.timeout);
    config.auditor.lean_timeout = Duration::from_secs(cli.lean_timeout);
    config.auditor.lean_mode = cli.lean_mode.map(ExecMode::from);
    config.auditor.lean_cwd = lean_cwd.clone();
    config.auditor.lean_watchdog_timeout = watchdog;

    config.sympy = SympyConfig {
        python_path: cli.python.as_deref().map(expand),
        template_path: cli.sympy_template.clone(),
        timeout: Duration::from_secs(cli.timeout),
    };
    config.lean = LeanConfig {
        mode: cli.lean_mode.map(ExecMode::from).unwrap_or(ExecMode::Repl),
        lean_path: cli.lean_path.as_deref().map(expand),
        lake_path: cli.lake_path.as_deref().map(expand),
        cwd: lean_cwd.clone(),
        timeout: Duration::from_secs(cli.lean_timeout),
        watchdog_timeout: watchdog,
        ..LeanConfig::default()
    };

    if cli.lean_gate {
        let mut gate = ReverseGateConfig::new(&cli.lean_gate_template);
        gate.project_dir = lean_cwd;
        gate.output_path = cli.lean_gate_out.as_ref().map(|p| context.path(p));
        gate.timeout = nonzero_secs(cli.lean_gate_timeout);
        gate.ephemeral = cli.lean_ephemeral;
        gate.require_mathlib = !cli.lean_gate_no_mathlib;
        gate.require_domain_defs = cli.lean_gate_domain_defs;
        gate.skip_lint = cli.lean_gate_skip_lint;
        gate.markdown_path = cli.markdown.clone();
        gate.watchdog_timeout = watchdog;
        config.reverse_gate = Some(gate);
    }

    config.solution_template = cli.solution_template.clone();
    config.solution_path = cli.solution.as_ref().map(|p| context.path(p));
    config
}

async fn run(cli: Cli) -> i32 {
    let context = match RunContext::create(&cli.run_dir) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("proofgate: failed to create run directory: {}", e);
            return 2;
        }
    };

    let steps_path = context.path(&cli.steps);
    let doc = match StepDocument::from_path(&steps_path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("proofgate: {}: {}", steps_path.display(), e);
            return 2;
        }
    };

    let config = build_config(&cli, &context);
    let pipeline = ProofGate::new(config, context);

    match pipeline.run(&doc).await {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("proofgate: failed to serialize report: {}", e),
            }
            if report.passed() {
                0
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("proofgate: {}", e);
            2
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    std::process::exit(run(cli).await);
}
