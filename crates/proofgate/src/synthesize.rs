//! Reverse-gate file synthesis
//!
//! Merges the Lean fragments of all steps into one compilable source file
//! from a fixed template. The template supplies the canonical import block,
//! the namespace, and two markers: the step-map marker line and the closing
//! `end <namespace>` line. Synthesis is deterministic — the same steps and
//! template always produce byte-identical output.
//!
//! Fragments are authored independently, so each may naively declare its own
//! imports; Lean requires all imports at the head of the file, which is why
//! import lines are stripped from step bodies and hoisted (deduplicated,
//! sorted) into the template's import block.

use proofgate_lint::source::step_decls;
use proofgate_lint::STEP_MAP_MARKER;
use proofgate_steps::{step_number, Step, SymbolEntry};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Synthesis failures; each identifies the offending step or template
/// defect so a mismatch can never silently produce an unauditable file.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("reverse gate template not found: {0}")]
    TemplateMissing(PathBuf),

    #[error("reverse gate template is missing the '-- {STEP_MAP_MARKER}' marker line")]
    MissingMarker,

    #[error("reverse gate template is missing 'end {0}'")]
    MissingEnd(String),

    #[error("reverse gate requires step ids of the form S1/S2/...; got: {0:?}")]
    NonCanonicalId(String),

    #[error("Lean step {0} has no checker cmds/cmd/code to merge")]
    MissingFragment(String),

    #[error("Lean step {id} must declare `theorem/lemma {id}` in its own code")]
    MissingAnchor { id: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Synthesizer settings; the namespace must match the template's
/// `namespace`/`end` pair.
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    pub namespace: String,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            namespace: "ProofGate".to_string(),
        }
    }
}

/// One typed line of a step section, rendered to text only at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GateLine {
    Blank,
    Comment(String),
    Code(String),
}

impl GateLine {
    fn render(&self) -> String {
        match self {
            Self::Blank => String::new(),
            Self::Comment(text) => format!("-- {}", text),
            Self::Code(text) => text.clone(),
        }
    }
}

/// The body section for one step, plus the imports stripped out of it.
#[derive(Debug, Default)]
struct StepSection {
    lines: Vec<GateLine>,
    imports: BTreeSet<String>,
}

impl StepSection {
    fn blank(&mut self) {
        self.lines.push(GateLine::Blank);
    }

    fn comment(&mut self, text: impl Into<String>) {
        self.lines.push(GateLine::Comment(text.into()));
    }

    /// Add a fragment line, diverting imports into the hoist set.
    fn code(&mut self, line: &str, import_re: &Regex) {
        if import_re.is_match(line) {
            self.imports.insert(line.trim().to_string());
        } else {
            self.lines.push(GateLine::Code(line.to_string()));
        }
    }
}

/// Synthesize the reverse-gate source from steps and template text.
pub fn synthesize(
    steps: &[Step],
    template: &str,
    config: &SynthesizerConfig,
) -> Result<String, SynthesisError> {
    let template_lines: Vec<&str> = template.lines().collect();
    let map_line_re = Regex::new(r"^\s*--\s*S\d+\s*:").expect("valid step map line regex");
    let import_re = Regex::new(r"^\s*import\s+").expect("valid import regex");
    let end_re = Regex::new(&format!(r"^\s*end\s+{}\b", regex::escape(&config.namespace)))
        .expect("valid end marker regex");

    let marker_idx = template_lines
        .iter()
        .position(|ln| ln.contains(STEP_MAP_MARKER))
        .ok_or(SynthesisError::MissingMarker)?;

    // Head of the file: template up to and including the marker, then one
    // map line per step, replacing any pre-existing map lines below it.
    let mut out: Vec<String> = template_lines[..=marker_idx]
        .iter()
        .map(|ln| (*ln).to_string())
        .collect();
    for step in steps {
        let n = step_number(&step.id)
            .ok_or_else(|| SynthesisError::NonCanonicalId(step.id.clone()))?;
        out.push(GateLine::Comment(format!("S{}: {}", n, step.goal.trim())).render());
    }
    let mut rest = marker_idx + 1;
    while rest < template_lines.len() && map_line_re.is_match(template_lines[rest]) {
        rest += 1;
    }
    out.extend(template_lines[rest..].iter().map(|ln| (*ln).to_string()));

    let mut end_idx = out
        .iter()
        .position(|ln| end_re.is_match(ln))
        .ok_or_else(|| SynthesisError::MissingEnd(config.namespace.clone()))?;

    // Per-step body sections and the hoisted import set.
    let mut hoisted: BTreeSet<String> = BTreeSet::new();
    let mut body: Vec<GateLine> = Vec::new();
    for step in steps {
        let section = step_section(step, &import_re)?;
        hoisted.extend(section.imports);
        body.extend(section.lines);
    }

    // Hoist imports to immediately after the template's own import block,
    // never duplicating a line already present and never duplicating the
    // domain library's top-level import.
    if !hoisted.is_empty() {
        if let Some(first) = out.iter().position(|ln| import_re.is_match(ln)) {
            let mut after = first;
            while after < out.len() && import_re.is_match(&out[after]) {
                after += 1;
            }
            let existing: HashSet<String> = out[first..after]
                .iter()
                .map(|ln| ln.trim().to_string())
                .collect();
            let to_add: Vec<String> = hoisted
                .into_iter()
                .filter(|imp| !existing.contains(imp) && imp != "import Mathlib")
                .collect();
            if !to_add.is_empty() {
                let added = to_add.len() + 1;
                let mut insert = to_add;
                insert.push(String::new());
                out.splice(after..after, insert);
                end_idx += added;
            }
        }
        // A template without an import block is left as-is; the strict
        // file gate will reject the result if the domain library is
        // required.
    }

    let rendered: Vec<String> = body.iter().map(GateLine::render).collect();
    out.splice(end_idx..end_idx, rendered);

    Ok(format!("{}\n", out.join("\n").trim_end()))
}

/// Build the body section for one step.
fn step_section(step: &Step, import_re: &Regex) -> Result<StepSection, SynthesisError> {
    let mut section = StepSection::default();
    section.blank();
    section.comment(format!("STEP {}: {}", step.id.trim(), step.goal.trim()));

    if !step.is_lean() {
        section.comment("(non-Lean step; verified elsewhere)");
        return Ok(section);
    }

    let lines = step
        .checker
        .as_ref()
        .and_then(|c| c.lean_lines())
        .ok_or_else(|| SynthesisError::MissingFragment(step.id.clone()))?;

    // Re-validate traceability here: a fragment whose declaration does not
    // match its id would merge into a file the linter cannot map back.
    let n = step_number(&step.id)
        .ok_or_else(|| SynthesisError::NonCanonicalId(step.id.clone()))?;
    if !step_decls(&lines.join("\n")).contains(&n) {
        return Err(SynthesisError::MissingAnchor {
            id: step.id.clone(),
        });
    }

    if !step.symbols.is_empty() {
        section.comment("Symbols:");
        for symbol in &step.symbols {
            match symbol {
                SymbolEntry::Named { name, meaning } => {
                    if !name.trim().is_empty() || !meaning.trim().is_empty() {
                        section.comment(format!("  - {}: {}", name.trim(), meaning.trim()));
                    }
                }
                SymbolEntry::Bare(text) => {
                    if !text.trim().is_empty() {
                        section.comment(format!("  - {}", text.trim()));
                    }
                }
            }
        }
    }

    if !step.assumptions.is_empty() {
        section.comment("Assumptions:");
        for assumption in &step.assumptions {
            if !assumption.trim().is_empty() {
                section.comment(format!("  - {}", assumption.trim()));
            }
        }
    }

    if !step.explanation.trim().is_empty() {
        section.comment("Explanation:");
        for line in step.explanation.lines() {
            section.comment(format!("  {}", line.trim_end()));
        }
    }

    section.blank();
    for line in &lines {
        section.code(line, import_re);
    }
    Ok(section)
}

/// Read the template, synthesize, and write the gate file.
///
/// Returns a human-readable message for the report's `generate` record.
pub fn write_gate_file(
    steps: &[Step],
    template_path: &Path,
    out_path: &Path,
    config: &SynthesizerConfig,
) -> Result<String, SynthesisError> {
    if !template_path.exists() {
        return Err(SynthesisError::TemplateMissing(template_path.to_path_buf()));
    }
    let template = std::fs::read_to_string(template_path)?;
    let rendered = synthesize(steps, &template, config)?;
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out_path, rendered)?;
    Ok(format!("reverse gate file written: {}", out_path.display()))
}
