//! Solution document rendering
//!
//! Pure text rendering: template placeholder substitution with a minimal
//! built-in layout as fallback. The renderer never decides whether the
//! document should exist — the pipeline only calls it after a clean audit.

use crate::report::AuditResult;
use proofgate_steps::{Step, SymbolEntry};
use std::collections::HashMap;

/// Placeholder for the rendered per-step section.
pub const STEPS_SECTION_PLACEHOLDER: &str = "{{STEPS_SECTION}}";
/// Placeholder for the problem statement.
pub const PROBLEM_PLACEHOLDER: &str = "{{PROBLEM}}";
/// Placeholder for the global audit status.
pub const AUDIT_STATUS_PLACEHOLDER: &str = "{{AUDIT_STATUS}}";
/// Placeholder for the one-line audit summary.
pub const AUDIT_REPORT_PLACEHOLDER: &str = "{{AUDIT_REPORT}}";

/// Render the final document from a template, or from the built-in layout
/// when no template is available.
pub fn render_solution(
    problem: Option<&str>,
    steps: &[Step],
    report: &[AuditResult],
    audit_status: &str,
    audit_summary: &str,
    template: Option<&str>,
) -> String {
    let steps_section = render_steps_section(steps, report);
    let problem = problem.unwrap_or("not provided");

    let Some(template) = template.filter(|t| !t.trim().is_empty()) else {
        let mut lines = vec![
            "# Solution".to_string(),
            String::new(),
            "## Problem".to_string(),
            format!("- {}", problem),
            String::new(),
        ];
        lines.push(steps_section);
        lines.push("## Final Consistency Audit".to_string());
        lines.push(format!("- Status: {}", audit_status));
        lines.push(format!("- Summary: {}", audit_summary));
        return format!("{}\n", lines.join("\n").trim());
    };

    let out = template
        .replace(STEPS_SECTION_PLACEHOLDER, &steps_section)
        .replace(PROBLEM_PLACEHOLDER, problem)
        .replace(AUDIT_STATUS_PLACEHOLDER, audit_status)
        .replace(AUDIT_REPORT_PLACEHOLDER, audit_summary);
    format!("{}\n", out.trim())
}

/// Render the per-step section: goal, difficulty, route, audit status,
/// evidence pointer and the documentary metadata.
pub fn render_steps_section(steps: &[Step], report: &[AuditResult]) -> String {
    let status_by_id: HashMap<&str, &str> = report
        .iter()
        .map(|r| {
            (
                r.id.as_str(),
                if r.is_passed() { "passed" } else { "failed" },
            )
        })
        .collect();

    let mut lines: Vec<String> = Vec::new();
    for step in steps {
        lines.push(format!("### {}", step.id));
        lines.push(format!("- Goal: {}", step.goal));
        if let Some(difficulty) = step.difficulty {
            lines.push(format!("- Difficulty: {}", difficulty));
        }
        if let Some(route) = step.route {
            lines.push(format!("- Route: {}", route));
        }
        lines.push(format!(
            "- Status: {}",
            status_by_id.get(step.id.as_str()).unwrap_or(&"unknown")
        ));
        if let Some(path) = step.evidence_path.as_deref().filter(|s| !s.trim().is_empty()) {
            lines.push(format!("- Evidence: {}", path.trim()));
        } else if let Some(digest) = step
            .evidence_digest
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            lines.push(format!("- Evidence: {}", digest.trim()));
        }

        if !step.symbols.is_empty() {
            lines.push("- Symbols:".to_string());
            for symbol in &step.symbols {
                match symbol {
                    SymbolEntry::Named { name, meaning } => {
                        if !name.trim().is_empty() || !meaning.trim().is_empty() {
                            lines.push(format!("  - {}: {}", name.trim(), meaning.trim()));
                        }
                    }
                    SymbolEntry::Bare(text) => {
                        if !text.trim().is_empty() {
                            lines.push(format!("  - {}", text.trim()));
                        }
                    }
                }
            }
        }

        if !step.assumptions.is_empty() {
            lines.push("- Assumptions:".to_string());
            for assumption in &step.assumptions {
                if !assumption.trim().is_empty() {
                    lines.push(format!("  - {}", assumption.trim()));
                }
            }
        }

        if !step.lemmas.is_empty() {
            lines.push("- Lemmas:".to_string());
            for lemma in &step.lemmas {
                if !lemma.trim().is_empty() {
                    lines.push(format!("  - {}", lemma.trim()));
                }
            }
        }

        if !step.explanation.trim().is_empty() {
            lines.push("- Explanation:".to_string());
            for line in step.explanation.lines() {
                lines.push(format!("  {}", line).trim_end().to_string());
            }
        }

        lines.push(String::new());
    }

    format!("{}\n", lines.join("\n").trim())
}
