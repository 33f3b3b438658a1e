//! Gate composition: ordered rule sets for fragments and whole files

use crate::rules::{
    DomainDefsRule, ForbiddenDeclRule, ForbiddenMarkerRule, LintIssue, LintRule,
    MarkdownCoverageRule, MathlibStrictRule, StepCountRule, StepMapRule, TraceabilityRule,
};
use crate::source::LeanSource;

/// An ordered composition of lint rules.
pub struct LintGate {
    rules: Vec<Box<dyn LintRule>>,
}

impl LintGate {
    pub fn new(rules: Vec<Box<dyn LintRule>>) -> Self {
        Self { rules }
    }

    /// Run every rule in order; an empty result means the source passes.
    pub fn check(&self, source: &LeanSource) -> Vec<LintIssue> {
        self.rules
            .iter()
            .flat_map(|rule| rule.check(source))
            .collect()
    }

    /// Convenience wrapper building the [`LeanSource`] view.
    pub fn check_text(&self, text: &str) -> Vec<LintIssue> {
        self.check(&LeanSource::new(text))
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }
}

/// The per-step gate the auditor runs before spending any compiler time:
/// forbidden declarations, incomplete-proof markers, and the traceability
/// anchor for canonical step ids.
pub fn fragment_gate(step_id: &str) -> LintGate {
    LintGate::new(vec![
        Box::new(ForbiddenDeclRule::new()),
        Box::new(ForbiddenMarkerRule::new()),
        Box::new(TraceabilityRule::new(step_id)),
    ])
}

/// Options for the file-scope reverse-gate linter.
#[derive(Debug, Clone)]
pub struct FileLintOptions {
    /// Minimum number of exactly-named `S<n>` declarations.
    pub min_steps: usize,
    /// Require the step-map marker plus one map line per step.
    pub require_step_map: bool,
    /// Strict mode: require Mathlib, forbid local core-type stubs and
    /// placeholder marker text.
    pub require_mathlib: bool,
    /// Hardening: require local domain definitions and step/domain linkage.
    pub require_domain_defs: bool,
    /// Narrative document to cross-check step coverage against.
    pub markdown: Option<String>,
}

impl Default for FileLintOptions {
    fn default() -> Self {
        Self {
            min_steps: 1,
            require_step_map: false,
            require_mathlib: false,
            require_domain_defs: false,
            markdown: None,
        }
    }
}

/// The stricter file-scope gate run on the synthesized reverse-gate file.
pub fn file_gate(options: &FileLintOptions) -> LintGate {
    let mut rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(ForbiddenDeclRule::new()),
        Box::new(ForbiddenMarkerRule::new()),
    ];
    if options.require_mathlib {
        rules.push(Box::new(MathlibStrictRule::new()));
    }
    rules.push(Box::new(StepCountRule::new(options.min_steps)));
    if options.require_step_map {
        rules.push(Box::new(StepMapRule::new(options.min_steps)));
    }
    if options.require_domain_defs {
        rules.push(Box::new(DomainDefsRule::new(options.require_mathlib)));
    }
    if let Some(md) = &options.markdown {
        rules.push(Box::new(MarkdownCoverageRule::new(
            md.clone(),
            options.require_step_map,
        )));
    }
    LintGate::new(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::codes;
    use crate::STEP_MAP_MARKER;

    #[test]
    fn fragment_gate_passes_an_honest_step() {
        let gate = fragment_gate("S1");
        let issues = gate.check_text("theorem S1 : 1 + 1 = 2 := by decide\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn fragment_gate_rejects_axiom_even_next_to_a_valid_theorem() {
        // The whole fragment is scanned, not just the named declaration.
        let gate = fragment_gate("S1");
        let issues =
            gate.check_text("axiom Bad : False\ntheorem S1 : True := by trivial\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::FORBIDDEN_DECL);
    }

    #[test]
    fn fragment_gate_rejects_mismatched_declaration_name() {
        let gate = fragment_gate("S2");
        let issues = gate.check_text("theorem S2_version : True := trivial\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::MISSING_STEP_DECL);
    }

    #[test]
    fn fragment_gate_collects_multiple_violations_in_rule_order() {
        let gate = fragment_gate("S1");
        let issues = gate.check_text("axiom Bad : False\ntheorem S9 : True := sorry\n");
        let found: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            found,
            vec![
                codes::FORBIDDEN_DECL,
                codes::FORBIDDEN_SORRY,
                codes::MISSING_STEP_DECL
            ]
        );
    }

    #[test]
    fn file_gate_defaults_check_structure_only() {
        let gate = file_gate(&FileLintOptions::default());
        assert_eq!(
            gate.rule_names(),
            vec!["forbidden-decl", "forbidden-marker", "step-count"]
        );
        let issues = gate.check_text("theorem S1 : True := trivial\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn file_gate_strict_mode_composes_all_rules() {
        let options = FileLintOptions {
            min_steps: 1,
            require_step_map: true,
            require_mathlib: true,
            require_domain_defs: true,
            markdown: Some("see (S1)".to_string()),
        };
        let gate = file_gate(&options);
        assert_eq!(
            gate.rule_names(),
            vec![
                "forbidden-decl",
                "forbidden-marker",
                "mathlib-strict",
                "step-count",
                "step-map",
                "domain-defs",
                "markdown-coverage"
            ]
        );

        let file = format!(
            "import Mathlib\n\nnamespace ProofGate\n\n-- {}\n-- S1: count walks\n\n\
             def walkCount (n : Nat) : Nat := 3 ^ n\n\n\
             theorem S1 : walkCount 3 = 27 := by decide\n\nend ProofGate\n",
            STEP_MAP_MARKER
        );
        let issues = gate.check_text(&file);
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn file_gate_strict_mode_rejects_a_gamed_file() {
        let options = FileLintOptions {
            min_steps: 2,
            require_step_map: true,
            require_mathlib: true,
            require_domain_defs: true,
            markdown: None,
        };
        let gate = file_gate(&options);
        // No Mathlib import, too few steps, no map, no domain defs.
        let issues = gate.check_text("theorem S1 : 1 + 1 = 2 := rfl\n");
        let found: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert!(found.contains(&codes::MATHLIB_REQUIRED));
        assert!(found.contains(&codes::LEAN_STEPS_TOO_FEW));
        assert!(found.contains(&codes::MISSING_STEP_MAP_HEADER));
        assert!(found.contains(&codes::MISSING_DOMAIN_DEFS));
    }
}
