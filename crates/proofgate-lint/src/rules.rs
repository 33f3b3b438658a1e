//! Individual lint rules
//!
//! Every rule owns its compiled patterns and answers one question about a
//! source. Rules never look at each other's results; ordering and selection
//! live in [`crate::gate`].

use crate::source::{
    definition_decls, markdown_step_refs, mentions_identifier, step_decls, step_header_chunks,
    step_map_numbers, LeanSource,
};
use crate::STEP_MAP_MARKER;
use proofgate_steps::step_number;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Issue codes, stable across releases so callers can match on them.
pub mod codes {
    pub const FORBIDDEN_DECL: &str = "FORBIDDEN_DECL";
    pub const FORBIDDEN_SORRY: &str = "FORBIDDEN_SORRY";
    pub const FORBIDDEN_ADMIT: &str = "FORBIDDEN_ADMIT";
    pub const MISSING_STEP_DECL: &str = "MISSING_STEP_DECL";
    pub const MATHLIB_REQUIRED: &str = "MATHLIB_REQUIRED";
    pub const FORBIDDEN_LOCAL_MATRIX_DEF: &str = "FORBIDDEN_LOCAL_MATRIX_DEF";
    pub const FORBIDDEN_PLACEHOLDER_MARKER: &str = "FORBIDDEN_PLACEHOLDER_MARKER";
    pub const LEAN_STEPS_TOO_FEW: &str = "LEAN_STEPS_TOO_FEW";
    pub const MISSING_STEP_MAP_HEADER: &str = "MISSING_STEP_MAP_HEADER";
    pub const STEP_MAP_TOO_FEW: &str = "STEP_MAP_TOO_FEW";
    pub const MISSING_DOMAIN_DEFS: &str = "MISSING_DOMAIN_DEFS";
    pub const STEP_DOES_NOT_REFERENCE_DOMAIN: &str = "STEP_DOES_NOT_REFERENCE_DOMAIN";
    pub const LEAN_MISSING_STEPS_FOR_MD: &str = "LEAN_MISSING_STEPS_FOR_MD";
    pub const STEP_MAP_MISSING_FOR_MD: &str = "STEP_MAP_MISSING_FOR_MD";
}

/// One violated rule: a stable code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    pub code: &'static str,
    pub message: String,
}

impl LintIssue {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// A single anti-cheat check over a Lean source.
pub trait LintRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, source: &LeanSource) -> Vec<LintIssue>;
}

/// Forbids declarations that typecheck without proving anything:
/// `axiom`, `constant`, `opaque`.
pub struct ForbiddenDeclRule {
    re: Regex,
}

impl ForbiddenDeclRule {
    pub fn new() -> Self {
        Self {
            re: Regex::new(r"(?m)^\s*(axiom|constant|opaque)\b")
                .expect("valid forbidden declaration regex"),
        }
    }
}

impl Default for ForbiddenDeclRule {
    fn default() -> Self {
        Self::new()
    }
}

impl LintRule for ForbiddenDeclRule {
    fn name(&self) -> &'static str {
        "forbidden-decl"
    }

    fn check(&self, source: &LeanSource) -> Vec<LintIssue> {
        if self.re.is_match(source.stripped()) {
            vec![LintIssue::new(
                codes::FORBIDDEN_DECL,
                "found forbidden declaration keyword (axiom/constant/opaque); \
                 do not bypass the gate with axioms, record explicit assumptions instead",
            )]
        } else {
            Vec::new()
        }
    }
}

/// Forbids the incomplete-proof markers `sorry` and `admit` outside
/// comments.
pub struct ForbiddenMarkerRule {
    sorry_re: Regex,
    admit_re: Regex,
}

impl ForbiddenMarkerRule {
    pub fn new() -> Self {
        Self {
            sorry_re: Regex::new(r"\bsorry\b").expect("valid sorry regex"),
            admit_re: Regex::new(r"\badmit\b").expect("valid admit regex"),
        }
    }
}

impl Default for ForbiddenMarkerRule {
    fn default() -> Self {
        Self::new()
    }
}

impl LintRule for ForbiddenMarkerRule {
    fn name(&self) -> &'static str {
        "forbidden-marker"
    }

    fn check(&self, source: &LeanSource) -> Vec<LintIssue> {
        let mut issues = Vec::new();
        if self.sorry_re.is_match(source.stripped()) {
            issues.push(LintIssue::new(
                codes::FORBIDDEN_SORRY,
                "found `sorry`; replace it with a real proof or downgrade the related step",
            ));
        }
        if self.admit_re.is_match(source.stripped()) {
            issues.push(LintIssue::new(
                codes::FORBIDDEN_ADMIT,
                "found `admit`; replace it with a real proof or downgrade the related step",
            ));
        }
        issues
    }
}

/// Requires a declaration named exactly after the step id.
///
/// Only applies to canonical `S<n>` ids; exotic ids are not forced into the
/// naming scheme.
pub struct TraceabilityRule {
    step_id: String,
}

impl TraceabilityRule {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
        }
    }
}

impl LintRule for TraceabilityRule {
    fn name(&self) -> &'static str {
        "traceability"
    }

    fn check(&self, source: &LeanSource) -> Vec<LintIssue> {
        let Some(n) = step_number(&self.step_id) else {
            return Vec::new();
        };
        let decls = step_decls(source.raw());
        if decls.contains(&n) {
            Vec::new()
        } else {
            let found: Vec<String> = decls.iter().map(|m| format!("S{}", m)).collect();
            vec![LintIssue::new(
                codes::MISSING_STEP_DECL,
                format!(
                    "step {} must declare `theorem/lemma {}` (found: [{}])",
                    self.step_id,
                    self.step_id,
                    found.join(", ")
                ),
            )]
        }
    }
}

/// Strict-mode rule: the file must import the Mathlib domain library, and
/// must not re-define Mathlib's `Matrix` or carry placeholder marker text.
///
/// Redefining core library types locally lets a file "prove" statements
/// about stub semantics, which is exactly the cheat this gate exists for.
pub struct MathlibStrictRule {
    import_re: Regex,
    matrix_re: Regex,
    placeholder_re: Regex,
}

impl MathlibStrictRule {
    pub fn new() -> Self {
        Self {
            import_re: Regex::new(r"(?m)^\s*import\s+Mathlib(\.|\s|$)")
                .expect("valid mathlib import regex"),
            matrix_re: Regex::new(r"(?m)^\s*(?:def|structure|inductive|abbrev)\s+Matrix\b")
                .expect("valid matrix definition regex"),
            placeholder_re: Regex::new(r"(?i)placeholder").expect("valid placeholder regex"),
        }
    }
}

impl Default for MathlibStrictRule {
    fn default() -> Self {
        Self::new()
    }
}

impl LintRule for MathlibStrictRule {
    fn name(&self) -> &'static str {
        "mathlib-strict"
    }

    fn check(&self, source: &LeanSource) -> Vec<LintIssue> {
        let mut issues = Vec::new();
        if !self.import_re.is_match(source.stripped()) {
            issues.push(LintIssue::new(
                codes::MATHLIB_REQUIRED,
                "strict mode requires `import Mathlib` (or `import Mathlib.<...>`) at top of file",
            ));
        }
        if self.matrix_re.is_match(source.stripped()) {
            issues.push(LintIssue::new(
                codes::FORBIDDEN_LOCAL_MATRIX_DEF,
                "do not define a local `Matrix` in strict mode; use Mathlib's `Matrix`",
            ));
        }
        if self.placeholder_re.is_match(source.raw()) {
            issues.push(LintIssue::new(
                codes::FORBIDDEN_PLACEHOLDER_MARKER,
                "found 'placeholder' marker text; make the model explicit in strict mode",
            ));
        }
        issues
    }
}

/// Requires at least `min_steps` exactly-named `S<n>` declarations.
pub struct StepCountRule {
    min_steps: usize,
}

impl StepCountRule {
    pub fn new(min_steps: usize) -> Self {
        Self { min_steps }
    }
}

impl LintRule for StepCountRule {
    fn name(&self) -> &'static str {
        "step-count"
    }

    fn check(&self, source: &LeanSource) -> Vec<LintIssue> {
        let count = step_decls(source.raw()).len();
        if count < self.min_steps {
            vec![LintIssue::new(
                codes::LEAN_STEPS_TOO_FEW,
                format!(
                    "only {} step theorem(s)/lemma(s) found (S<n>); require >= {}",
                    count, self.min_steps
                ),
            )]
        } else {
            Vec::new()
        }
    }
}

/// Requires the step-map marker and at least `min_steps` map lines.
pub struct StepMapRule {
    min_steps: usize,
}

impl StepMapRule {
    pub fn new(min_steps: usize) -> Self {
        Self { min_steps }
    }
}

impl LintRule for StepMapRule {
    fn name(&self) -> &'static str {
        "step-map"
    }

    fn check(&self, source: &LeanSource) -> Vec<LintIssue> {
        let mut issues = Vec::new();
        if !source.raw().contains(STEP_MAP_MARKER) {
            issues.push(LintIssue::new(
                codes::MISSING_STEP_MAP_HEADER,
                format!("missing '-- {}' header in Lean file", STEP_MAP_MARKER),
            ));
        }
        let map = step_map_numbers(source.raw());
        if map.len() < self.min_steps {
            issues.push(LintIssue::new(
                codes::STEP_MAP_TOO_FEW,
                format!(
                    "only {} step-map line(s) found ('-- S<n>: ...'); require >= {}",
                    map.len(),
                    self.min_steps
                ),
            ));
        }
        issues
    }
}

/// Requires local domain vocabulary and step/domain linkage.
///
/// Every `S<n>` declaration header must mention at least one identifier
/// defined in this file — or, in strict mode, the `Matrix` library anchor —
/// which discourages proving an unrelated trivial lemma and calling it done.
pub struct DomainDefsRule {
    /// In strict mode, Mathlib anchors count as domain vocabulary.
    allow_library_anchors: bool,
}

impl DomainDefsRule {
    /// Library identifiers accepted as domain anchors in strict mode.
    const LIBRARY_ANCHORS: [&'static str; 1] = ["Matrix"];
    const HEADER_MAX_CHARS: usize = 2000;

    pub fn new(allow_library_anchors: bool) -> Self {
        Self {
            allow_library_anchors,
        }
    }
}

impl LintRule for DomainDefsRule {
    fn name(&self) -> &'static str {
        "domain-defs"
    }

    fn check(&self, source: &LeanSource) -> Vec<LintIssue> {
        let decls = definition_decls(source.raw());
        if decls.is_empty() {
            return vec![LintIssue::new(
                codes::MISSING_DOMAIN_DEFS,
                "no local definitions found (def/structure/inductive/abbrev); \
                 add minimal domain definitions and prove steps against them",
            )];
        }

        let mut names: BTreeSet<String> = decls.into_iter().map(|(_, name)| name).collect();
        if self.allow_library_anchors {
            names.extend(Self::LIBRARY_ANCHORS.iter().map(|s| (*s).to_string()));
        }

        let mut issues = Vec::new();
        for (step, header) in step_header_chunks(source.raw(), Self::HEADER_MAX_CHARS) {
            if !names.iter().any(|name| mentions_identifier(&header, name)) {
                issues.push(LintIssue::new(
                    codes::STEP_DOES_NOT_REFERENCE_DOMAIN,
                    format!(
                        "S{} does not reference any domain definition from this file; \
                         keep steps about your domain, not unrelated lemmas",
                        step
                    ),
                ));
            }
        }
        issues
    }
}

/// Cross-checks the Lean file against the narrative document: every step the
/// narrative cites as `(S<n>)` must have a declaration and, when the step
/// map is required, a map line.
pub struct MarkdownCoverageRule {
    markdown: String,
    require_step_map: bool,
}

impl MarkdownCoverageRule {
    pub fn new(markdown: impl Into<String>, require_step_map: bool) -> Self {
        Self {
            markdown: markdown.into(),
            require_step_map,
        }
    }

    fn missing(expected: &BTreeSet<u32>, got: &BTreeSet<u32>) -> Vec<u32> {
        expected.iter().copied().filter(|n| !got.contains(n)).collect()
    }

    fn format_steps(steps: &[u32]) -> String {
        steps
            .iter()
            .map(|n| format!("S{}", n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl LintRule for MarkdownCoverageRule {
    fn name(&self) -> &'static str {
        "markdown-coverage"
    }

    fn check(&self, source: &LeanSource) -> Vec<LintIssue> {
        let md_steps = markdown_step_refs(&self.markdown);
        if md_steps.is_empty() {
            return Vec::new();
        }

        let mut issues = Vec::new();
        let lean_steps = step_decls(source.raw());
        let missing_decls = Self::missing(&md_steps, &lean_steps);
        if !missing_decls.is_empty() {
            issues.push(LintIssue::new(
                codes::LEAN_MISSING_STEPS_FOR_MD,
                format!(
                    "Lean file is missing step(s) required by the narrative: {}",
                    Self::format_steps(&missing_decls)
                ),
            ));
        }

        if self.require_step_map {
            let map = step_map_numbers(source.raw());
            let missing_map = Self::missing(&md_steps, &map);
            if !missing_map.is_empty() {
                issues.push(LintIssue::new(
                    codes::STEP_MAP_MISSING_FOR_MD,
                    format!(
                        "step-map is missing step(s) required by the narrative: {}",
                        Self::format_steps(&missing_map)
                    ),
                ));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(rule: &dyn LintRule, text: &str) -> Vec<LintIssue> {
        rule.check(&LeanSource::new(text))
    }

    #[test]
    fn forbidden_decl_fires_on_axiom_constant_opaque() {
        let rule = ForbiddenDeclRule::new();
        for keyword in ["axiom", "constant", "opaque"] {
            let text = format!("{} bad : False\ntheorem S1 : True := trivial\n", keyword);
            let issues = check(&rule, &text);
            assert_eq!(issues.len(), 1, "{} should be rejected", keyword);
            assert_eq!(issues[0].code, codes::FORBIDDEN_DECL);
        }
    }

    #[test]
    fn forbidden_decl_ignores_commented_and_inline_mentions() {
        let rule = ForbiddenDeclRule::new();
        assert!(check(&rule, "-- axiom of choice is discussed here\n").is_empty());
        assert!(check(&rule, "theorem S1 : axioms_are_fine := trivial\n").is_empty());
    }

    #[test]
    fn marker_rule_fires_outside_comments_only() {
        let rule = ForbiddenMarkerRule::new();
        let issues = check(&rule, "theorem S1 : True := sorry\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::FORBIDDEN_SORRY);

        assert!(check(&rule, "-- sorry, this comment explains the proof\n").is_empty());
        assert!(check(&rule, "/- admit nothing -/\ntheorem S1 : True := trivial\n").is_empty());

        // Identifiers containing the word are fine.
        assert!(check(&rule, "def sorrylike := 1\n").is_empty());
    }

    #[test]
    fn marker_rule_reports_both_markers() {
        let rule = ForbiddenMarkerRule::new();
        let issues = check(&rule, "theorem a : True := sorry\nexample : True := by admit\n");
        let codes_found: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes_found,
            vec![codes::FORBIDDEN_SORRY, codes::FORBIDDEN_ADMIT]
        );
    }

    #[test]
    fn traceability_requires_exact_declaration() {
        let rule = TraceabilityRule::new("S1");
        assert!(check(&rule, "theorem S1 : True := trivial\n").is_empty());
        assert!(check(&rule, "lemma S1 : True := trivial\n").is_empty());

        let issues = check(&rule, "theorem S1_helper : True := trivial\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::MISSING_STEP_DECL);
    }

    #[test]
    fn traceability_skips_non_canonical_ids() {
        let rule = TraceabilityRule::new("warmup");
        assert!(check(&rule, "theorem whatever : True := trivial\n").is_empty());
    }

    #[test]
    fn mathlib_rule_requires_import_and_forbids_stubs() {
        let rule = MathlibStrictRule::new();

        let ok = "import Mathlib\ntheorem S1 : True := trivial\n";
        assert!(check(&rule, ok).is_empty());

        let ok_scoped = "import Mathlib.Data.Matrix.Basic\ntheorem S1 : True := trivial\n";
        assert!(check(&rule, ok_scoped).is_empty());

        let issues = check(&rule, "theorem S1 : True := trivial\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::MATHLIB_REQUIRED);

        let issues = check(&rule, "import Mathlib\ndef Matrix := Nat\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::FORBIDDEN_LOCAL_MATRIX_DEF);

        let issues = check(&rule, "import Mathlib\n-- PLACEHOLDER: fill in\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::FORBIDDEN_PLACEHOLDER_MARKER);
    }

    #[test]
    fn step_count_rule_counts_exact_names_only() {
        let rule = StepCountRule::new(2);
        let text = "theorem S1 : True := trivial\ntheorem S2_extra : True := trivial\n";
        let issues = check(&rule, text);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::LEAN_STEPS_TOO_FEW);
        assert!(issues[0].message.contains("only 1"));
    }

    #[test]
    fn step_map_rule_requires_header_and_lines() {
        let rule = StepMapRule::new(2);
        let good = format!("-- {}\n-- S1: a\n-- S2: b\n", crate::STEP_MAP_MARKER);
        assert!(check(&rule, &good).is_empty());

        let issues = check(&rule, "-- S1: a\n");
        let codes_found: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes_found,
            vec![codes::MISSING_STEP_MAP_HEADER, codes::STEP_MAP_TOO_FEW]
        );
    }

    #[test]
    fn domain_rule_requires_definitions() {
        let rule = DomainDefsRule::new(false);
        let issues = check(&rule, "theorem S1 : 1 + 1 = 2 := rfl\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::MISSING_DOMAIN_DEFS);
    }

    #[test]
    fn domain_rule_requires_steps_to_reference_vocabulary() {
        let rule = DomainDefsRule::new(false);
        let linked = "def walkCount (n : Nat) : Nat := 3 ^ n\ntheorem S1 : walkCount 3 = 27 := by decide\n";
        assert!(check(&rule, linked).is_empty());

        let unlinked = "def walkCount (n : Nat) : Nat := 3 ^ n\ntheorem S1 : 1 + 1 = 2 := rfl\n";
        let issues = check(&rule, unlinked);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::STEP_DOES_NOT_REFERENCE_DOMAIN);
    }

    #[test]
    fn domain_rule_accepts_library_anchor_in_strict_mode() {
        let text = "def helper := 1\ntheorem S1 (A : Matrix n n ℝ) : A = A := rfl\n";
        let strict = DomainDefsRule::new(true);
        assert!(check(&strict, text).is_empty());

        let lax = DomainDefsRule::new(false);
        assert_eq!(check(&lax, text).len(), 1);
    }

    #[test]
    fn markdown_rule_checks_declaration_and_map_coverage() {
        let md = "We expand (S1) and then bound the error (S2).";
        let rule = MarkdownCoverageRule::new(md, true);

        let complete = format!(
            "-- {}\n-- S1: a\n-- S2: b\ntheorem S1 : True := trivial\ntheorem S2 : True := trivial\n",
            crate::STEP_MAP_MARKER
        );
        assert!(check(&rule, &complete).is_empty());

        let missing_s2 = "-- S1: a\ntheorem S1 : True := trivial\n";
        let issues = check(&rule, missing_s2);
        let codes_found: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes_found,
            vec![codes::LEAN_MISSING_STEPS_FOR_MD, codes::STEP_MAP_MISSING_FOR_MD]
        );
        assert!(issues[0].message.contains("S2"));
    }

    #[test]
    fn markdown_rule_is_silent_without_step_refs() {
        let rule = MarkdownCoverageRule::new("no step references here", true);
        assert!(check(&rule, "theorem unrelated : True := trivial\n").is_empty());
    }
}
