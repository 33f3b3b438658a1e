//! Lean source text with precomputed views and extraction helpers

use proofgate_steps::step_number;
use regex::Regex;
use std::collections::BTreeSet;

/// A Lean source with its comment-stripped view computed once.
///
/// Marker rules (`sorry`/`admit`) must never fire on explanatory text, so
/// they scan the stripped view; structural rules that care about comment
/// lines (the step map) scan the raw text.
pub struct LeanSource {
    raw: String,
    stripped: String,
}

impl LeanSource {
    pub fn new(text: impl Into<String>) -> Self {
        let raw = text.into();
        let stripped = strip_comments(&raw);
        Self { raw, stripped }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The source with block and line comments removed.
    pub fn stripped(&self) -> &str {
        &self.stripped
    }
}

/// Best-effort removal of Lean comments (`/- ... -/` blocks, `--` lines).
///
/// Nested block comments are not tracked; the outermost open/close pair is
/// enough for lint purposes.
pub fn strip_comments(text: &str) -> String {
    let block = Regex::new(r"(?s)/-.*?-/").expect("valid block comment regex");
    let line = Regex::new(r"(?m)--.*$").expect("valid line comment regex");
    let no_blocks = block.replace_all(text, "");
    line.replace_all(&no_blocks, "").into_owned()
}

/// Step numbers with a top-level `theorem`/`lemma` declaration named exactly
/// `S<n>`.
///
/// The regex captures the whole identifier after the keyword; anything that
/// is not exactly `S<n>` (`S1_helper`, `S1'`) is discarded, which is what
/// keeps the step-to-theorem mapping unambiguous.
pub fn step_decls(text: &str) -> BTreeSet<u32> {
    decl_idents(text)
        .into_iter()
        .filter_map(|ident| step_number(&ident))
        .collect()
}

/// All identifiers declared by top-level `theorem`/`lemma` keywords.
pub fn decl_idents(text: &str) -> Vec<String> {
    let re = Regex::new(r"(?m)^\s*(?:theorem|lemma)\s+([A-Za-z_][A-Za-z0-9_']*)")
        .expect("valid declaration regex");
    re.captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// `(kind, name)` pairs for local definitions
/// (`def`/`structure`/`inductive`/`abbrev`).
pub fn definition_decls(text: &str) -> Vec<(String, String)> {
    let re = Regex::new(r"(?m)^\s*(def|structure|inductive|abbrev)\s+([A-Za-z_][A-Za-z0-9_']*)")
        .expect("valid definition regex");
    re.captures_iter(text)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// Step numbers listed in `-- S<n>: ...` map lines.
pub fn step_map_numbers(text: &str) -> BTreeSet<u32> {
    let re = Regex::new(r"(?m)^\s*--\s*S(\d+)\s*:").expect("valid step map regex");
    re.captures_iter(text)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

/// Step numbers referenced from a narrative document via `(S<n>)`.
pub fn markdown_step_refs(md: &str) -> BTreeSet<u32> {
    let re = Regex::new(r"\(\s*S(\d+)\s*\)").expect("valid markdown step regex");
    re.captures_iter(md)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

/// Header chunk for each `S<n>` declaration: from the keyword up to the
/// `:=` that starts the proof (capped at `max_chars`).
///
/// Working on a multi-line chunk avoids false negatives when a statement's
/// type is formatted across lines, which is common for long binders.
pub fn step_header_chunks(text: &str, max_chars: usize) -> Vec<(u32, String)> {
    let re = Regex::new(r"(?m)^\s*(?:theorem|lemma)\s+([A-Za-z_][A-Za-z0-9_']*)")
        .expect("valid declaration regex");
    let mut out = Vec::new();
    for caps in re.captures_iter(text) {
        let Some(step) = step_number(&caps[1]) else {
            continue;
        };
        let whole = caps.get(0).expect("capture 0 always present");
        let start = whole.start();
        let mut cap_end = text.len().min(start + max_chars);
        while !text.is_char_boundary(cap_end) {
            cap_end -= 1;
        }
        let end = match text[whole.end()..].find(":=") {
            Some(offset) => (whole.end() + offset).min(cap_end),
            None => cap_end,
        };
        out.push((step, text[start..end].to_string()));
    }
    out
}

/// Whole-word identifier search; `'` counts as an identifier character so
/// `Grid'` does not satisfy a reference to `Grid`.
pub fn mentions_identifier(haystack: &str, name: &str) -> bool {
    let pattern = format!(
        "(^|[^A-Za-z0-9_']){}($|[^A-Za-z0-9_'])",
        regex::escape(name)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}
