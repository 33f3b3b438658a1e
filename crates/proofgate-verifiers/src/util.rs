//! Utility functions shared across verifier adapters

use std::path::PathBuf;

/// Expands `~` to the user's home directory in paths.
///
/// Absolute and relative paths are returned unchanged; only a leading `~/`
/// is rewritten.
#[must_use]
pub fn expand_home_dir(path: &str) -> Option<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir().map(|home| home.join(rest))
    } else {
        Some(PathBuf::from(path))
    }
}

/// Split a command string like `lake env lean` into program and arguments.
///
/// Whitespace splitting only; configured commands here are tool invocations,
/// not shell pipelines, so no quoting support is needed.
#[must_use]
pub fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Scan stdout bottom-up for the last line that parses as JSON.
///
/// Verifier templates print their structured verdict last; anything above it
/// (progress chatter, warnings) is ignored.
#[must_use]
pub fn extract_trailing_json(stdout: &str) -> Option<serde_json::Value> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| serde_json::from_str(line).ok())
}

// ============================================================================
// Kani proofs
// ============================================================================

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Verify split_command separates program from arguments
    #[kani::proof]
    fn proof_split_command_basic() {
        let (program, args) = split_command("lake env lean").unwrap();
        kani::assert(program == "lake", "Program should be lake");
        kani::assert(args.len() == 2, "Should have two arguments");
    }

    /// Verify split_command rejects empty input
    #[kani::proof]
    fn proof_split_command_empty() {
        kani::assert(split_command("").is_none(), "Empty command should fail");
        kani::assert(split_command("   ").is_none(), "Blank command should fail");
    }

    /// Verify expand_home_dir leaves absolute paths unchanged
    #[kani::proof]
    fn proof_expand_home_dir_absolute() {
        let result = expand_home_dir("/usr/bin/lake");
        kani::assert(result.is_some(), "Absolute paths should return Some");
    }
}
