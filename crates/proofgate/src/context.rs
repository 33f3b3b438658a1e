//! Run-scoped state: the run directory and the ephemeral Lean workspace
//!
//! A [`RunContext`] is created once per audit invocation and passed
//! explicitly through the pipeline. There is no process-wide "current run"
//! state, so repeated runs in one process (or in a test suite) can never
//! leak artifacts into each other.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

/// Per-run directory layout. Derived artifact paths all hang off the run
/// directory unless explicitly overridden in the pipeline configuration.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_dir: PathBuf,
}

impl RunContext {
    /// Wrap an existing run directory.
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    /// Create the run directory (and parents) and wrap it.
    pub fn create(run_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let run_dir = run_dir.into();
        std::fs::create_dir_all(&run_dir)?;
        Ok(Self { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Resolve a path against the run directory; absolute paths pass
    /// through unchanged.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        let rel = rel.as_ref();
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.run_dir.join(rel)
        }
    }

    /// Default location of the solution document.
    pub fn solution_path(&self) -> PathBuf {
        self.run_dir.join("audit").join("Solution.md")
    }

    /// Default location of the synthesized reverse-gate file.
    pub fn gate_path(&self) -> PathBuf {
        self.run_dir.join("audit").join("reverse_gate.lean")
    }
}

/// Directory entries never copied into an ephemeral workspace.
const SKIP_DIRS: [&str; 4] = ["build", "lake-packages", ".lake", "__pycache__"];

/// An ephemeral copy of a Lean project for gate compilation.
///
/// Compiling the gate file inside a copy keeps generated artifacts out of
/// the real project. The temp directory is owned by this value and removed
/// on drop, on every exit path.
pub struct EphemeralWorkspace {
    _temp: TempDir,
    project_dir: PathBuf,
}

impl EphemeralWorkspace {
    /// Copy `source` into a fresh temp directory, skipping build output,
    /// fetched packages, compiled oleans and VCS metadata.
    pub fn clone_project(source: &Path) -> io::Result<Self> {
        let temp = TempDir::new()?;
        let project_dir = temp.path().join("proj");

        for entry in WalkDir::new(source)
            .into_iter()
            .filter_entry(|e| !Self::skip(e.file_name().to_string_lossy().as_ref()))
        {
            let entry = entry.map_err(io::Error::other)?;
            let rel = entry
                .path()
                .strip_prefix(source)
                .map_err(io::Error::other)?;
            let dest = project_dir.join(rel);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest)?;
            } else if entry.file_type().is_file() {
                if entry.path().extension().is_some_and(|ext| ext == "olean") {
                    continue;
                }
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(entry.path(), &dest)?;
            }
        }

        debug!(
            source = %source.display(),
            workspace = %project_dir.display(),
            "created ephemeral workspace"
        );
        Ok(Self {
            _temp: temp,
            project_dir,
        })
    }

    fn skip(name: &str) -> bool {
        SKIP_DIRS.contains(&name) || name.starts_with(".git")
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}
