// sandbox.rs — Per-variant working directories
//
// Each speculative candidate lives in its own freshly created temporary
// directory holding copies of every test case. Exactly one worker writes
// into a sandbox; the real test cases are only ever touched by the
// manager's atomic commit.

use std::path::{Path, PathBuf};

/// A variant's private directory. Dropped sandboxes are deleted unless the
/// run asked for them to be kept (`--save-temps`).
pub struct Sandbox {
    dir: PathBuf,
    temp: Option<tempfile::TempDir>,
}

impl Sandbox {
    /// Create a fresh sandbox containing a copy of every test case.
    pub fn create(test_cases: &[PathBuf], keep: bool) -> std::io::Result<Sandbox> {
        let temp = tempfile::Builder::new().prefix("tcr-").tempdir()?;
        for case in test_cases {
            let name = case.file_name().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("test case has no file name: {}", case.display()),
                )
            })?;
            std::fs::copy(case, temp.path().join(name))?;
        }

        if keep {
            // The directory outlives the run for post-mortem inspection.
            let dir = temp.keep();
            Ok(Sandbox { dir, temp: None })
        } else {
            Ok(Sandbox {
                dir: temp.path().to_path_buf(),
                temp: Some(temp),
            })
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The sandboxed copy of `test_case`.
    pub fn path_of(&self, test_case: &Path) -> PathBuf {
        match test_case.file_name() {
            Some(name) => self.dir.join(name),
            None => self.dir.clone(),
        }
    }

    /// Copy every file in the sandbox to `dest` (creating it), for
    /// also-interesting side saves.
    pub fn save_to(&self, dest: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dest)?;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                std::fs::copy(entry.path(), dest.join(entry.file_name()))?;
            }
        }
        Ok(())
    }
}

/// Atomically replace `dest` with the contents of `src`. The temp file is
/// written next to `dest` so the final rename never crosses filesystems:
/// observers see either the old bytes or the new bytes, nothing partial.
pub fn commit_file(src: &Path, dest: &Path) -> std::io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::fs::copy(src, tmp.path())?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────
