// pass.rs — Delta-pass protocol: transform results, shrink cursors, file helpers
//
// Every pass implements `DeltaPass` over an opaque `PassState` cursor. The
// manager drives the cursor: `transform` writes one candidate variant in
// place, `advance` moves past a rejected candidate, `advance_on_success`
// repositions after a commit.
//
// Preconditions: `test_case` points at a regular file inside a sandbox.
// Postconditions: `Ok` implies the file content changed; `Stop` implies no
//   candidate is left for this cursor.
// Failure modes: `Error` (non-fatal pass bug, surfaced via statistics).
// Side effects: passes rewrite `test_case` only, never any other file.

use std::io::Write as _;
use std::path::Path;

// ── Transform result ─────────────────────────────────────────────────────

/// Outcome of a single `transform` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformResult {
    /// A candidate variant was written; the returned state describes it.
    Ok,
    /// The cursor is exhausted for this test case.
    Stop,
    /// The pass failed internally (tool crash, unreadable file).
    Error,
}

// ── Shrink cursor ────────────────────────────────────────────────────────

/// Pass-private shrink cursor. The shipped passes use three shapes: a plain
/// element index, a chunk-halving window, and an unprimed marker for passes
/// that discover their instance count on the first `transform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassState {
    /// Cursor over the Nth matching element.
    Cursor(usize),
    /// Chunk-halving cursor: try removing `chunk` elements at `index` out of
    /// `instances` total, halving `chunk` when the window runs off the end.
    Chunk {
        index: usize,
        chunk: usize,
        instances: usize,
    },
    /// Instance count not yet known; primed by the first `transform`.
    Unprimed,
}

impl PassState {
    /// The element index, for `Cursor` states.
    pub fn cursor(&self) -> usize {
        match self {
            PassState::Cursor(n) => *n,
            _ => 0,
        }
    }
}

// ── Pass protocol ────────────────────────────────────────────────────────

/// The contract every delta pass implements.
///
/// `transform` must be deterministic in `(file content, arg, state)`, and a
/// finite number of `advance` steps must reach a state from which
/// `transform` returns `Stop`.
pub trait DeltaPass: Send + Sync {
    fn name(&self) -> &'static str;

    /// Environmental readiness (external tools on PATH). Queried once per
    /// run; a missing prerequisite removes the pass from the group.
    fn check_prerequisites(&self) -> bool {
        true
    }

    /// Initialize the cursor for a test case and pass argument.
    fn new(&self, test_case: &Path, arg: &str) -> PassState;

    /// Write one candidate variant in place. Returns `Ok` iff the content
    /// actually changed, together with the state describing the candidate
    /// just written (not the next one to try).
    fn transform(
        &self,
        test_case: &Path,
        arg: &str,
        state: &PassState,
    ) -> (TransformResult, PassState);

    /// Move the cursor past a candidate that was tried and rejected.
    fn advance(&self, test_case: &Path, arg: &str, state: &PassState) -> PassState {
        let _ = (test_case, arg);
        match state {
            PassState::Cursor(n) => PassState::Cursor(n + 1),
            PassState::Chunk {
                index,
                chunk,
                instances,
            } => PassState::Chunk {
                index: *index + (*chunk).max(1),
                chunk: *chunk,
                instances: *instances,
            },
            PassState::Unprimed => PassState::Unprimed,
        }
    }

    /// Reposition the cursor after a commit. Deleting passes keep the index
    /// (successor elements shift down); chunk passes keep the window.
    fn advance_on_success(&self, test_case: &Path, arg: &str, state: &PassState) -> PassState {
        let _ = (test_case, arg);
        state.clone()
    }
}

// ── File helpers ─────────────────────────────────────────────────────────

/// Read the candidate file. Passes map failures to `TransformResult::Error`.
pub fn read_candidate(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}

/// Replace the candidate file atomically: the file either holds the new
/// variant entirely or is untouched.
pub fn write_candidate(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// True iff `tool` resolves to an executable on PATH.
pub fn tool_on_path(tool: &str) -> bool {
    which::which(tool).is_ok()
}

// ── Tests ────────────────────────────────────────────────────────────────
