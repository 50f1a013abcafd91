// passes/lines.rs — Chunk-halving line removal
//
// The first candidate reflows the file so that content nested deeper than
// the pass argument joins onto one line (newlines inside braces become
// spaces); every later candidate deletes a window of lines. The window
// starts at the whole file and halves whenever it runs off the end, down
// to single lines.

use std::path::Path;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};

pub struct LinesPass;

impl LinesPass {
    fn depth(arg: &str) -> Option<usize> {
        arg.parse().ok()
    }
}

/// Newlines at brace depth greater than `depth` become spaces. Never adds
/// characters, so the reflowed file is the same size or smaller.
fn flatten(content: &str, depth: usize) -> String {
    let mut out = String::with_capacity(content.len());
    let mut level = 0usize;
    for c in content.chars() {
        match c {
            '{' => {
                level += 1;
                out.push(c);
            }
            '}' => {
                level = level.saturating_sub(1);
                out.push(c);
            }
            '\n' if level > depth => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

fn chunk_transform(
    test_case: &Path,
    content: &str,
    index: usize,
    chunk: usize,
) -> (TransformResult, PassState) {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let mut index = index;
    let mut chunk = chunk.min(lines.len());

    loop {
        if chunk == 0 {
            return (
                TransformResult::Stop,
                PassState::Chunk {
                    index,
                    chunk,
                    instances: lines.len(),
                },
            );
        }
        if index < lines.len() {
            let end = (index + chunk).min(lines.len());
            let mut variant = String::with_capacity(content.len());
            for (i, line) in lines.iter().enumerate() {
                if i < index || i >= end {
                    variant.push_str(line);
                }
            }
            let state = PassState::Chunk {
                index,
                chunk,
                instances: lines.len(),
            };
            if write_candidate(test_case, &variant).is_err() {
                return (TransformResult::Error, state);
            }
            return (TransformResult::Ok, state);
        }
        // Window ran off the end: halve it and restart from the top.
        if chunk == 1 {
            return (
                TransformResult::Stop,
                PassState::Chunk {
                    index,
                    chunk,
                    instances: lines.len(),
                },
            );
        }
        chunk /= 2;
        index = 0;
    }
}

impl DeltaPass for LinesPass {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn new(&self, _test_case: &Path, _arg: &str) -> PassState {
        PassState::Unprimed
    }

    fn transform(
        &self,
        test_case: &Path,
        arg: &str,
        state: &PassState,
    ) -> (TransformResult, PassState) {
        let Some(depth) = Self::depth(arg) else {
            return (TransformResult::Error, state.clone());
        };
        let Ok(content) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };

        match state {
            PassState::Unprimed => {
                let flat = flatten(&content, depth);
                if flat != content {
                    if write_candidate(test_case, &flat).is_err() {
                        return (TransformResult::Error, state.clone());
                    }
                    return (TransformResult::Ok, PassState::Unprimed);
                }
                // Already flat: go straight to chunked deletion.
                let count = content.split_inclusive('\n').count();
                chunk_transform(test_case, &content, 0, count)
            }
            PassState::Chunk { index, chunk, .. } => {
                chunk_transform(test_case, &content, *index, *chunk)
            }
            PassState::Cursor(_) => (TransformResult::Error, state.clone()),
        }
    }

    fn advance(&self, test_case: &Path, _arg: &str, state: &PassState) -> PassState {
        match state {
            // The reflow candidate was rejected: prime the window from the
            // candidate's line count (clamped again at the next transform).
            PassState::Unprimed => {
                let count = read_candidate(test_case)
                    .map(|c| c.split_inclusive('\n').count())
                    .unwrap_or(0);
                PassState::Chunk {
                    index: 0,
                    chunk: count,
                    instances: count,
                }
            }
            PassState::Chunk {
                index,
                chunk,
                instances,
            } => PassState::Chunk {
                index: index + (*chunk).max(1),
                chunk: *chunk,
                instances: *instances,
            },
            PassState::Cursor(n) => PassState::Cursor(n + 1),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn case(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.c");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn flatten_joins_nested_lines_only() {
        let src = "int f() {\n  int x;\n  return x;\n}\nint y;\n";
        assert_eq!(flatten(src, 0), "int f() {   int x;   return x; }\nint y;\n");
        assert_eq!(flatten(src, 1), src);
    }

    #[test]
    fn first_candidate_is_the_reflow() {
        let (_dir, path) = case("int f() {\n  return 0;\n}\n");
        let pass = LinesPass;
        let state = pass.new(&path, "0");
        let (result, state) = pass.transform(&path, "0", &state);
        assert_eq!(result, TransformResult::Ok);
        assert_eq!(state, PassState::Unprimed);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "int f() {   return 0; }\n"
        );
    }

    #[test]
    fn whole_file_window_comes_first() {
        let (_dir, path) = case("a;\nb;\nc;\nd;\n");
        let pass = LinesPass;
        let state = pass.new(&path, "0");
        // Already flat, so the first candidate deletes every line.
        let (result, state) = pass.transform(&path, "0", &state);
        assert_eq!(result, TransformResult::Ok);
        assert_eq!(
            state,
            PassState::Chunk {
                index: 0,
                chunk: 4,
                instances: 4
            }
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn window_halves_after_running_off_the_end() {
        let (dir, path) = case("a;\nb;\nc;\nd;\n");
        let pass = LinesPass;
        let mut state = pass.new(&path, "0");
        let mut candidates = Vec::new();

        // Reject every candidate; the cursor must still terminate.
        for _ in 0..64 {
            // Fresh sandbox copy per candidate, as the manager provides.
            let fresh = dir.path().join("fresh.c");
            std::fs::copy(dir.path().join("case.c"), &fresh).unwrap();
            let (result, new_state) = pass.transform(&fresh, "0", &state);
            if result == TransformResult::Stop {
                break;
            }
            assert_eq!(result, TransformResult::Ok);
            candidates.push(std::fs::read_to_string(&fresh).unwrap());
            state = pass.advance(&fresh, "0", &new_state);
        }

        // 4-line window, then two 2-line windows, then four single lines.
        assert_eq!(
            candidates,
            vec![
                "",
                "c;\nd;\n",
                "a;\nb;\n",
                "b;\nc;\nd;\n",
                "a;\nc;\nd;\n",
                "a;\nb;\nd;\n",
                "a;\nb;\nc;\n",
            ]
        );
    }

    #[test]
    fn committed_deletion_keeps_the_window() {
        let (_dir, path) = case("a;\nb;\nc;\nd;\n");
        let pass = LinesPass;
        let state = PassState::Chunk {
            index: 1,
            chunk: 1,
            instances: 4,
        };
        let (result, state) = pass.transform(&path, "0", &state);
        assert_eq!(result, TransformResult::Ok);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a;\nc;\nd;\n");
        // After a commit the successors shift down into the same window.
        let next = pass.advance_on_success(&path, "0", &state);
        assert_eq!(
            next,
            PassState::Chunk {
                index: 1,
                chunk: 1,
                instances: 4
            }
        );
    }

    #[test]
    fn empty_file_stops_immediately() {
        let (_dir, path) = case("");
        let pass = LinesPass;
        let state = pass.new(&path, "0");
        let (result, _) = pass.transform(&path, "0", &state);
        assert_eq!(result, TransformResult::Stop);
    }
}
