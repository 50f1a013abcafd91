// passes/comments.rs — C comment removal
//
// Two cursor steps: all `/* */` blocks, then all `//` line comments.
// String literals are left untouched; a step that changes nothing is
// skipped.

use std::path::Path;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};

pub struct CommentsPass;

/// Remove block comments (step 0) or line comments (step 1), preserving
/// string-literal contents.
fn strip_comments(source: &str, block: bool) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < bytes.len() {
        if block && i + 1 < bytes.len() && bytes[i] == b'/' && bytes[i + 1] == b'*' {
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
        } else if !block && i + 1 < bytes.len() && bytes[i] == b'/' && bytes[i + 1] == b'/' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
        } else if bytes[i] == b'"' {
            out.push('"');
            i += 1;
            while i < bytes.len() && bytes[i] != b'"' {
                if bytes[i] == b'\\' && i + 1 < bytes.len() {
                    out.push(bytes[i] as char);
                    i += 1;
                }
                out.push(bytes[i] as char);
                i += 1;
            }
            if i < bytes.len() {
                out.push('"');
                i += 1;
            }
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }

    out
}

impl DeltaPass for CommentsPass {
    fn name(&self) -> &'static str {
        "comments"
    }

    fn new(&self, _test_case: &Path, _arg: &str) -> PassState {
        PassState::Cursor(0)
    }

    fn transform(
        &self,
        test_case: &Path,
        _arg: &str,
        state: &PassState,
    ) -> (TransformResult, PassState) {
        let Ok(content) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };

        let mut step = state.cursor();
        while step <= 1 {
            let variant = strip_comments(&content, step == 0);
            if variant != content {
                if write_candidate(test_case, &variant).is_err() {
                    return (TransformResult::Error, state.clone());
                }
                return (TransformResult::Ok, PassState::Cursor(step));
            }
            step += 1;
        }
        (TransformResult::Stop, PassState::Cursor(step))
    }
}
