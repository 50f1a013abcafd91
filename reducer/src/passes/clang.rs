// passes/clang.rs — One clang_delta transformation instance per candidate
//
// The arg names a clang_delta transformation; the cursor is its 1-based
// instance counter. Exit 0 yields the variant on stdout, exit 1 means the
// counter ran past the last instance, anything else is a pass bug.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::pass::{tool_on_path, write_candidate, DeltaPass, PassState, TransformResult};

pub struct ClangPass;

impl DeltaPass for ClangPass {
    fn name(&self) -> &'static str {
        "clang"
    }

    fn check_prerequisites(&self) -> bool {
        tool_on_path("clang_delta")
    }

    fn new(&self, _test_case: &Path, _arg: &str) -> PassState {
        // clang_delta counters are 1-based.
        PassState::Cursor(1)
    }

    fn transform(
        &self,
        test_case: &Path,
        arg: &str,
        state: &PassState,
    ) -> (TransformResult, PassState) {
        let output = Command::new("clang_delta")
            .arg(format!("--transformation={}", arg))
            .arg(format!("--counter={}", state.cursor()))
            .arg(test_case)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        let Ok(output) = output else {
            return (TransformResult::Error, state.clone());
        };

        match output.status.code() {
            Some(0) => {
                let variant = String::from_utf8_lossy(&output.stdout);
                if write_candidate(test_case, &variant).is_err() {
                    return (TransformResult::Error, state.clone());
                }
                (TransformResult::Ok, state.clone())
            }
            Some(1) => (TransformResult::Stop, state.clone()),
            _ => (TransformResult::Error, state.clone()),
        }
    }
}
