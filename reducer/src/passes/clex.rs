// passes/clex.rs — Token-level mutations via clex(1)
//
// The arg is the clex command (rm-toks-N, rename-toks, delete-string, …)
// and the cursor its 0-based instance index. clex exits 51 when it wrote a
// variant to stdout and 71 when the index ran past the last instance.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::pass::{tool_on_path, write_candidate, DeltaPass, PassState, TransformResult};

pub struct ClexPass;

impl DeltaPass for ClexPass {
    fn name(&self) -> &'static str {
        "clex"
    }

    fn check_prerequisites(&self) -> bool {
        tool_on_path("clex")
    }

    fn new(&self, _test_case: &Path, _arg: &str) -> PassState {
        PassState::Cursor(0)
    }

    fn transform(
        &self,
        test_case: &Path,
        arg: &str,
        state: &PassState,
    ) -> (TransformResult, PassState) {
        let output = Command::new("clex")
            .arg(arg)
            .arg(state.cursor().to_string())
            .arg(test_case)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        let Ok(output) = output else {
            return (TransformResult::Error, state.clone());
        };

        match output.status.code() {
            Some(51) => {
                let variant = String::from_utf8_lossy(&output.stdout);
                if write_candidate(test_case, &variant).is_err() {
                    return (TransformResult::Error, state.clone());
                }
                (TransformResult::Ok, state.clone())
            }
            Some(71) => (TransformResult::Stop, state.clone()),
            _ => (TransformResult::Error, state.clone()),
        }
    }
}
