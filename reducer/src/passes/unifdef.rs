// passes/unifdef.rs — Strip preprocessor conditionals with unifdef(1)
//
// Single candidate: `unifdef -B -x 2` over the file. Stop once the output
// settles.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::pass::{
    read_candidate, tool_on_path, write_candidate, DeltaPass, PassState, TransformResult,
};

pub struct UnifdefPass;

impl DeltaPass for UnifdefPass {
    fn name(&self) -> &'static str {
        "unifdef"
    }

    fn check_prerequisites(&self) -> bool {
        tool_on_path("unifdef")
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
        if state.cursor() > 0 {
            return (TransformResult::Stop, state.clone());
        }
        let Ok(old) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };

        let output = Command::new("unifdef")
            .args(["-B", "-x", "2"])
            .arg(test_case)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        let Ok(output) = output else {
            return (TransformResult::Error, state.clone());
        };

        let new = String::from_utf8_lossy(&output.stdout);
        if new.is_empty() || new == old {
            return (TransformResult::Stop, state.clone());
        }
        if write_candidate(test_case, &new).is_err() {
            return (TransformResult::Error, state.clone());
        }
        (TransformResult::Ok, state.clone())
    }
}
