// passes/blank.rs — Blank-line and preprocessor-line removal
//
// Two cursor steps: strip all blank lines, then strip all lines whose
// first non-space character is `#`. Steps that change nothing are skipped.

use std::path::Path;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};

pub struct BlankPass;

fn apply_step(content: &str, step: usize) -> Option<String> {
    let keep = |line: &&str| match step {
        0 => !line.trim().is_empty(),
        1 => !line.trim_start().starts_with('#'),
        _ => true,
    };
    if step > 1 {
        return None;
    }
    let variant: String = content.split_inclusive('\n').filter(keep).collect();
    Some(variant)
}

impl DeltaPass for BlankPass {
    fn name(&self) -> &'static str {
        "blank"
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
        while let Some(variant) = apply_step(&content, step) {
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
