// passes/includes.rs — Remove the Nth `#include` line.

use std::path::Path;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};

pub struct IncludesPass;

impl DeltaPass for IncludesPass {
    fn name(&self) -> &'static str {
        "includes"
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

        let target = state.cursor();
        let mut seen = 0;
        let mut variant = String::with_capacity(content.len());
        let mut removed = false;

        for line in content.split_inclusive('\n') {
            let is_include = line.trim_start().starts_with("#include");
            if is_include && seen == target {
                removed = true;
                seen += 1;
                continue;
            }
            if is_include {
                seen += 1;
            }
            variant.push_str(line);
        }

        if !removed {
            return (TransformResult::Stop, state.clone());
        }
        if write_candidate(test_case, &variant).is_err() {
            return (TransformResult::Error, state.clone());
        }
        (TransformResult::Ok, state.clone())
    }
}
