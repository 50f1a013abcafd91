// passes/balanced.rs — Remove the Nth balanced delimiter group
//
// Plain args (`curly`, `parens`, `square`, `angles`) delete the whole
// group including its delimiters; `-inside` variants empty the group but
// keep the delimiters.

use std::path::Path;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};
use crate::passes::nth_balanced_group;

pub struct BalancedPass;

fn delimiters(arg: &str) -> Option<(u8, u8, bool)> {
    match arg {
        "curly" => Some((b'{', b'}', false)),
        "curly-inside" => Some((b'{', b'}', true)),
        "parens" => Some((b'(', b')', false)),
        "parens-inside" => Some((b'(', b')', true)),
        "square" => Some((b'[', b']', false)),
        "angles" => Some((b'<', b'>', false)),
        _ => None,
    }
}

impl DeltaPass for BalancedPass {
    fn name(&self) -> &'static str {
        "balanced"
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
        let Some((open, close, inside_only)) = delimiters(arg) else {
            return (TransformResult::Error, state.clone());
        };
        let Ok(content) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };

        let mut ordinal = state.cursor();
        loop {
            let Some((start, end)) = nth_balanced_group(&content, ordinal, open, close) else {
                return (TransformResult::Stop, PassState::Cursor(ordinal));
            };

            // An `-inside` variant of an already-empty group changes
            // nothing; move on to the next group.
            if inside_only && end == start + 1 {
                ordinal += 1;
                continue;
            }

            let mut variant = String::with_capacity(content.len());
            if inside_only {
                variant.push_str(&content[..start + 1]);
                variant.push_str(&content[end..]);
            } else {
                variant.push_str(&content[..start]);
                variant.push_str(&content[end + 1..]);
            }

            if write_candidate(test_case, &variant).is_err() {
                return (TransformResult::Error, state.clone());
            }
            return (TransformResult::Ok, PassState::Cursor(ordinal));
        }
    }
}
