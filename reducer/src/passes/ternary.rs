// passes/ternary.rs — Replace `a ? b : c` with one branch
//
// The arg selects the surviving branch (`b` or `c`). Operands are single
// tokens or balanced parenthesized groups, so nested ternaries reduce from
// the inside out across successive commits.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};

pub struct TernaryPass;

fn ternary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let atom = r"\([^()?:]*\)|[^\s?:;,(){}\[\]]+";
        Regex::new(&format!(
            r"(?P<a>{atom})\s*\?\s*(?P<b>{atom})\s*:\s*(?P<c>{atom})"
        ))
        .unwrap()
    })
}

impl DeltaPass for TernaryPass {
    fn name(&self) -> &'static str {
        "ternary"
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
        if arg != "b" && arg != "c" {
            return (TransformResult::Error, state.clone());
        }
        let Ok(content) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };

        let Some(m) = ternary_re().captures_iter(&content).nth(state.cursor()) else {
            return (TransformResult::Stop, state.clone());
        };

        let whole = m.get(0).unwrap();
        let branch = m.name(arg).unwrap().as_str();
        let mut variant = String::with_capacity(content.len());
        variant.push_str(&content[..whole.start()]);
        variant.push_str(branch);
        variant.push_str(&content[whole.end()..]);

        if write_candidate(test_case, &variant).is_err() {
            return (TransformResult::Error, state.clone());
        }
        (TransformResult::Ok, state.clone())
    }
}
