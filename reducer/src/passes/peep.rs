// passes/peep.rs — Peephole token removal
//
// arg a: drop the Nth storage/qualifier keyword.
// arg b: collapse the Nth doubled semicolon.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};

pub struct PeepPass;

fn spec_for(arg: &str) -> Option<(&'static Regex, &'static str)> {
    static QUALIFIER: OnceLock<Regex> = OnceLock::new();
    static SEMI: OnceLock<Regex> = OnceLock::new();

    match arg {
        "a" => Some((
            QUALIFIER.get_or_init(|| {
                Regex::new(r"\b(static|inline|const|volatile|register|extern) ?").unwrap()
            }),
            "",
        )),
        "b" => Some((SEMI.get_or_init(|| Regex::new(r";[ \t]*;").unwrap()), ";")),
        _ => None,
    }
}

impl DeltaPass for PeepPass {
    fn name(&self) -> &'static str {
        "peep"
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
        let Some((re, replacement)) = spec_for(arg) else {
            return (TransformResult::Error, state.clone());
        };
        let Ok(content) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };

        let Some(m) = re.find_iter(&content).nth(state.cursor()) else {
            return (TransformResult::Stop, state.clone());
        };

        let mut variant = String::with_capacity(content.len());
        variant.push_str(&content[..m.start()]);
        variant.push_str(replacement);
        variant.push_str(&content[m.end()..]);

        if write_candidate(test_case, &variant).is_err() {
            return (TransformResult::Error, state.clone());
        }
        (TransformResult::Ok, state.clone())
    }
}
