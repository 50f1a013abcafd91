// passes/ints.rs — Integer-literal shrinking
//
// One rewrite family per arg, cursor over the Nth match:
//   a — drop u/U/l/L suffixes        b — hex literal to decimal
//   c — drop the leading digit       d — drop the trailing digit
//   e — replace the literal with 0

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};

pub struct IntsPass;

fn re_for(arg: &str) -> Option<&'static Regex> {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    static HEX: OnceLock<Regex> = OnceLock::new();
    static MULTI: OnceLock<Regex> = OnceLock::new();
    static NONZERO: OnceLock<Regex> = OnceLock::new();

    match arg {
        "a" => Some(SUFFIX.get_or_init(|| Regex::new(r"\b([0-9]+)[uUlL]+\b").unwrap())),
        "b" => Some(HEX.get_or_init(|| Regex::new(r"\b0[xX][0-9a-fA-F]+\b").unwrap())),
        "c" | "d" => Some(MULTI.get_or_init(|| Regex::new(r"\b[0-9]{2,}\b").unwrap())),
        "e" => Some(NONZERO.get_or_init(|| Regex::new(r"\b[1-9][0-9]*\b").unwrap())),
        _ => None,
    }
}

fn rewrite(arg: &str, matched: &str) -> Option<String> {
    match arg {
        "a" => Some(
            matched
                .trim_end_matches(|c| matches!(c, 'u' | 'U' | 'l' | 'L'))
                .to_string(),
        ),
        "b" => u128::from_str_radix(&matched[2..], 16)
            .ok()
            .map(|v| v.to_string()),
        "c" => Some(matched[1..].to_string()),
        "d" => Some(matched[..matched.len() - 1].to_string()),
        "e" => Some("0".to_string()),
        _ => None,
    }
}

impl DeltaPass for IntsPass {
    fn name(&self) -> &'static str {
        "ints"
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
        let Some(re) = re_for(arg) else {
            return (TransformResult::Error, state.clone());
        };
        let Ok(content) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };

        // Skip matches the rewrite cannot shrink (e.g. hex too wide for
        // u128), so the cursor stays aligned with attemptable candidates.
        let mut ordinal = state.cursor();
        loop {
            let Some(m) = re.find_iter(&content).nth(ordinal) else {
                return (TransformResult::Stop, PassState::Cursor(ordinal));
            };
            if let Some(replacement) = rewrite(arg, m.as_str()) {
                if replacement != m.as_str() {
                    let mut variant = String::with_capacity(content.len());
                    variant.push_str(&content[..m.start()]);
                    variant.push_str(&replacement);
                    variant.push_str(&content[m.end()..]);
                    if write_candidate(test_case, &variant).is_err() {
                        return (TransformResult::Error, state.clone());
                    }
                    return (TransformResult::Ok, PassState::Cursor(ordinal));
                }
            }
            ordinal += 1;
        }
    }
}
