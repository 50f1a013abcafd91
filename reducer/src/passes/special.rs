// passes/special.rs — Attribute and string-literal rewrites
//
// arg a: remove the Nth `__attribute__((...))`.
// arg b: blank the Nth non-empty string literal (kept behind the sanitize
//        option in the catalogue).

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};
use crate::passes::extract_balanced;

pub struct SpecialPass;

fn string_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"\\]|\\.)+""#).unwrap())
}

fn remove_nth_attribute(content: &str, n: usize) -> Option<String> {
    let bytes = content.as_bytes();
    let keyword = "__attribute__";
    let mut seen = 0;
    let mut pos = 0;

    while let Some(found) = content[pos..].find(keyword) {
        let start = pos + found;
        let mut paren = start + keyword.len();
        while paren < bytes.len() && (bytes[paren] == b' ' || bytes[paren] == b'\t') {
            paren += 1;
        }
        if let Some(end) = extract_balanced(bytes, paren, b'(', b')') {
            if seen == n {
                let mut trailing = end + 1;
                if trailing < bytes.len() && bytes[trailing] == b' ' {
                    trailing += 1;
                }
                let mut variant = String::with_capacity(content.len());
                variant.push_str(&content[..start]);
                variant.push_str(&content[trailing..]);
                return Some(variant);
            }
            seen += 1;
            pos = end + 1;
        } else {
            pos = start + keyword.len();
        }
    }
    None
}

impl DeltaPass for SpecialPass {
    fn name(&self) -> &'static str {
        "special"
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
        let Ok(content) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };

        let variant = match arg {
            "a" => remove_nth_attribute(&content, state.cursor()),
            "b" => string_re()
                .find_iter(&content)
                .nth(state.cursor())
                .map(|m| {
                    let mut v = String::with_capacity(content.len());
                    v.push_str(&content[..m.start()]);
                    v.push_str("\"\"");
                    v.push_str(&content[m.end()..]);
                    v
                }),
            _ => return (TransformResult::Error, state.clone()),
        };

        match variant {
            Some(v) => {
                if write_candidate(test_case, &v).is_err() {
                    return (TransformResult::Error, state.clone());
                }
                (TransformResult::Ok, state.clone())
            }
            None => (TransformResult::Stop, state.clone()),
        }
    }
}
